//! Expression environment for placeholder evaluation.
//!
//! [`ExpressionEnvironment`] wraps a `MiniJinja` environment configured with
//! strict undefined handling, the date and file helpers, and the named lookup
//! tables and variables scenario text may reference. Build it once per
//! scenario and pass it to [`resolve`](crate::placeholder::resolve) for every
//! step.
//!
//! `MiniJinja` attribute lookups cannot carry errors, so lookup tables,
//! accessors and file helpers record their typed failures in a shared log.
//! When an evaluation fails or yields an undefined value, the first recorded
//! failure becomes the reported error.

mod dates;
mod files;
mod io_helpers;
mod objects;

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use miette::Diagnostic;
use minijinja::{Environment, ErrorKind, UndefinedBehavior, value::Value};
use thiserror::Error;

use crate::{
    accessor::AccessError,
    config::{ConfigError, StepsConfig, UnbalancedPolicy},
    debug::{DebugSink, TracingSink},
    lookup::{LookupError, LookupTable},
};

use self::objects::TableObject;

/// Errors raised while evaluating a single expression.
#[derive(Debug, Error, Diagnostic)]
pub enum ExpressionError {
    /// The expression could not be parsed.
    #[error("syntax error in expression '{expression}'")]
    #[diagnostic(code(stepglue::expression::syntax))]
    Syntax {
        /// The offending expression.
        expression: String,
        /// Parser error.
        #[source]
        source: minijinja::Error,
    },
    /// The expression parsed but failed while running.
    #[error("failed to evaluate expression '{expression}'")]
    #[diagnostic(code(stepglue::expression::evaluation))]
    Evaluation {
        /// The offending expression.
        expression: String,
        /// Evaluator error.
        #[source]
        source: minijinja::Error,
    },
    /// A lookup table could not resolve its key.
    #[error("lookup failed in expression '{expression}'")]
    #[diagnostic(code(stepglue::expression::lookup))]
    Lookup {
        /// The offending expression.
        expression: String,
        /// The lookup failure.
        #[source]
        #[diagnostic_source]
        source: LookupError,
    },
    /// A record property could not be read.
    #[error("property access failed in expression '{expression}'")]
    #[diagnostic(code(stepglue::expression::access))]
    Access {
        /// The offending expression.
        expression: String,
        /// The access failure.
        #[source]
        #[diagnostic_source]
        source: AccessError,
    },
    /// A helper needed configuration that was not provided.
    #[error("configuration required by expression '{expression}' is missing")]
    #[diagnostic(code(stepglue::expression::configuration))]
    Configuration {
        /// The offending expression.
        expression: String,
        /// The configuration failure.
        #[source]
        #[diagnostic_source]
        source: ConfigError,
    },
    /// The expression evaluated to an undefined value.
    #[error("expression '{expression}' is undefined")]
    #[diagnostic(
        code(stepglue::expression::undefined),
        help("check variable and lookup table names")
    )]
    Undefined {
        /// The offending expression.
        expression: String,
    },
}

impl ExpressionError {
    /// The expression that failed.
    #[must_use]
    pub fn expression(&self) -> &str {
        match self {
            Self::Syntax { expression, .. }
            | Self::Evaluation { expression, .. }
            | Self::Lookup { expression, .. }
            | Self::Access { expression, .. }
            | Self::Configuration { expression, .. }
            | Self::Undefined { expression } => expression,
        }
    }
}

/// A typed failure recorded from inside a `MiniJinja` callback.
#[derive(Debug)]
pub(crate) enum Failure {
    Lookup(LookupError),
    Access(AccessError),
    Config(ConfigError),
}

impl Failure {
    fn into_error(self, expression: &str) -> ExpressionError {
        let expression = expression.to_owned();
        match self {
            Self::Lookup(source) => ExpressionError::Lookup { expression, source },
            Self::Access(source) => ExpressionError::Access { expression, source },
            Self::Config(source) => ExpressionError::Configuration { expression, source },
        }
    }
}

/// Failures recorded during the current evaluation.
#[derive(Clone, Debug, Default)]
pub(crate) struct FailureLog(Arc<Mutex<Vec<Failure>>>);

impl FailureLog {
    pub(crate) fn record(&self, failure: Failure) {
        tracing::debug!(?failure, "expression callback failed");
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }

    fn clear(&self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn take_first(&self) -> Option<Failure> {
        let mut failures = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if failures.is_empty() {
            return None;
        }
        let first = failures.remove(0);
        failures.clear();
        Some(first)
    }
}

/// Variables, lookup tables and helpers available to placeholder
/// expressions.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use serde_json::json;
/// use stepglue::{
///     config::StepsConfig,
///     expression::ExpressionEnvironment,
///     lookup::LookupTable,
///     repository::MemoryRepository,
/// };
///
/// let repo = MemoryRepository::new("users").with_record(json!({ "id": 7, "email": "a@example.com" }));
/// let mut env = ExpressionEnvironment::new(&StepsConfig::new());
/// env.add_table("users", LookupTable::new(Arc::new(repo), "email"));
/// let value = env.evaluate("users.last.id").expect("evaluates");
/// assert_eq!(value.to_string(), "7");
/// ```
pub struct ExpressionEnvironment {
    jinja: Environment<'static>,
    globals: BTreeMap<String, Value>,
    failures: FailureLog,
    debug: Arc<dyn DebugSink>,
    policy: UnbalancedPolicy,
}

impl fmt::Debug for ExpressionEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionEnvironment")
            .field("globals", &self.globals.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ExpressionEnvironment {
    /// Build an environment with the built-in helpers registered.
    #[must_use]
    pub fn new(config: &StepsConfig) -> Self {
        let failures = FailureLog::default();
        let mut jinja = Environment::new();
        jinja.set_undefined_behavior(UndefinedBehavior::Strict);
        dates::register_functions(&mut jinja, config.clock());
        files::register_functions(&mut jinja, config.base_dir().cloned(), failures.clone());
        Self {
            jinja,
            globals: BTreeMap::new(),
            failures,
            debug: Arc::new(TracingSink),
            policy: config.policy(),
        }
    }

    /// Replace the debug sink used for evaluation diagnostics.
    #[must_use]
    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug = sink;
        self
    }

    /// Expose `table` to expressions under `name`.
    pub fn add_table(&mut self, name: impl Into<String>, table: LookupTable) {
        let name = name.into();
        let object = TableObject::new(name.clone(), table, self.failures.clone());
        self.globals.insert(name, Value::from_object(object));
    }

    /// Expose a plain variable to expressions under `name`.
    pub fn add_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.globals.insert(name.into(), value.into());
    }

    /// Expose any serialisable value to expressions under `name`.
    pub fn add_serialized<T: serde::Serialize>(&mut self, name: impl Into<String>, value: &T) {
        self.globals
            .insert(name.into(), Value::from_serialize(value));
    }

    /// Whether a variable or table named `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    /// The underlying `MiniJinja` environment, for registering extra
    /// functions, filters and tests.
    pub fn jinja_mut(&mut self) -> &mut Environment<'static> {
        &mut self.jinja
    }

    /// The unbalanced-delimiter policy applied by the resolver.
    #[must_use]
    pub const fn policy(&self) -> UnbalancedPolicy {
        self.policy
    }

    /// The sink receiving evaluation diagnostics.
    #[must_use]
    pub fn debug_sink(&self) -> &dyn DebugSink {
        self.debug.as_ref()
    }

    /// Evaluate `expression` against the registered variables and tables.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError::Syntax`] for malformed input, the typed
    /// lookup, access or configuration error recorded by a callback, or
    /// [`ExpressionError::Evaluation`] / [`ExpressionError::Undefined`]
    /// otherwise.
    pub fn evaluate(&self, expression: &str) -> Result<Value, ExpressionError> {
        self.failures.clear();
        let compiled =
            self.jinja
                .compile_expression(expression)
                .map_err(|source| ExpressionError::Syntax {
                    expression: expression.to_owned(),
                    source,
                })?;
        match compiled.eval(&self.globals) {
            Ok(value) if !value.is_undefined() => Ok(value),
            Ok(_) => Err(self.recorded_failure(expression).unwrap_or_else(|| {
                ExpressionError::Undefined {
                    expression: expression.to_owned(),
                }
            })),
            Err(source) => Err(self
                .recorded_failure(expression)
                .unwrap_or_else(|| classify(expression, source))),
        }
    }

    fn recorded_failure(&self, expression: &str) -> Option<ExpressionError> {
        self.failures
            .take_first()
            .map(|failure| failure.into_error(expression))
    }
}

fn classify(expression: &str, source: minijinja::Error) -> ExpressionError {
    let expression = expression.to_owned();
    match source.kind() {
        ErrorKind::SyntaxError => ExpressionError::Syntax { expression, source },
        ErrorKind::UndefinedError => ExpressionError::Undefined { expression },
        _ => ExpressionError::Evaluation { expression, source },
    }
}
