//! `%expression%` placeholder substitution.
//!
//! [`resolve`] scans text left to right for `%`-delimited spans, evaluates
//! each span in an [`ExpressionEnvironment`] and splices the rendered result
//! back in. Substituted text is never rescanned, identical spans share one
//! evaluation, and a `%` without a closing partner is handled according to
//! the environment's [`UnbalancedPolicy`].

use std::collections::HashMap;

use itertools::Itertools;
use miette::{Diagnostic, SourceSpan};
use minijinja::value::{Value, ValueKind};
use thiserror::Error;

use crate::{
    config::UnbalancedPolicy,
    expression::{ExpressionEnvironment, ExpressionError},
};

const DELIMITER: char = '%';
const SEQUENCE_SEPARATOR: &str = ";";

/// Errors raised while resolving placeholders.
#[derive(Debug, Error, Diagnostic)]
pub enum PlaceholderError {
    /// A `%` has no closing partner and the policy is strict.
    #[error("unbalanced placeholder: '%' at byte {offset} is never closed")]
    #[diagnostic(
        code(stepglue::placeholder::unbalanced),
        help("close the placeholder with another '%' or use the lenient policy")
    )]
    Unbalanced {
        /// Byte offset of the opening delimiter.
        offset: usize,
        /// The text being resolved.
        #[source_code]
        text: String,
        /// Location of the opening delimiter.
        #[label("opened here")]
        span: SourceSpan,
    },
    /// A `%%` pair encloses no expression.
    #[error("empty placeholder at byte {offset}")]
    #[diagnostic(code(stepglue::placeholder::empty_expression))]
    EmptyExpression {
        /// Byte offset of the opening delimiter.
        offset: usize,
        /// The text being resolved.
        #[source_code]
        text: String,
        /// Location of the empty placeholder.
        #[label("nothing to evaluate")]
        span: SourceSpan,
    },
    /// An enclosed expression failed to evaluate.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Expression(#[from] ExpressionError),
}

/// Substitute every `%expression%` span in `text`.
///
/// Sequences render as their elements joined with `;`, `none` renders as the
/// empty string and every other value uses its display form.
///
/// # Examples
/// ```
/// use stepglue::{config::StepsConfig, expression::ExpressionEnvironment, placeholder::resolve};
///
/// let mut env = ExpressionEnvironment::new(&StepsConfig::new());
/// env.add_variable("name", "World");
/// assert_eq!(resolve("Hello %name%", &env).expect("resolves"), "Hello World");
/// assert_eq!(resolve("%1+1%", &env).expect("resolves"), "2");
/// assert_eq!(resolve("%['a', 'b']%", &env).expect("resolves"), "a;b");
/// ```
///
/// # Errors
///
/// Returns [`PlaceholderError::Unbalanced`] for an unclosed `%` under the
/// strict policy, [`PlaceholderError::EmptyExpression`] for `%%`, and
/// [`PlaceholderError::Expression`] when evaluation fails. Evaluation
/// failures are also written to the environment's debug sink.
pub fn resolve(text: &str, env: &ExpressionEnvironment) -> Result<String, PlaceholderError> {
    let mut out = String::with_capacity(text.len());
    let mut substitutions: HashMap<&str, String> = HashMap::new();
    let mut cursor = 0;

    while let Some(found) = text.get(cursor..).and_then(|rest| rest.find(DELIMITER)) {
        let open = cursor + found;
        out.push_str(text.get(cursor..open).unwrap_or_default());

        let body_start = open + DELIMITER.len_utf8();
        let Some(length) = text
            .get(body_start..)
            .and_then(|rest| rest.find(DELIMITER))
        else {
            return match env.policy() {
                UnbalancedPolicy::Strict => Err(PlaceholderError::Unbalanced {
                    offset: open,
                    text: text.to_owned(),
                    span: (open, DELIMITER.len_utf8()).into(),
                }),
                UnbalancedPolicy::Lenient => {
                    tracing::debug!(offset = open, "leaving unbalanced placeholder in place");
                    out.push_str(text.get(open..).unwrap_or_default());
                    Ok(out)
                }
            };
        };

        let close = body_start + length;
        let expression = text.get(body_start..close).unwrap_or_default();
        if expression.is_empty() {
            return Err(PlaceholderError::EmptyExpression {
                offset: open,
                text: text.to_owned(),
                span: (open, 2 * DELIMITER.len_utf8()).into(),
            });
        }

        if let Some(known) = substitutions.get(expression) {
            out.push_str(known);
        } else {
            let rendered = evaluate_span(expression, env)?;
            out.push_str(&rendered);
            substitutions.insert(expression, rendered);
        }
        cursor = close + DELIMITER.len_utf8();
    }

    out.push_str(text.get(cursor..).unwrap_or_default());
    Ok(out)
}

/// Resolve every cell of a scenario table, preserving its shape.
///
/// # Errors
///
/// Returns the first error raised by [`resolve`].
pub fn resolve_rows<R, C>(
    rows: R,
    env: &ExpressionEnvironment,
) -> Result<Vec<Vec<String>>, PlaceholderError>
where
    R: IntoIterator,
    R::Item: IntoIterator<Item = C>,
    C: AsRef<str>,
{
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| resolve(cell.as_ref(), env))
                .collect()
        })
        .collect()
}

fn evaluate_span(
    expression: &str,
    env: &ExpressionEnvironment,
) -> Result<String, PlaceholderError> {
    match env.evaluate(expression) {
        Ok(value) => Ok(render_value(&value)),
        Err(err) => {
            let sink = env.debug_sink();
            sink.write_line("Error evaluating the following expression:");
            sink.write_line(expression);
            tracing::debug!(expression, error = %err, "placeholder evaluation failed");
            Err(err.into())
        }
    }
}

/// Render an evaluated value as placeholder text.
pub(crate) fn render_value(value: &Value) -> String {
    match value.kind() {
        ValueKind::None | ValueKind::Undefined => String::new(),
        ValueKind::Bool => value.is_true().to_string(),
        ValueKind::Seq | ValueKind::Iterable => match value.try_iter() {
            Ok(items) => items.map(|item| render_value(&item)).join(SEQUENCE_SEPARATOR),
            Err(_) => value.to_string(),
        },
        _ => value.to_string(),
    }
}
