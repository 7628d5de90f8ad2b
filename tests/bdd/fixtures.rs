//! Scenario world shared by the step definitions.

// The `#[fixture]` macro generates items that cannot carry doc comments.
#![allow(
    missing_docs,
    reason = "Generated fixture types cannot have doc comments attached"
)]

use std::error::Error;
use std::sync::Arc;

use rstest::fixture;
use serde_json::json;
use stepglue::{
    config::{StepsConfig, UnbalancedPolicy},
    expression::ExpressionEnvironment,
    lookup::LookupTable,
    repository::MemoryRepository,
    steps::{
        api::{ApiRequest, ApiSession},
        email::MailMessage,
    },
};

pub use std::cell::RefCell;

/// State carried between the steps of one scenario.
pub struct StepWorld {
    /// Environment the steps resolve placeholders against.
    pub env: ExpressionEnvironment,
    /// API exchange under test.
    pub session: ApiSession,
    /// Request built by the last request step.
    pub request: Option<ApiRequest>,
    /// Messages the application "sent".
    pub sent: Vec<MailMessage>,
    /// Text produced by the last resolve step.
    pub resolved: Option<String>,
    /// Rendered error chain of the last failing step.
    pub failure: Option<String>,
    /// Lines written by the last failure report.
    pub report: Vec<String>,
}

impl Default for StepWorld {
    fn default() -> Self {
        Self::with_config(&StepsConfig::new())
    }
}

impl StepWorld {
    /// Start a world whose environment uses `config`.
    pub fn with_config(config: &StepsConfig) -> Self {
        Self {
            env: ExpressionEnvironment::new(config),
            session: ApiSession::new(),
            request: None,
            sent: Vec::new(),
            resolved: None,
            failure: None,
            report: Vec::new(),
        }
    }

    /// Replace the environment with one using the lenient policy.
    pub fn use_lenient_policy(&mut self) {
        let config = StepsConfig::new().with_policy(UnbalancedPolicy::Lenient);
        self.env = ExpressionEnvironment::new(&config);
    }

    /// Register the `users` table used across the features.
    pub fn add_users(&mut self) {
        let users = MemoryRepository::new("users")
            .with_record(json!({ "id": 1, "email": "a@example.com", "active": true }))
            .with_record(json!({ "id": 2, "email": "b@example.com", "active": false }));
        self.env
            .add_table("users", LookupTable::new(Arc::new(users), "email"));
    }

    /// Remember `err` and its sources as one line per cause.
    pub fn record_failure(&mut self, err: &(dyn Error + 'static)) {
        let mut chain = Vec::new();
        let mut current = Some(err);
        while let Some(cause) = current {
            chain.push(cause.to_string());
            current = cause.source();
        }
        self.failure = Some(chain.join("\n"));
    }
}

/// Fixture providing a fresh world for each scenario.
#[fixture]
pub fn world() -> RefCell<StepWorld> {
    RefCell::new(StepWorld::default())
}
