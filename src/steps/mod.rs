//! Reusable step implementations.
//!
//! Each function corresponds to one sentence a scenario may contain. Steps
//! resolve their `%...%` arguments through an [`ExpressionEnvironment`] and
//! return [`StepError`] when the expectation does not hold, leaving it to the
//! host runner to report the failing step.
//!
//! - [`entity`] compares resolved entity properties.
//! - [`api`] drives and inspects JSON API exchanges performed by the host.
//! - [`email`] checks messages captured by the host's mail transport.

pub mod api;
pub mod email;
pub mod entity;
mod html;

use miette::Diagnostic;
use thiserror::Error;

use crate::{
    expression::ExpressionEnvironment,
    payload::PayloadError,
    placeholder::{self, PlaceholderError},
};

/// Errors raised by step implementations.
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// A step argument could not be resolved.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Placeholder(#[from] PlaceholderError),
    /// The response payload could not be decoded or read.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Payload(#[from] PayloadError),
    /// The expectation did not hold.
    #[error("{message}")]
    #[diagnostic(code(stepglue::steps::assertion))]
    Assertion {
        /// What was expected and what was found.
        message: String,
    },
    /// A response assertion ran before any request was made.
    #[error("you must first make a request to check a response")]
    #[diagnostic(code(stepglue::steps::no_response))]
    NoResponse,
    /// The request method is not one the API steps support.
    #[error("unsupported HTTP method '{method}'")]
    #[diagnostic(
        code(stepglue::steps::unsupported_method),
        help("use one of GET, PUT, POST, DELETE or PATCH")
    )]
    UnsupportedMethod {
        /// The method as written in the scenario.
        method: String,
    },
}

/// Fail with `message` unless `condition` holds.
///
/// # Errors
///
/// Returns [`StepError::Assertion`] when `condition` is false.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), StepError> {
    if condition {
        Ok(())
    } else {
        Err(StepError::Assertion { message: message() })
    }
}

fn resolve(text: &str, env: &ExpressionEnvironment) -> Result<String, StepError> {
    Ok(placeholder::resolve(text, env)?)
}
