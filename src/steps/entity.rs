//! Entity property assertions.
//!
//! Both the actual and the expected side are scenario text, usually with the
//! actual side written as a placeholder such as `%users.last.email%`. An
//! expected value of `true` or `false` compares by truthiness, so a flag that
//! renders as `1` or `true` satisfies `true`.

use super::{StepError, ensure, resolve};
use crate::expression::ExpressionEnvironment;

/// `the "<actual>" entity property should be "<expected>"`.
///
/// # Examples
/// ```
/// use stepglue::{config::StepsConfig, expression::ExpressionEnvironment, steps::entity};
///
/// let mut env = ExpressionEnvironment::new(&StepsConfig::new());
/// env.add_variable("enabled", true);
/// entity::property_should_be(&env, "%enabled%", "true").expect("truthy");
/// entity::property_should_be(&env, "%1 + 1%", "2").expect("equal");
/// ```
///
/// # Errors
///
/// Returns [`StepError::Assertion`] when the values differ, or the
/// placeholder error raised while resolving either side.
pub fn property_should_be(
    env: &ExpressionEnvironment,
    actual: &str,
    expected: &str,
) -> Result<(), StepError> {
    let actual = resolve(actual, env)?;
    let expected = resolve(expected, env)?;
    match expected.as_str() {
        "true" | "false" => {
            let wanted = expected == "true";
            ensure(is_truthy(&actual) == wanted, || {
                format!("expected entity property to be {expected}, found \"{actual}\"")
            })
        }
        _ => ensure(actual == expected, || {
            format!("expected entity property \"{expected}\", found \"{actual}\"")
        }),
    }
}

/// `the "<actual>" entity property should contain "<needle>"`.
///
/// # Errors
///
/// Returns [`StepError::Assertion`] when `needle` is absent.
pub fn property_should_contain(
    env: &ExpressionEnvironment,
    actual: &str,
    needle: &str,
) -> Result<(), StepError> {
    let actual = resolve(actual, env)?;
    let needle = resolve(needle, env)?;
    ensure(actual.contains(&needle), || {
        format!("\"{actual}\" does not contain \"{needle}\"")
    })
}

/// `the "<actual>" entity property should not contain "<needle>"`.
///
/// # Errors
///
/// Returns [`StepError::Assertion`] when `needle` is present.
pub fn property_should_not_contain(
    env: &ExpressionEnvironment,
    actual: &str,
    needle: &str,
) -> Result<(), StepError> {
    let actual = resolve(actual, env)?;
    let needle = resolve(needle, env)?;
    ensure(!actual.contains(&needle), || {
        format!("\"{actual}\" contains \"{needle}\", but it should not")
    })
}

/// `the "<actual>" entity property should be empty`.
///
/// # Errors
///
/// Returns [`StepError::Assertion`] when the value is not empty.
pub fn property_should_be_empty(env: &ExpressionEnvironment, actual: &str) -> Result<(), StepError> {
    let actual = resolve(actual, env)?;
    ensure(is_empty(&actual), || {
        format!("expected an empty entity property, found \"{actual}\"")
    })
}

/// `the "<actual>" entity property should not be empty`.
///
/// # Errors
///
/// Returns [`StepError::Assertion`] when the value is empty.
pub fn property_should_not_be_empty(
    env: &ExpressionEnvironment,
    actual: &str,
) -> Result<(), StepError> {
    let actual = resolve(actual, env)?;
    ensure(!is_empty(&actual), || {
        "expected a non-empty entity property".to_owned()
    })
}

/// `""`, `"0"` and `"false"` are falsy.
fn is_truthy(text: &str) -> bool {
    !matches!(text, "" | "0" | "false")
}

/// Empty text, `0`, and sequences that rendered to nothing count as empty.
fn is_empty(text: &str) -> bool {
    matches!(text, "" | "0")
}
