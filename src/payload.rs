//! Decoded JSON response bodies and dotted property paths.
//!
//! API steps read properties such as `_embedded.users.0.email` from a
//! response body. [`JsonPayload`] decodes the body once and walks those paths,
//! treating numeric segments as array indices.

use miette::Diagnostic;
use serde_json::{Value as JsonValue, error::Category};
use thiserror::Error;

use crate::record::json_child;

/// Errors raised while decoding or reading a payload.
#[derive(Debug, Error, Diagnostic)]
pub enum PayloadError {
    /// The body is not valid JSON.
    #[error("failed to decode JSON body ({reason}){excerpt}")]
    #[diagnostic(
        code(stepglue::payload::decode),
        help("check the response Content-Type; the request may have failed")
    )]
    Decode {
        /// Short description of the decoding failure.
        reason: &'static str,
        /// The body, appended for syntax errors.
        excerpt: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// A path segment does not exist.
    #[error("cannot find the property \"{path}\": segment \"{segment}\" is missing")]
    #[diagnostic(code(stepglue::payload::missing_property))]
    MissingProperty {
        /// The full dotted path.
        path: String,
        /// The first segment that could not be resolved.
        segment: String,
    },
}

/// A decoded JSON response body.
#[derive(Clone, Debug, PartialEq)]
pub struct JsonPayload {
    value: JsonValue,
}

impl JsonPayload {
    /// Decode `body` as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Decode`] describing why decoding failed. For
    /// syntax errors the message includes the body.
    pub fn parse(body: &str) -> Result<Self, PayloadError> {
        serde_json::from_str(body)
            .map(Self::from_value)
            .map_err(|source| {
                let reason = decode_reason(&source);
                let excerpt = if matches!(source.classify(), Category::Syntax) {
                    format!(":\n\n{body}")
                } else {
                    String::new()
                };
                PayloadError::Decode {
                    reason,
                    excerpt,
                    source,
                }
            })
    }

    /// Wrap an already decoded value.
    #[must_use]
    pub const fn from_value(value: JsonValue) -> Self {
        Self { value }
    }

    /// The decoded document.
    #[must_use]
    pub const fn value(&self) -> &JsonValue {
        &self.value
    }

    /// Whether every segment of `path` exists.
    ///
    /// # Examples
    /// ```
    /// use stepglue::payload::JsonPayload;
    ///
    /// let payload = JsonPayload::parse(r#"{"a": [{"b": null}]}"#).expect("valid JSON");
    /// assert!(payload.has_property("a.0.b"));
    /// assert!(!payload.has_property("a.1"));
    /// ```
    #[must_use]
    pub fn has_property(&self, path: &str) -> bool {
        self.property(path).is_ok()
    }

    /// Read the value at dotted `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::MissingProperty`] naming the first missing
    /// segment.
    pub fn property(&self, path: &str) -> Result<&JsonValue, PayloadError> {
        path.split('.').try_fold(&self.value, |current, segment| {
            json_child(current, segment).ok_or_else(|| PayloadError::MissingProperty {
                path: path.to_owned(),
                segment: segment.to_owned(),
            })
        })
    }

    /// Pretty-printed JSON for debug output.
    #[must_use]
    pub fn to_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.value).unwrap_or_else(|_| self.value.to_string())
    }
}

fn decode_reason(err: &serde_json::Error) -> &'static str {
    let detail = err.to_string();
    if detail.contains("recursion limit") {
        "maximum stack depth exceeded"
    } else if detail.contains("control character") {
        "unexpected control character found"
    } else if detail.contains("unicode") || detail.contains("UTF-8") {
        "malformed UTF-8 characters, possibly incorrectly encoded"
    } else {
        match err.classify() {
            Category::Syntax => "syntax error, malformed JSON",
            Category::Eof => "unexpected end of input",
            Category::Data => "data does not match the expected shape",
            Category::Io => "unknown error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn payload() -> JsonPayload {
        JsonPayload::from_value(json!({
            "id": 7,
            "active": true,
            "_links": { "self": { "href": "/users/7" } },
            "_embedded": { "roles": [{ "name": "admin" }, { "name": "editor" }] }
        }))
    }

    #[rstest]
    #[case("id", true)]
    #[case("_links.self.href", true)]
    #[case("_embedded.roles.1.name", true)]
    #[case("_embedded.roles.2", false)]
    #[case("id.value", false)]
    #[case("missing", false)]
    fn has_property_walks_objects_and_arrays(
        payload: JsonPayload,
        #[case] path: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(payload.has_property(path), expected);
    }

    #[rstest]
    fn property_names_missing_segment(payload: JsonPayload) {
        let err = payload.property("_links.next.href").expect_err("missing");
        assert_eq!(
            err.to_string(),
            "cannot find the property \"_links.next.href\": segment \"next\" is missing"
        );
    }

    #[rstest]
    #[case("{\"a\": ", "failed to decode JSON body (unexpected end of input)")]
    #[case(
        "<html></html>",
        "failed to decode JSON body (syntax error, malformed JSON):\n\n<html></html>"
    )]
    fn decode_errors_describe_the_failure(#[case] body: &str, #[case] expected: &str) {
        let err = JsonPayload::parse(body).expect_err("invalid JSON");
        assert_eq!(err.to_string(), expected);
    }

    #[rstest]
    fn deep_nesting_reports_stack_depth() {
        let body = "[".repeat(200);
        let err = JsonPayload::parse(&body).expect_err("too deep");
        assert!(err.to_string().contains("maximum stack depth exceeded"), "{err}");
    }
}
