//! JSON API steps.
//!
//! The host owns the HTTP client. [`ApiSession::prepare_request`] turns a
//! scenario's `I request "POST /users"` into an [`ApiRequest`] with resolved
//! placeholders, the host sends it and hands the result back through
//! [`ApiSession::record_response`], and the assertion methods inspect that
//! response.

use std::{fmt, str::FromStr};

use serde_json::Value as JsonValue;

use super::{StepError, ensure, html, resolve};
use crate::{
    debug::DebugSink,
    expression::ExpressionEnvironment,
    payload::JsonPayload,
    record::scalar_text,
};

/// Header marking requests as AJAX calls.
pub const REQUESTED_WITH_HEADER: (&str, &str) = ("X-Requested-With", "XMLHttpRequest");

/// HTTP methods the request step accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `PUT`
    Put,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
}

impl HttpMethod {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = StepError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        [Self::Get, Self::Put, Self::Post, Self::Delete, Self::Patch]
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| StepError::UnsupportedMethod {
                method: raw.to_owned(),
            })
    }
}

/// A request the host should send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Resource path and query, placeholders resolved.
    pub resource: String,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Request body, placeholders resolved.
    pub body: Option<String>,
}

/// A response received by the host.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApiResponse {
    /// Status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: String,
}

impl ApiResponse {
    /// First value of header `name`, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Whether the `Content-Type` is JSON, including `+json` media types
    /// such as `application/problem+json`.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.header("Content-Type")
            .and_then(|content_type| content_type.split_once("application/"))
            .is_some_and(|(_, subtype)| subtype.contains("json"))
    }
}

/// State of one scenario's API exchange.
#[derive(Clone, Debug, Default)]
pub struct ApiSession {
    payload: Option<String>,
    access_token: Option<String>,
    last_request: Option<ApiRequest>,
    response: Option<ApiResponse>,
}

impl ApiSession {
    /// Start a session with no payload, token or response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `there is a payload:` stores the body sent with the next request.
    pub fn set_payload(&mut self, payload: impl Into<String>) {
        self.payload = Some(payload.into());
    }

    /// Append `access_token=<token>` to every following request.
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = Some(token.into());
    }

    /// `I request "<METHOD> <resource>"` builds the request to send.
    ///
    /// # Examples
    /// ```
    /// use stepglue::{config::StepsConfig, expression::ExpressionEnvironment, steps::api::ApiSession};
    ///
    /// let mut env = ExpressionEnvironment::new(&StepsConfig::new());
    /// env.add_variable("id", 7);
    /// let mut session = ApiSession::new();
    /// session.set_access_token("secret");
    /// let request = session.prepare_request(&env, "get", "/users/%id%").expect("request");
    /// assert_eq!(request.resource, "/users/7?access_token=secret");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`StepError::UnsupportedMethod`] for unknown methods and the
    /// placeholder error raised while resolving the resource or payload.
    pub fn prepare_request(
        &mut self,
        env: &ExpressionEnvironment,
        method: &str,
        resource: &str,
    ) -> Result<ApiRequest, StepError> {
        let method = method.parse::<HttpMethod>()?;
        let mut resource = resolve(resource, env)?;
        if let Some(token) = &self.access_token {
            let separator = if resource.contains('?') { '&' } else { '?' };
            resource.push(separator);
            resource.push_str("access_token=");
            resource.push_str(token);
        }
        let body = self
            .payload
            .as_deref()
            .map(|payload| resolve(payload, env))
            .transpose()?;
        let (header, value) = REQUESTED_WITH_HEADER;
        let request = ApiRequest {
            method,
            resource,
            headers: vec![(header.to_owned(), value.to_owned())],
            body,
        };
        tracing::debug!(method = %request.method, resource = %request.resource, "prepared API request");
        self.last_request = Some(request.clone());
        self.response = None;
        Ok(request)
    }

    /// Store the response the host received for the last request.
    pub fn record_response(&mut self, response: ApiResponse) {
        tracing::debug!(status = response.status, "recorded API response");
        self.response = Some(response);
    }

    /// The last request prepared.
    #[must_use]
    pub const fn last_request(&self) -> Option<&ApiRequest> {
        self.last_request.as_ref()
    }

    /// The recorded response.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::NoResponse`] before any response was recorded.
    pub fn response(&self) -> Result<&ApiResponse, StepError> {
        self.response.as_ref().ok_or(StepError::NoResponse)
    }

    /// The recorded response body decoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::NoResponse`] or the decoding error.
    pub fn payload(&self) -> Result<JsonPayload, StepError> {
        Ok(JsonPayload::parse(&self.response()?.body)?)
    }

    /// `the response status code should be <code>`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] on a mismatch. The message carries
    /// the body when the response is JSON.
    pub fn status_code_should_be(&self, code: u16) -> Result<(), StepError> {
        let response = self.response()?;
        ensure(response.status == code, || {
            let detail = if response.is_json() {
                response.body.clone()
            } else {
                format!(
                    "Output is \"{}\", which is not JSON. Run the request manually.",
                    response.header("Content-Type").unwrap_or_default()
                )
            };
            format!(
                "expected status code {code}, got {}\n{detail}",
                response.status
            )
        })
    }

    /// `the "<name>" header should be "<value>"`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when the header differs or is absent.
    pub fn header_should_be(
        &self,
        env: &ExpressionEnvironment,
        name: &str,
        expected: &str,
    ) -> Result<(), StepError> {
        let expected = resolve(expected, env)?;
        let actual = self.response()?.header(name).unwrap_or_default();
        ensure(actual == expected, || {
            format!("expected header \"{name}\" to be \"{expected}\", found \"{actual}\"")
        })
    }

    /// `the "<path>" property should exist`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when the property is missing.
    pub fn property_should_exist(&self, path: &str) -> Result<(), StepError> {
        let payload = self.payload()?;
        ensure(payload.has_property(path), || {
            format!("Asserting the [{path}] property exists in: {}", payload.value())
        })
    }

    /// `the following response properties exist:` checks one path per line.
    ///
    /// # Errors
    ///
    /// Returns the failure for the first missing property.
    pub fn properties_should_exist(&self, paths: &str) -> Result<(), StepError> {
        paths
            .lines()
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .try_for_each(|path| self.property_should_exist(path))
    }

    /// `the "<path>" property should not exist`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when the property is present.
    pub fn property_should_not_exist(&self, path: &str) -> Result<(), StepError> {
        let payload = self.payload()?;
        ensure(!payload.has_property(path), || {
            format!(
                "Asserting the [{path}] property does not exist in: {}",
                payload.value()
            )
        })
    }

    /// `the "<name>" link should exist` checks `_links.<name>`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when the link is missing.
    pub fn link_should_exist(&self, name: &str) -> Result<(), StepError> {
        self.property_should_exist(&format!("_links.{name}"))
    }

    /// `the "<path>" property should equal "<expected>"`.
    ///
    /// Booleans compare as `true`/`false`; strings compare without quotes.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] on a mismatch, or the payload error
    /// when the property is missing.
    pub fn property_should_equal(
        &self,
        env: &ExpressionEnvironment,
        path: &str,
        expected: &str,
    ) -> Result<(), StepError> {
        let expected = resolve(expected, env)?;
        let payload = self.payload()?;
        let actual = scalar_text(payload.property(path)?);
        ensure(actual == expected, || {
            format!(
                "Asserting the [{path}] property in current scope equals [{expected}]: {}",
                payload.value()
            )
        })
    }

    /// `the response payload contains the following properties:` compares
    /// each `(path, expected)` pair.
    ///
    /// # Errors
    ///
    /// Returns the failure for the first differing property.
    pub fn properties_should_equal<P, E>(
        &self,
        env: &ExpressionEnvironment,
        pairs: impl IntoIterator<Item = (P, E)>,
    ) -> Result<(), StepError>
    where
        P: AsRef<str>,
        E: AsRef<str>,
    {
        pairs.into_iter().try_for_each(|(path, expected)| {
            self.property_should_equal(env, path.as_ref(), expected.as_ref())
        })
    }

    /// `the embedded "<name>" should have a "<property>" property equal to
    /// "<expected>"` compares `_embedded.<name>.<property>`.
    ///
    /// # Errors
    ///
    /// As [`Self::property_should_equal`].
    pub fn embedded_property_should_equal(
        &self,
        env: &ExpressionEnvironment,
        name: &str,
        property: &str,
        expected: &str,
    ) -> Result<(), StepError> {
        self.property_should_equal(env, &format!("_embedded.{name}.{property}"), expected)
    }

    /// `the "<path>" property should contain "<needle>"`.
    ///
    /// Arrays must contain an element equal to `needle`; strings must contain
    /// it as a substring.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when `needle` is absent.
    pub fn property_should_contain(
        &self,
        env: &ExpressionEnvironment,
        path: &str,
        needle: &str,
    ) -> Result<(), StepError> {
        let needle = resolve(needle, env)?;
        let payload = self.payload()?;
        let actual = payload.property(path)?;
        ensure(contains(actual, &needle), || {
            format!(
                "Asserting the [{path}] property contains [{needle}]: {}",
                payload.value()
            )
        })
    }

    /// `the "<path>" property should contain the items:` checks each item
    /// with [`Self::property_should_contain`].
    ///
    /// # Errors
    ///
    /// Returns the failure for the first missing item.
    pub fn property_should_contain_items<I>(
        &self,
        env: &ExpressionEnvironment,
        path: &str,
        items: impl IntoIterator<Item = I>,
    ) -> Result<(), StepError>
    where
        I: AsRef<str>,
    {
        items
            .into_iter()
            .try_for_each(|item| self.property_should_contain(env, path, item.as_ref()))
    }

    /// `the "<path>" property should be an array`.
    ///
    /// JSON objects count as arrays, since both decode to the same PHP-style
    /// associative structure the scenarios were written against.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] for scalars.
    pub fn property_should_be_array(&self, path: &str) -> Result<(), StepError> {
        let payload = self.payload()?;
        let actual = payload.property(path)?;
        ensure(actual.is_array() || actual.is_object(), || {
            format!(
                "Asserting the [{path}] property is an array: {}",
                payload.value()
            )
        })
    }

    /// `the "<path>" property should contain <count> items`.
    ///
    /// # Errors
    ///
    /// Returns [`StepError::Assertion`] when the count differs or the
    /// property is a scalar.
    pub fn property_should_have_count(&self, path: &str, count: usize) -> Result<(), StepError> {
        let payload = self.payload()?;
        let actual = payload.property(path)?;
        let found = match actual {
            JsonValue::Array(items) => Some(items.len()),
            JsonValue::Object(map) => Some(map.len()),
            _ => None,
        };
        ensure(found == Some(count), || {
            format!(
                "Asserting the [{path}] property contains [{count}] items: {}",
                payload.value()
            )
        })
    }

    /// `print last response` writes the raw response to `sink`.
    pub fn print_last_response(&self, sink: &dyn DebugSink) {
        if let Some(response) = &self.response {
            sink.write_line(&format!("HTTP {}", response.status));
            for (name, value) in &response.headers {
                sink.write_line(&format!("{name}: {value}"));
            }
            sink.write_line("");
            sink.write_line(&response.body);
        }
    }

    /// Describe the last exchange after a failed scenario.
    ///
    /// JSON bodies are pretty-printed. HTML pages are summarised by their
    /// headings, alerts and form errors. Any other body is written as is.
    pub fn report_failure(&self, sink: &dyn DebugSink) {
        let Some(response) = &self.response else {
            return;
        };
        sink.write_line("");
        sink.write_line("Failure! when making the following request:");
        if let Some(request) = &self.last_request {
            sink.write_line(&format!("{}: {}", request.method, request.resource));
        }
        if response.is_json() {
            match JsonPayload::parse(&response.body) {
                Ok(payload) => sink.write_line(&payload.to_pretty()),
                Err(_) => sink.write_line(&response.body),
            }
        } else if response.body.contains("</body>") {
            sink.write_line("Failure! Below is a summary of the HTML response from the server.");
            for line in html::summarise(&response.body) {
                sink.write_line(&line);
            }
        } else {
            sink.write_line(&response.body);
        }
    }
}

fn contains(actual: &JsonValue, needle: &str) -> bool {
    match actual {
        JsonValue::Array(items) => items.iter().any(|item| scalar_text(item) == needle),
        JsonValue::Object(map) => map.values().any(|item| scalar_text(item) == needle),
        other => scalar_text(other).contains(needle),
    }
}
