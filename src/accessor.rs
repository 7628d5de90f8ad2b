//! Dotted-path reads over a resolved record.
//!
//! An [`Accessor`] wraps the record a lookup table found and walks paths such
//! as `author.address.city` one segment at a time. Each segment is resolved
//! by the current value's own rules (record attribute, JSON key, list index),
//! so records, nested JSON and lists compose transparently. A missing segment
//! is an error, never an empty value.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::record::{Field, Record};

/// Errors raised while reading a dotted path from an [`Accessor`].
#[derive(Debug, Error, Diagnostic)]
pub enum AccessError {
    /// An intermediate or final segment does not exist.
    #[error("cannot read '{path}' from {origin}: segment '{segment}' does not exist")]
    #[diagnostic(code(stepglue::accessor::missing_segment))]
    MissingSegment {
        /// Description of the record the path was read from.
        origin: String,
        /// The full dotted path requested.
        path: String,
        /// The first segment that could not be resolved.
        segment: String,
    },
    /// The path was empty or contained an empty segment.
    #[error("cannot read '{path}' from {origin}: path contains an empty segment")]
    #[diagnostic(code(stepglue::accessor::empty_path))]
    EmptyPath {
        /// Description of the record the path was read from.
        origin: String,
        /// The full dotted path requested.
        path: String,
    },
}

/// Read-only view over a single record.
#[derive(Clone, Debug)]
pub struct Accessor {
    record: Arc<dyn Record>,
    origin: String,
}

impl Accessor {
    /// Wrap `record`, remembering `origin` for error messages.
    ///
    /// `origin` typically names the table and key, e.g. `users[last]`.
    #[must_use]
    pub fn new(record: Arc<dyn Record>, origin: impl Into<String>) -> Self {
        Self {
            record,
            origin: origin.into(),
        }
    }

    /// Description of where the record came from.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// The wrapped record.
    #[must_use]
    pub fn record(&self) -> &Arc<dyn Record> {
        &self.record
    }

    /// Read a direct field of the record.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::MissingSegment`] when the field is absent.
    pub fn field(&self, name: &str) -> Result<Field, AccessError> {
        self.read(name)
    }

    /// Read the value at a dotted `path` such as `author.email`.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use serde_json::json;
    /// use stepglue::accessor::Accessor;
    ///
    /// let accessor = Accessor::new(Arc::new(json!({ "a": { "b": [10, 20] } })), "fixture");
    /// let value = accessor.read("a.b.1").expect("path exists");
    /// assert_eq!(value.to_json(), json!(20));
    /// assert!(accessor.read("a.c").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::EmptyPath`] for empty segments and
    /// [`AccessError::MissingSegment`] naming the first unresolved segment.
    pub fn read(&self, path: &str) -> Result<Field, AccessError> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = self.step(None, first, path)?;
        for segment in segments {
            current = self.step(Some(&current), segment, path)?;
        }
        Ok(current)
    }

    fn step(&self, parent: Option<&Field>, segment: &str, path: &str) -> Result<Field, AccessError> {
        if segment.is_empty() {
            return Err(AccessError::EmptyPath {
                origin: self.origin.clone(),
                path: path.to_owned(),
            });
        }
        let found = match parent {
            Some(field) => field.child(segment),
            None => self.record.field(segment),
        };
        found.ok_or_else(|| AccessError::MissingSegment {
            origin: self.origin.clone(),
            path: path.to_owned(),
            segment: segment.to_owned(),
        })
    }
}
