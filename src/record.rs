//! Structured record capability used by lookup tables and accessors.
//!
//! Backends hand out records as `Arc<dyn Record>`. A record answers
//! [`Record::field`] for a single name; dotted paths are walked by
//! [`Accessor`](crate::accessor::Accessor). JSON values implement the trait
//! with map-like semantics (object keys and array indices) so fixture data
//! and API payloads need no wrapper. Host entity types implement it with
//! attribute lookup.
//!
//! # Examples
//! ```
//! use serde_json::json;
//! use stepglue::record::{Field, Record};
//!
//! let record = json!({ "email": "a@example.com", "tags": ["x", "y"] });
//! let Some(Field::Value(email)) = record.field("email") else {
//!     panic!("email field should exist");
//! };
//! assert_eq!(email, json!("a@example.com"));
//! assert!(record.field("missing").is_none());
//! ```

use std::{fmt, sync::Arc};

use serde_json::Value as JsonValue;

/// Read-only field access over a backend record.
pub trait Record: fmt::Debug + Send + Sync {
    /// Return the value stored under `name`, or `None` when absent.
    fn field(&self, name: &str) -> Option<Field>;

    /// Names of the fields this record exposes.
    ///
    /// Used for enumeration inside expressions and for diagnostics. Records
    /// that cannot list their fields return an empty vector.
    fn field_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A value read from a [`Record`].
#[derive(Clone, Debug)]
pub enum Field {
    /// Scalar or nested JSON data.
    Value(JsonValue),
    /// A related record with its own fields.
    Record(Arc<dyn Record>),
    /// An ordered collection of fields, indexed by position.
    List(Vec<Field>),
}

impl Field {
    /// Read a single child segment from this field.
    ///
    /// Records delegate to [`Record::field`], JSON values use key or index
    /// lookup, and lists accept decimal indices.
    #[must_use]
    pub fn child(&self, segment: &str) -> Option<Self> {
        match self {
            Self::Value(value) => value.field(segment),
            Self::Record(record) => record.field(segment),
            Self::List(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .cloned(),
        }
    }

    /// Render the field as JSON for display and comparisons.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Value(value) => value.clone(),
            Self::Record(record) => record_to_json(record.as_ref()),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

/// Snapshot the enumerable fields of `record` as a JSON object.
pub(crate) fn record_to_json(record: &dyn Record) -> JsonValue {
    let map = record
        .field_names()
        .into_iter()
        .filter_map(|name| record.field(&name).map(|field| (name, field.to_json())))
        .collect();
    JsonValue::Object(map)
}

/// Look up a direct child of a JSON value by key or array index.
pub(crate) fn json_child<'a>(value: &'a JsonValue, segment: &str) -> Option<&'a JsonValue> {
    match value {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    }
}

/// Render a JSON scalar the way scenario text compares it.
///
/// Strings are returned without quotes, `null` becomes the empty string and
/// everything else uses its JSON form (`true`, `42`, `[1,2]`).
#[must_use]
pub fn scalar_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

impl Record for JsonValue {
    fn field(&self, name: &str) -> Option<Field> {
        json_child(self, name).cloned().map(Field::Value)
    }

    fn field_names(&self) -> Vec<String> {
        match self {
            Self::Object(map) => map.keys().cloned().collect(),
            Self::Array(items) => (0..items.len()).map(|index| index.to_string()).collect(),
            _ => Vec::new(),
        }
    }
}

impl Record for serde_json::Map<String, JsonValue> {
    fn field(&self, name: &str) -> Option<Field> {
        self.get(name).cloned().map(Field::Value)
    }

    fn field_names(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }
}
