//! `MiniJinja` objects exposing lookup tables and accessors to expressions.
//!
//! `users.last`, `users['a@example.com']` and `users.get('nth2')` all resolve
//! through [`TableObject`]; the accessor it returns exposes record fields as
//! attributes. Nested records and JSON objects become accessors again, JSON
//! arrays and record lists become sequences, and scalars become plain values.

use std::{fmt, sync::Arc};

use minijinja::{
    Error, ErrorKind, State,
    value::{Enumerator, Object, ObjectRepr, Value, ValueKind, from_args},
};
use serde_json::Value as JsonValue;

use crate::{
    accessor::Accessor,
    lookup::LookupTable,
    record::{Field, record_to_json},
};

use super::{Failure, FailureLog};

/// Lookup table bound into an expression environment.
#[derive(Debug)]
pub(super) struct TableObject {
    name: String,
    table: LookupTable,
    failures: FailureLog,
}

impl TableObject {
    pub(super) const fn new(name: String, table: LookupTable, failures: FailureLog) -> Self {
        Self {
            name,
            table,
            failures,
        }
    }

    fn lookup(&self, key: &str) -> Result<Value, Error> {
        match self.table.get(key) {
            Ok(accessor) => Ok(accessor_value(accessor, &self.failures)),
            Err(err) => {
                let message = err.to_string();
                self.failures.record(Failure::Lookup(err));
                Err(Error::new(ErrorKind::InvalidOperation, message))
            }
        }
    }
}

impl Object for TableObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let key = key_text(key)?;
        self.lookup(&key).ok()
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        match method {
            "get" => {
                let (key,): (Value,) = from_args(args)?;
                let key = key_text(&key).ok_or_else(|| {
                    Error::new(
                        ErrorKind::InvalidOperation,
                        format!("lookup key for {} must be a string or number", self.name),
                    )
                })?;
                self.lookup(&key)
            }
            _ => Err(Error::from(ErrorKind::UnknownMethod)),
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<lookup table {}>", self.name)
    }
}

/// Record accessor exposed to expressions.
#[derive(Debug)]
pub(super) struct AccessorObject {
    accessor: Accessor,
    failures: FailureLog,
}

impl Object for AccessorObject {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let name = key_text(key)?;
        match self.accessor.field(&name) {
            Ok(field) => Some(field_value(
                field,
                &format!("{}.{name}", self.accessor.origin()),
                &self.failures,
            )),
            Err(err) => {
                self.failures.record(Failure::Access(err));
                None
            }
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        let names = self.accessor.record().field_names();
        Enumerator::Values(names.into_iter().map(Value::from).collect())
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", record_to_json(self.accessor.record().as_ref()))
    }
}

fn accessor_value(accessor: Accessor, failures: &FailureLog) -> Value {
    Value::from_object(AccessorObject {
        accessor,
        failures: failures.clone(),
    })
}

/// Convert a record field into an expression value.
fn field_value(field: Field, origin: &str, failures: &FailureLog) -> Value {
    match field {
        Field::Record(record) => accessor_value(Accessor::new(record, origin), failures),
        Field::List(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| field_value(item, &format!("{origin}.{index}"), failures))
            .collect::<Vec<_>>()
            .into(),
        Field::Value(json) => json_value(json, origin, failures),
    }
}

fn json_value(json: JsonValue, origin: &str, failures: &FailureLog) -> Value {
    match json {
        JsonValue::Object(_) => accessor_value(Accessor::new(Arc::new(json), origin), failures),
        JsonValue::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| json_value(item, &format!("{origin}.{index}"), failures))
            .collect::<Vec<_>>()
            .into(),
        scalar => Value::from_serialize(&scalar),
    }
}

/// Textual form of a lookup key: strings as-is, numbers in decimal.
fn key_text(key: &Value) -> Option<String> {
    match key.kind() {
        ValueKind::String => key.as_str().map(str::to_owned),
        ValueKind::Number => Some(key.to_string()),
        _ => None,
    }
}
