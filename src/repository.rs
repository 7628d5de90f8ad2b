//! Backend query interface consumed by lookup tables.
//!
//! Lookup tables only need five query shapes: find one record by field, list
//! every record in natural order, the first and last records, and a join on a
//! related entity. Hosts implement [`Repository`] over their ORM; tests and
//! fixture files use [`MemoryRepository`].

use std::{fmt, sync::Arc};

use serde_json::Value as JsonValue;

use crate::record::{Record, json_child, scalar_text};

/// Error type returned by backend queries.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shared record handle returned by queries.
pub type RecordRef = Arc<dyn Record>;

/// Query interface over one entity collection.
pub trait Repository: fmt::Debug + Send + Sync {
    /// Identity of the backing collection, used in error messages.
    fn identity(&self) -> &str;

    /// Find the record whose `field` equals `value`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when the query itself fails.
    fn find_one_by(&self, field: &str, value: &str) -> Result<Option<RecordRef>, BackendError>;

    /// List every record in the backend's natural order.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when the query itself fails.
    fn find_all(&self) -> Result<Vec<RecordRef>, BackendError>;

    /// Earliest record of the collection.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when the query itself fails.
    fn find_first(&self) -> Result<Option<RecordRef>, BackendError> {
        Ok(self.find_all()?.into_iter().next())
    }

    /// Most recently created record of the collection.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when the query itself fails.
    fn find_last(&self) -> Result<Option<RecordRef>, BackendError> {
        Ok(self.find_all()?.into_iter().last())
    }

    /// Join through `relation` and find the record whose related `field`
    /// equals `value`.
    ///
    /// # Errors
    ///
    /// Returns the backend's error when the query itself fails.
    fn find_one_by_related(
        &self,
        relation: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<RecordRef>, BackendError>;
}

/// In-memory repository over JSON records kept in insertion order.
///
/// Field matches compare the textual form of the stored value, so a numeric
/// `id: 3` matches the key `"3"`. Joins accept a related object or an array
/// of related objects; any matching element selects the owning record.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use stepglue::repository::{MemoryRepository, Repository};
///
/// let repo = MemoryRepository::new("users")
///     .with_record(json!({ "id": 1, "email": "a@example.com" }))
///     .with_record(json!({ "id": 2, "email": "b@example.com" }));
/// let found = repo.find_one_by("id", "2").expect("query succeeds");
/// assert!(found.is_some());
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryRepository {
    identity: String,
    records: Vec<Arc<JsonValue>>,
}

impl MemoryRepository {
    /// Create an empty repository named `identity`.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            records: Vec::new(),
        }
    }

    /// Append a record, builder style.
    #[must_use]
    pub fn with_record(mut self, record: JsonValue) -> Self {
        self.insert(record);
        self
    }

    /// Append a record; later inserts are "more recent".
    pub fn insert(&mut self, record: JsonValue) {
        self.records.push(Arc::new(record));
    }

    /// Number of stored records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the repository holds no records.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn share(record: &Arc<JsonValue>) -> RecordRef {
        Arc::clone(record) as RecordRef
    }
}

fn field_matches(record: &JsonValue, field: &str, value: &str) -> bool {
    json_child(record, field).is_some_and(|stored| !stored.is_null() && scalar_text(stored) == value)
}

impl Repository for MemoryRepository {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn find_one_by(&self, field: &str, value: &str) -> Result<Option<RecordRef>, BackendError> {
        Ok(self
            .records
            .iter()
            .find(|record| field_matches(record, field, value))
            .map(Self::share))
    }

    fn find_all(&self) -> Result<Vec<RecordRef>, BackendError> {
        Ok(self.records.iter().map(Self::share).collect())
    }

    fn find_first(&self) -> Result<Option<RecordRef>, BackendError> {
        Ok(self.records.first().map(Self::share))
    }

    fn find_last(&self) -> Result<Option<RecordRef>, BackendError> {
        Ok(self.records.last().map(Self::share))
    }

    fn find_one_by_related(
        &self,
        relation: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<RecordRef>, BackendError> {
        let joined = |record: &&Arc<JsonValue>| match json_child(record, relation) {
            Some(JsonValue::Array(related)) => related
                .iter()
                .any(|item| field_matches(item, field, value)),
            Some(related) => field_matches(related, field, value),
            None => false,
        };
        Ok(self.records.iter().find(joined).map(Self::share))
    }
}
