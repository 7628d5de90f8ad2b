//! Entity lookup tables.
//!
//! A [`LookupTable`] turns the short keys scenario authors write (`last`,
//! `first`, `nth3`, `a@example.com`) into exactly one record of a
//! [`Repository`], wrapped in an [`Accessor`]. Keys are tried in a fixed
//! order: `last`, `first`, `nthN`, then the bound field (optionally through a
//! relation). A key that matches nothing is always an error.

use std::{fmt, sync::Arc};

use miette::Diagnostic;
use thiserror::Error;

use crate::{
    accessor::Accessor,
    repository::{BackendError, RecordRef, Repository},
};

/// Errors raised when resolving a lookup key.
#[derive(Debug, Error, Diagnostic)]
pub enum LookupError {
    /// No record matched the key.
    #[error("cannot find {field}={key} via {collection}")]
    #[diagnostic(
        code(stepglue::lookup::not_found),
        help("check the fixture data or the key spelling in the scenario")
    )]
    NotFound {
        /// The field the table is bound to.
        field: String,
        /// The key that was attempted.
        key: String,
        /// Identity of the backing collection.
        collection: String,
    },
    /// The backend query failed.
    #[error("lookup of {key} via {collection} failed")]
    #[diagnostic(code(stepglue::lookup::backend))]
    Backend {
        /// The key that was attempted.
        key: String,
        /// Identity of the backing collection.
        collection: String,
        /// Error reported by the backend.
        #[source]
        source: BackendError,
    },
}

/// A parsed lookup key, in precedence order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKey<'a> {
    /// The most recently created record.
    Last,
    /// The earliest record.
    First,
    /// The record at one-based position `n` of the natural listing order.
    Nth(usize),
    /// A value of the bound field.
    Value(&'a str),
}

impl<'a> LookupKey<'a> {
    /// Classify `raw` according to the lookup precedence rules.
    ///
    /// `last` and `first` are matched exactly. `nth` is matched
    /// case-insensitively and must be followed only by decimal digits.
    ///
    /// # Examples
    /// ```
    /// use stepglue::lookup::LookupKey;
    ///
    /// assert_eq!(LookupKey::parse("last"), LookupKey::Last);
    /// assert_eq!(LookupKey::parse("NTH3"), LookupKey::Nth(3));
    /// assert_eq!(LookupKey::parse("nthx"), LookupKey::Value("nthx"));
    /// ```
    #[must_use]
    pub fn parse(raw: &'a str) -> Self {
        match raw {
            "last" => Self::Last,
            "first" => Self::First,
            _ => parse_nth(raw).map_or(Self::Value(raw), Self::Nth),
        }
    }
}

fn parse_nth(raw: &str) -> Option<usize> {
    let prefix = raw.get(..3)?;
    if !prefix.eq_ignore_ascii_case("nth") {
        return None;
    }
    let digits = raw.get(3..)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Resolver from a string key to a single record of one repository.
#[derive(Clone)]
pub struct LookupTable {
    repository: Arc<dyn Repository>,
    field: String,
    relation: Option<String>,
}

impl fmt::Debug for LookupTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupTable")
            .field("collection", &self.repository.identity())
            .field("field", &self.field)
            .field("relation", &self.relation)
            .finish()
    }
}

impl LookupTable {
    /// Bind a table to `repository`, matching plain keys against `field`.
    #[must_use]
    pub fn new(repository: Arc<dyn Repository>, field: impl Into<String>) -> Self {
        Self {
            repository,
            field: field.into(),
            relation: None,
        }
    }

    /// Match plain keys against `field` of the related entity `relation`.
    #[must_use]
    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(relation.into());
        self
    }

    /// The bound field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The bound relation, if any.
    #[must_use]
    pub fn relation(&self) -> Option<&str> {
        self.relation.as_deref()
    }

    /// Identity of the backing collection.
    #[must_use]
    pub fn collection(&self) -> &str {
        self.repository.identity()
    }

    /// Resolve `key` to a single record.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use serde_json::json;
    /// use stepglue::{lookup::LookupTable, repository::MemoryRepository};
    ///
    /// let repo = MemoryRepository::new("users")
    ///     .with_record(json!({ "email": "a@example.com" }))
    ///     .with_record(json!({ "email": "b@example.com" }));
    /// let users = LookupTable::new(Arc::new(repo), "email");
    /// let last = users.get("last").expect("collection is not empty");
    /// assert_eq!(last.read("email").expect("field").to_json(), json!("b@example.com"));
    /// assert!(users.get("c@example.com").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::NotFound`] when nothing matches and
    /// [`LookupError::Backend`] when the repository query fails.
    pub fn get(&self, key: &str) -> Result<Accessor, LookupError> {
        let parsed = LookupKey::parse(key);
        tracing::debug!(
            collection = self.collection(),
            field = %self.field,
            key,
            ?parsed,
            "resolving lookup key"
        );
        let found = self.query(parsed).map_err(|source| LookupError::Backend {
            key: key.to_owned(),
            collection: self.collection().to_owned(),
            source,
        })?;
        let record = found.ok_or_else(|| LookupError::NotFound {
            field: self.field.clone(),
            key: key.to_owned(),
            collection: self.collection().to_owned(),
        })?;
        Ok(Accessor::new(record, format!("{}[{key}]", self.collection())))
    }

    fn query(&self, key: LookupKey<'_>) -> Result<Option<RecordRef>, BackendError> {
        match key {
            LookupKey::Last => self.repository.find_last(),
            LookupKey::First => self.repository.find_first(),
            LookupKey::Nth(position) => {
                let Some(index) = position.checked_sub(1) else {
                    return Ok(None);
                };
                Ok(self.repository.find_all()?.into_iter().nth(index))
            }
            LookupKey::Value(value) => match &self.relation {
                Some(relation) => self
                    .repository
                    .find_one_by_related(relation, &self.field, value),
                None => self.repository.find_one_by(&self.field, value),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use rstest::{fixture, rstest};
    use serde_json::{Value as JsonValue, json};

    #[derive(Debug)]
    struct BrokenRepository;

    impl Repository for BrokenRepository {
        fn identity(&self) -> &str {
            "broken"
        }

        fn find_one_by(&self, _: &str, _: &str) -> Result<Option<RecordRef>, BackendError> {
            Err("connection refused".into())
        }

        fn find_all(&self) -> Result<Vec<RecordRef>, BackendError> {
            Err("connection refused".into())
        }

        fn find_one_by_related(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<Option<RecordRef>, BackendError> {
            Err("connection refused".into())
        }
    }

    #[fixture]
    fn users() -> LookupTable {
        let repo = MemoryRepository::new("users")
            .with_record(json!({ "name": "A", "email": "a@example.com" }))
            .with_record(json!({ "name": "B", "email": "b@example.com" }))
            .with_record(json!({ "name": "C", "email": "c@example.com" }));
        LookupTable::new(Arc::new(repo), "email")
    }

    fn name(accessor: &Accessor) -> JsonValue {
        accessor.read("name").expect("name field").to_json()
    }

    #[rstest]
    #[case("last", "C")]
    #[case("first", "A")]
    #[case("nth2", "B")]
    #[case("NTH1", "A")]
    #[case("b@example.com", "B")]
    fn keys_resolve_by_precedence(users: LookupTable, #[case] key: &str, #[case] expected: &str) {
        let found = users.get(key).expect("key should resolve");
        assert_eq!(name(&found), json!(expected));
    }

    #[rstest]
    #[case("nonexistent")]
    #[case("nth4")]
    #[case("nth0")]
    fn unmatched_keys_fail_with_context(users: LookupTable, #[case] key: &str) {
        let err = users.get(key).expect_err("key should not resolve");
        match &err {
            LookupError::NotFound {
                field,
                key: attempted,
                collection,
            } => {
                assert_eq!(field, "email");
                assert_eq!(attempted, key);
                assert_eq!(collection, "users");
            }
            LookupError::Backend { .. } => panic!("unexpected backend error: {err}"),
        }
        assert_eq!(err.to_string(), format!("cannot find email={key} via users"));
    }

    #[rstest]
    fn empty_collections_have_no_last_record() {
        let table = LookupTable::new(Arc::new(MemoryRepository::new("users")), "email");
        let err = table.get("last").expect_err("empty collection");
        assert!(matches!(err, LookupError::NotFound { .. }));
    }

    #[rstest]
    fn relation_matches_related_field_not_own_field() {
        let repo = MemoryRepository::new("posts")
            .with_record(json!({
                "title": "own",
                "email": "x@example.com",
                "author": { "email": "someone@example.com" }
            }))
            .with_record(json!({
                "title": "joined",
                "email": "other@example.com",
                "author": { "email": "x@example.com" }
            }));
        let posts = LookupTable::new(Arc::new(repo), "email").with_relation("author");
        let found = posts.get("x@example.com").expect("joined record");
        assert_eq!(found.read("title").expect("title").to_json(), json!("joined"));
    }

    #[rstest]
    fn backend_failures_are_wrapped() {
        let table = LookupTable::new(Arc::new(BrokenRepository), "id");
        let err = table.get("7").expect_err("backend fails");
        assert!(matches!(err, LookupError::Backend { .. }));
        assert_eq!(err.to_string(), "lookup of 7 via broken failed");
    }

    #[rstest]
    #[case("nth", LookupKey::Value("nth"))]
    #[case("nth12", LookupKey::Nth(12))]
    #[case("Nth7", LookupKey::Nth(7))]
    #[case("nth-1", LookupKey::Value("nth-1"))]
    #[case("Last", LookupKey::Value("Last"))]
    #[case("first", LookupKey::First)]
    fn key_parsing(#[case] raw: &str, #[case] expected: LookupKey<'static>) {
        assert_eq!(LookupKey::parse(raw), expected);
    }
}
