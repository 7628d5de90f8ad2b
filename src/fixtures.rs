//! Fixture files describing variables and lookup tables.
//!
//! A fixture file is YAML (JSON being a subset) with two optional sections:
//!
//! ```yaml
//! variables:
//!   name: World
//! tables:
//!   users:
//!     field: email
//!     relation: author
//!     records:
//!       - { id: 1, email: a@example.com }
//! ```
//!
//! Each table is backed by a [`MemoryRepository`] and registered on an
//! [`ExpressionEnvironment`] by [`FixtureFile::install`]. Parse failures are
//! reported as [`FixtureError`] diagnostics pointing at the offending line.

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use miette::{Diagnostic, NamedSource, SourceSpan};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use serde_saphyr::{Error as YamlError, Location};
use thiserror::Error;

use crate::{
    expression::ExpressionEnvironment,
    lookup::LookupTable,
    repository::MemoryRepository,
};

const TAB_HINT: &str = "Use spaces for indentation; tabs are invalid in YAML.";

const HINTS: [(&str, &str); 3] = [
    (
        "did not find expected '-'",
        "Start list items with '-' and ensure proper indentation.",
    ),
    (
        "mapping values are not allowed",
        "Check for a stray ':' or add quotes around values where needed.",
    ),
    (
        "unknown field",
        "Tables accept only 'field', 'relation', 'collection' and 'records'.",
    ),
];

/// A fixture file that could not be parsed.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(stepglue::fixtures::parse))]
pub struct FixtureError {
    #[source_code]
    src: NamedSource<String>,
    #[label("parse error here")]
    span: Option<SourceSpan>,
    #[help]
    help: Option<String>,
    #[source]
    source: YamlError,
    message: String,
}

impl FixtureError {
    fn new(err: YamlError, text: &str, name: &str) -> Self {
        let location = err.location();
        let (line, column, span) = location.map_or((1, 1, None), |loc| {
            (loc.line(), loc.column(), Some(span_at(text, loc)))
        });
        let detail = err.to_string();
        let help = hint_for(&detail, text);
        Self {
            src: NamedSource::new(name, text.to_owned()),
            span,
            help,
            message: format!("fixture parse error at line {line}, column {column}: {detail}"),
            source: err,
        }
    }

    /// Source span of the error, when the parser reported a location.
    #[must_use]
    pub const fn span(&self) -> Option<SourceSpan> {
        self.span
    }
}

/// One lookup table in a fixture file.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TableFixture {
    /// Field matched by keyed lookups.
    pub field: String,
    /// Relation followed on each found record.
    #[serde(default)]
    pub relation: Option<String>,
    /// Collection name shown in errors; defaults to the table name.
    #[serde(default)]
    pub collection: Option<String>,
    /// Records in insertion order.
    #[serde(default)]
    pub records: Vec<JsonValue>,
}

impl TableFixture {
    /// Build the lookup table backed by these records.
    #[must_use]
    pub fn to_lookup(&self, name: &str) -> LookupTable {
        let identity = self.collection.as_deref().unwrap_or(name);
        let repository = self
            .records
            .iter()
            .cloned()
            .fold(MemoryRepository::new(identity), MemoryRepository::with_record);
        let table = LookupTable::new(Arc::new(repository), self.field.as_str());
        match &self.relation {
            Some(relation) => table.with_relation(relation.as_str()),
            None => table,
        }
    }
}

/// Parsed contents of a fixture file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FixtureFile {
    /// Global variables, in file order.
    #[serde(default)]
    pub variables: IndexMap<String, JsonValue>,
    /// Lookup tables, in file order.
    #[serde(default)]
    pub tables: IndexMap<String, TableFixture>,
}

impl FixtureFile {
    /// Parse fixture text. `name` labels the source in diagnostics.
    ///
    /// # Examples
    /// ```
    /// use stepglue::fixtures::FixtureFile;
    ///
    /// let fixtures = FixtureFile::parse("variables: { name: World }", "inline").expect("valid");
    /// assert_eq!(fixtures.variables["name"], "World");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError`] when the text is not valid YAML or does not
    /// match the fixture layout.
    pub fn parse(text: &str, name: &str) -> Result<Self, FixtureError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_saphyr::from_str(text).map_err(|err| FixtureError::new(err, text, name))
    }

    /// Read and parse the fixture file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixtures from {}", path.display()))?;
        let fixtures = Self::parse(&text, &path.display().to_string())?;
        tracing::debug!(
            path = %path.display(),
            variables = fixtures.variables.len(),
            tables = fixtures.tables.len(),
            "loaded fixtures"
        );
        Ok(fixtures)
    }

    /// Table fixture named `name`.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&TableFixture> {
        self.tables.get(name)
    }

    /// Register every variable and table on `env`.
    pub fn install(&self, env: &mut ExpressionEnvironment) {
        for (name, value) in &self.variables {
            env.add_serialized(name.as_str(), value);
        }
        for (name, table) in &self.tables {
            if env.contains(name) {
                tracing::warn!(name = %name, "fixture table replaces a variable of the same name");
            }
            env.add_table(name.as_str(), table.to_lookup(name));
        }
    }
}

fn hint_for(detail: &str, text: &str) -> Option<String> {
    if has_tab_indent(text) {
        return Some(TAB_HINT.to_owned());
    }
    HINTS
        .iter()
        .find(|(needle, _)| detail.contains(*needle))
        .map(|(_, hint)| (*hint).to_owned())
}

/// Whether any line is indented with a tab.
fn has_tab_indent(text: &str) -> bool {
    text.lines().any(|line| {
        line.chars()
            .take_while(|ch| ch.is_whitespace())
            .any(|ch| ch == '\t')
    })
}

/// Byte offset of a one-based line and column.
fn byte_offset(text: &str, line: u64, column: u64) -> usize {
    let target_line = usize::try_from(line.saturating_sub(1)).unwrap_or(usize::MAX);
    let target_column = usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX);
    let mut offset = 0;
    for (index, segment) in text.split_inclusive('\n').enumerate() {
        if index == target_line {
            let content = segment.trim_end_matches(['\n', '\r']);
            return offset
                + content
                    .char_indices()
                    .nth(target_column)
                    .map_or(content.len(), |(at, _)| at);
        }
        offset += segment.len();
    }
    text.len()
}

fn span_at(text: &str, location: Location) -> SourceSpan {
    let at = byte_offset(text, location.line(), location.column());
    let width = text
        .get(at..)
        .and_then(|rest| rest.chars().next())
        .filter(|ch| !matches!(ch, '\n' | '\r'))
        .map_or(0, char::len_utf8);
    SourceSpan::new(at.into(), width)
}
