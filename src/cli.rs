//! Command line interface definition using clap.
//!
//! The binary exposes the resolver and lookup tables for trying out fixture
//! files and placeholder text outside a scenario runner.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use serde_json::Value as JsonValue;
use std::path::PathBuf;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::config::BASE_DIR_ENV;

/// Split `NAME=VALUE`. Values that parse as JSON keep their type; anything
/// else is taken as a string.
fn parse_var(raw: &str) -> Result<(String, JsonValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("'{raw}' is not of the form NAME=VALUE"))?;
    if name.is_empty() {
        return Err(format!("'{raw}' has an empty variable name"));
    }
    let parsed =
        serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_owned()));
    Ok((name.to_owned(), parsed))
}

fn parse_instant(raw: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|err| format!("'{raw}' is not an RFC 3339 timestamp: {err}"))
}

/// Resolve `%expression%` placeholders against fixture tables and variables.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Arguments accepted by the `resolve` command.
#[derive(Debug, Args, PartialEq, Clone)]
pub struct ResolveArgs {
    /// YAML or JSON fixture file with variables and tables.
    #[arg(long, value_name = "FILE")]
    pub fixtures: Option<PathBuf>,

    /// Directory the file helpers may read from.
    #[arg(long, value_name = "DIR", env = BASE_DIR_ENV)]
    pub base_dir: Option<Utf8PathBuf>,

    /// Leave unmatched `%` characters in place instead of failing.
    #[arg(long)]
    pub lenient: bool,

    /// Define a variable; repeatable.
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, JsonValue)>,

    /// Fix the clock used by the date helpers (RFC 3339).
    #[arg(long, value_name = "TIMESTAMP", value_parser = parse_instant)]
    pub now: Option<OffsetDateTime>,

    /// Text containing placeholders.
    pub text: String,
}

/// Arguments accepted by the `lookup` command.
#[derive(Debug, Args, PartialEq, Eq, Clone)]
pub struct LookupArgs {
    /// YAML or JSON fixture file defining the table.
    #[arg(long, value_name = "FILE")]
    pub fixtures: PathBuf,

    /// Table name.
    pub table: String,

    /// Key: `first`, `last`, `nthN` or a value of the table's field.
    pub key: String,

    /// Dotted path to read from the found record.
    pub path: Option<String>,
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Clone)]
pub enum Commands {
    /// Print the text with every placeholder substituted.
    Resolve(ResolveArgs),

    /// Print a record, or one of its values, as JSON.
    Lookup(LookupArgs),
}
