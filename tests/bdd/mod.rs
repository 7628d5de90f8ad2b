//! BDD test module providing the scenario world and step definitions.
//!
//! Step definitions are registered via `#[given]`, `#[when]`, and `#[then]`
//! attribute macros from rstest-bdd.

pub mod fixtures;
pub mod steps;
