//! BDD test entry point using rstest-bdd.
//!
//! The `scenarios!` macro generates one test per scenario found under
//! `tests/features`, injecting a fresh [`StepWorld`] into each.

mod bdd;

pub use bdd::fixtures::*;

use rstest_bdd_macros::scenarios;

scenarios!("tests/features", fixtures = [world: RefCell<StepWorld>]);
