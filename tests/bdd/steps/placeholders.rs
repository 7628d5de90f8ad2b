//! Steps for placeholder resolution and entity assertions.

use crate::bdd::fixtures::{RefCell, StepWorld};
use anyhow::{Context, Result, ensure};
use rstest_bdd_macros::{given, then, when};
use stepglue::{placeholder, steps::entity};

#[given("a users table keyed by email")]
fn users_table(world: &RefCell<StepWorld>) {
    world.borrow_mut().add_users();
}

#[given("lenient placeholder resolution")]
fn lenient_resolution(world: &RefCell<StepWorld>) {
    world.borrow_mut().use_lenient_policy();
}

#[when("I resolve {text:string}")]
fn resolve_text(world: &RefCell<StepWorld>, text: &str) {
    let mut world = world.borrow_mut();
    match placeholder::resolve(text, &world.env) {
        Ok(resolved) => world.resolved = Some(resolved),
        Err(err) => world.record_failure(&err),
    }
}

#[then("the result is {expected:string}")]
fn result_is(world: &RefCell<StepWorld>, expected: &str) -> Result<()> {
    let world = world.borrow();
    let resolved = world
        .resolved
        .as_deref()
        .with_context(|| format!("resolution failed: {:?}", world.failure))?;
    ensure!(resolved == expected, "expected {expected:?}, got {resolved:?}");
    Ok(())
}

#[then("the step fails with {message:string}")]
fn step_fails_with(world: &RefCell<StepWorld>, message: &str) -> Result<()> {
    let world = world.borrow();
    let failure = world.failure.as_deref().context("no step failed")?;
    ensure!(
        failure.contains(message),
        "expected failure containing {message:?}, got {failure:?}"
    );
    Ok(())
}

#[then("the {actual:string} entity property should be {expected:string}")]
fn entity_property_is(world: &RefCell<StepWorld>, actual: &str, expected: &str) -> Result<()> {
    Ok(entity::property_should_be(&world.borrow().env, actual, expected)?)
}

#[then("the {actual:string} entity property should contain {needle:string}")]
fn entity_property_contains(
    world: &RefCell<StepWorld>,
    actual: &str,
    needle: &str,
) -> Result<()> {
    Ok(entity::property_should_contain(&world.borrow().env, actual, needle)?)
}

#[then("the {actual:string} entity property should not be empty")]
fn entity_property_not_empty(world: &RefCell<StepWorld>, actual: &str) -> Result<()> {
    Ok(entity::property_should_not_be_empty(&world.borrow().env, actual)?)
}
