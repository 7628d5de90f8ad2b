//! Steps driving the JSON API session without a network.

use crate::bdd::fixtures::{RefCell, StepWorld};
use anyhow::{Context, Result, ensure};
use rstest_bdd_macros::{given, then, when};
use stepglue::{debug::BufferSink, steps::api::ApiResponse};

#[given("the access token {token:string}")]
fn access_token(world: &RefCell<StepWorld>, token: &str) {
    world.borrow_mut().session.set_access_token(token);
}

#[given("the request payload:")]
fn request_payload(world: &RefCell<StepWorld>, docstring: String) {
    world.borrow_mut().session.set_payload(docstring.trim());
}

#[given("the server responded with status {status} and body:")]
fn server_responded(world: &RefCell<StepWorld>, status: u16, docstring: String) {
    world.borrow_mut().session.record_response(ApiResponse {
        status,
        headers: vec![(
            "Content-Type".to_owned(),
            "application/json".to_owned(),
        )],
        body: docstring,
    });
}

#[given("the server responded with status {status} and HTML body:")]
fn server_responded_html(world: &RefCell<StepWorld>, status: u16, docstring: String) {
    world.borrow_mut().session.record_response(ApiResponse {
        status,
        headers: vec![("Content-Type".to_owned(), "text/html".to_owned())],
        body: docstring,
    });
}

#[when("the failure is reported")]
fn failure_reported(world: &RefCell<StepWorld>) {
    let sink = BufferSink::new();
    let mut world = world.borrow_mut();
    world.session.report_failure(&sink);
    world.report = sink.lines();
}

#[then("the report includes {expected:string}")]
fn report_includes(world: &RefCell<StepWorld>, expected: &str) -> Result<()> {
    let world = world.borrow();
    ensure!(
        world.report.iter().any(|line| line.trim() == expected),
        "expected a report line {expected:?}, got {:?}",
        world.report
    );
    Ok(())
}

#[when("I prepare a {method:string} request to {resource:string}")]
fn prepare_request(world: &RefCell<StepWorld>, method: &str, resource: &str) {
    let mut guard = world.borrow_mut();
    let state = &mut *guard;
    match state.session.prepare_request(&state.env, method, resource) {
        Ok(request) => state.request = Some(request),
        Err(err) => state.record_failure(&err),
    }
}

#[then("the prepared resource is {expected:string}")]
fn prepared_resource(world: &RefCell<StepWorld>, expected: &str) -> Result<()> {
    let world = world.borrow();
    let request = world.request.as_ref().context("no request was prepared")?;
    ensure!(
        request.resource == expected,
        "expected {expected:?}, got {:?}",
        request.resource
    );
    Ok(())
}

#[then("the prepared body is {expected:string}")]
fn prepared_body(world: &RefCell<StepWorld>, expected: &str) -> Result<()> {
    let world = world.borrow();
    let body = world
        .request
        .as_ref()
        .and_then(|request| request.body.as_deref())
        .context("no request body was prepared")?;
    ensure!(body == expected, "expected {expected:?}, got {body:?}");
    Ok(())
}

#[then("the response status code should be {code}")]
fn status_code(world: &RefCell<StepWorld>, code: u16) -> Result<()> {
    Ok(world.borrow().session.status_code_should_be(code)?)
}

#[then("the {path:string} property should equal {expected:string}")]
fn property_equals(world: &RefCell<StepWorld>, path: &str, expected: &str) -> Result<()> {
    let world = world.borrow();
    Ok(world.session.property_should_equal(&world.env, path, expected)?)
}

#[then("the {path:string} property should contain {needle:string}")]
fn property_contains(world: &RefCell<StepWorld>, path: &str, needle: &str) -> Result<()> {
    let world = world.borrow();
    Ok(world.session.property_should_contain(&world.env, path, needle)?)
}

#[then("the {path:string} property should not exist")]
fn property_absent(world: &RefCell<StepWorld>, path: &str) -> Result<()> {
    Ok(world.borrow().session.property_should_not_exist(path)?)
}

#[then("the {name:string} link should exist")]
fn link_exists(world: &RefCell<StepWorld>, name: &str) -> Result<()> {
    Ok(world.borrow().session.link_should_exist(name)?)
}

#[then("the {path:string} property should contain {count} items")]
fn property_count(world: &RefCell<StepWorld>, path: &str, count: usize) -> Result<()> {
    Ok(world.borrow().session.property_should_have_count(path, count)?)
}
