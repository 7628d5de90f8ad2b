//! Steps checking captured email.

use crate::bdd::fixtures::{RefCell, StepWorld};
use anyhow::{Context, Result};
use rstest_bdd_macros::{given, then};
use stepglue::steps::email::{self, ExpectedEmail, MailMessage};

#[given("the application sent {subject:string} to {recipient:string}")]
fn application_sent(world: &RefCell<StepWorld>, subject: &str, recipient: &str) {
    world.borrow_mut().sent.push(MailMessage {
        to: vec![recipient.to_owned()],
        subject: subject.to_owned(),
        body: format!("Hello {recipient}, this is about {subject}."),
    });
}

#[then("I should get emails on:")]
fn emails_on(world: &RefCell<StepWorld>, datatable: Vec<Vec<String>>) -> Result<()> {
    let (header, rows) = datatable.split_first().context("table needs a header row")?;
    let column = |name: &str| header.iter().position(|cell| cell == name);
    let (email_at, subject_at, body_at) = (column("email"), column("subject"), column("body"));
    let cell = |row: &[String], at: Option<usize>| {
        at.and_then(|index| row.get(index))
            .map_or("", String::as_str)
            .to_owned()
    };
    let expected = rows
        .iter()
        .map(|row| {
            ExpectedEmail::from_cells(
                &cell(row, email_at),
                &cell(row, subject_at),
                &cell(row, body_at),
            )
        })
        .collect::<Vec<_>>();
    let world = world.borrow();
    Ok(email::emails_should_match(&world.env, &world.sent, &expected)?)
}

#[then("I should get no emails")]
fn no_emails(world: &RefCell<StepWorld>) -> Result<()> {
    Ok(email::no_emails_should_be_sent(&world.borrow().sent)?)
}
