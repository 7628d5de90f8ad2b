//! Assertions over messages captured by the host's mail transport.

use itertools::Itertools;

use super::{StepError, ensure, resolve};
use crate::expression::ExpressionEnvironment;

/// A message the application sent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MailMessage {
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Subject line.
    pub subject: String,
    /// Body text.
    pub body: String,
}

/// One row of an `I should get emails on:` table.
///
/// Blank cells are skipped when comparing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpectedEmail {
    /// Address that must be among the recipients.
    pub email: Option<String>,
    /// Text the subject must contain.
    pub subject: Option<String>,
    /// Text the body must contain.
    pub body: Option<String>,
}

impl ExpectedEmail {
    /// Build a row from table cells, treating empty cells as absent.
    #[must_use]
    pub fn from_cells(email: &str, subject: &str, body: &str) -> Self {
        let cell = |text: &str| (!text.is_empty()).then(|| text.to_owned());
        Self {
            email: cell(email),
            subject: cell(subject),
            body: cell(body),
        }
    }
}

/// `I should get emails on:` matches each sent message against the row at
/// the same position.
///
/// Expected cells may contain placeholders.
///
/// # Errors
///
/// Returns [`StepError::Assertion`] when a recipient, subject or body does
/// not match, or when the number of sent messages differs from the table.
pub fn emails_should_match(
    env: &ExpressionEnvironment,
    sent: &[MailMessage],
    expected: &[ExpectedEmail],
) -> Result<(), StepError> {
    for (index, message) in sent.iter().enumerate() {
        let row = expected.get(index);
        let Some(address) = row.and_then(|row| row.email.as_deref()) else {
            return ensure(false, || {
                "Expected emails are less than the sent ones".to_owned()
            });
        };
        let address = resolve(address, env)?;
        ensure(message.to.iter().any(|to| *to == address), || {
            format!(
                "Email \"{address}\" not found in list [\"{}\"]",
                message.to.iter().join(", ")
            )
        })?;
        if let Some(subject) = row.and_then(|row| row.subject.as_deref()) {
            let subject = resolve(subject, env)?;
            ensure(message.subject.contains(&subject), || {
                format!("Subject \"{subject}\" not found in \"{}\"", message.subject)
            })?;
        }
        if let Some(body) = row.and_then(|row| row.body.as_deref()) {
            let body = resolve(body, env)?;
            ensure(message.body.contains(&body), || {
                format!("Content \"{body}\" not found in \"{}\"", message.body)
            })?;
        }
    }
    ensure(sent.len() == expected.len(), || {
        format!(
            "expected {} emails to be sent, but {} were",
            expected.len(),
            sent.len()
        )
    })
}

/// `I should get no emails`.
///
/// # Errors
///
/// Returns [`StepError::Assertion`] when any message was sent.
pub fn no_emails_should_be_sent(sent: &[MailMessage]) -> Result<(), StepError> {
    ensure(sent.is_empty(), || {
        format!("expected no emails, but {} were sent", sent.len())
    })
}
