//! Debug output channel for step helpers.
//!
//! Failing placeholders and API dumps are written line by line to a
//! [`DebugSink`]. The default [`TracingSink`] forwards to `tracing`; hosts that
//! print to their runner's console implement the trait themselves, and tests
//! use [`BufferSink`] to inspect what was written.

use std::sync::{Mutex, PoisonError};

/// Line-oriented debug output.
pub trait DebugSink: Send + Sync {
    /// Write a single line.
    fn write_line(&self, text: &str);
}

/// Forwards debug lines to `tracing` at `DEBUG` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn write_line(&self, text: &str) {
        tracing::debug!(target: "stepglue::debug", "{text}");
    }
}

/// Collects debug lines in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
    lines: Mutex<Vec<String>>,
}

impl BufferSink {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the lines written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DebugSink for BufferSink {
    fn write_line(&self, text: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_owned());
    }
}
