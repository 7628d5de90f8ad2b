//! Configuration for building an expression environment.
//!
//! [`StepsConfig`] collects the knobs the helpers need: the capability-scoped
//! base directory for the file helpers, the unbalanced-placeholder policy and
//! the clock used by the date helpers. It is cheap to clone and is consumed by
//! [`ExpressionEnvironment::new`](crate::expression::ExpressionEnvironment::new).

use std::{io, sync::Arc};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use miette::Diagnostic;
use thiserror::Error;
use time::OffsetDateTime;

/// Environment variable naming the default base directory for file helpers.
pub const BASE_DIR_ENV: &str = "STEPGLUE_BASE_DIR";

/// Errors raised while configuring or using configured resources.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A file helper ran before a base directory was configured.
    #[error("{helper}() needs a base directory, but none was configured")]
    #[diagnostic(
        code(stepglue::config::base_dir_unset),
        help("call StepsConfig::with_base_dir or pass --base-dir")
    )]
    BaseDirUnset {
        /// Name of the helper that needed the directory.
        helper: String,
    },
    /// The base directory could not be opened.
    #[error("failed to open base directory {path}")]
    #[diagnostic(code(stepglue::config::open_base_dir))]
    OpenBaseDir {
        /// Path that was opened.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

/// What the resolver does with a `%` that has no closing partner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnbalancedPolicy {
    /// Fail with [`PlaceholderError::Unbalanced`](crate::placeholder::PlaceholderError::Unbalanced).
    #[default]
    Strict,
    /// Leave the text from the unmatched `%` onwards unchanged.
    Lenient,
}

/// Time source for the `date`, `datetime` and `now` helpers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Clock {
    /// Read the system clock (UTC) on every call.
    #[default]
    System,
    /// Always report this instant.
    Fixed(OffsetDateTime),
}

impl Clock {
    /// Current instant according to this clock.
    #[must_use]
    pub fn now(self) -> OffsetDateTime {
        match self {
            Self::System => OffsetDateTime::now_utc(),
            Self::Fixed(instant) => instant,
        }
    }
}

/// Configuration consumed when building an expression environment.
#[derive(Clone, Debug, Default)]
pub struct StepsConfig {
    base_dir: Option<Arc<Dir>>,
    base_dir_path: Option<Utf8PathBuf>,
    policy: UnbalancedPolicy,
    clock: Clock,
}

impl StepsConfig {
    /// Create a configuration with strict placeholders, the system clock and
    /// no base directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope the file helpers to `dir`.
    #[must_use]
    pub fn with_base_dir(mut self, dir: Dir) -> Self {
        self.base_dir = Some(Arc::new(dir));
        self
    }

    /// Open `path` with ambient authority and scope the file helpers to it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OpenBaseDir`] when the directory cannot be
    /// opened.
    pub fn open_base_dir(mut self, path: impl AsRef<Utf8Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let dir = Dir::open_ambient_dir(path, ambient_authority()).map_err(|source| {
            ConfigError::OpenBaseDir {
                path: path.to_owned(),
                source,
            }
        })?;
        tracing::debug!(%path, "opened base directory for file helpers");
        self.base_dir = Some(Arc::new(dir));
        self.base_dir_path = Some(path.to_owned());
        Ok(self)
    }

    /// Choose how unbalanced `%` delimiters are handled.
    #[must_use]
    pub fn with_policy(mut self, policy: UnbalancedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Freeze the date helpers at `instant`.
    #[must_use]
    pub fn with_fixed_now(mut self, instant: OffsetDateTime) -> Self {
        self.clock = Clock::Fixed(instant);
        self
    }

    /// The configured base directory handle.
    #[must_use]
    pub fn base_dir(&self) -> Option<&Arc<Dir>> {
        self.base_dir.as_ref()
    }

    /// The configured base directory path, when opened through
    /// [`Self::open_base_dir`].
    #[must_use]
    pub fn base_dir_path(&self) -> Option<&Utf8Path> {
        self.base_dir_path.as_deref()
    }

    /// The unbalanced-delimiter policy.
    #[must_use]
    pub const fn policy(&self) -> UnbalancedPolicy {
        self.policy
    }

    /// The clock used by the date helpers.
    #[must_use]
    pub const fn clock(&self) -> Clock {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[rstest]
    fn defaults_are_strict_and_unscoped() {
        let config = StepsConfig::new();
        assert_eq!(config.policy(), UnbalancedPolicy::Strict);
        assert_eq!(config.clock(), Clock::System);
        assert!(config.base_dir().is_none());
    }

    #[rstest]
    fn fixed_clock_reports_its_instant() {
        let instant = datetime!(2024-05-21 10:30:00 UTC);
        let config = StepsConfig::new().with_fixed_now(instant);
        assert_eq!(config.clock().now(), instant);
    }

    #[rstest]
    fn open_base_dir_records_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
        let config = StepsConfig::new().open_base_dir(&path).expect("open dir");
        assert_eq!(config.base_dir_path(), Some(path.as_path()));
        assert!(config.base_dir().is_some());
    }

    #[rstest]
    fn open_base_dir_reports_missing_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let missing = Utf8PathBuf::from_path_buf(temp.path().join("absent")).expect("utf8 path");
        let err = StepsConfig::new()
            .open_base_dir(&missing)
            .expect_err("directory does not exist");
        assert!(matches!(err, ConfigError::OpenBaseDir { .. }));
    }
}
