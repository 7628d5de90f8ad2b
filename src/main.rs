//! Application entry point.
//!
//! Parses command-line arguments and delegates execution to [`runner::run`].
//! Failures are rendered as `miette` reports on standard error.

use clap::Parser;
use miette::Diagnostic;
use std::{
    io::{self, Write},
    process::ExitCode,
};
use stepglue::{
    accessor::AccessError, cli::Cli, config::ConfigError, fixtures::FixtureError,
    lookup::LookupError, placeholder::PlaceholderError, runner,
};
use tracing::Level;
use tracing_subscriber::fmt;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let max_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::ERROR
    };
    fmt().with_max_level(max_level).with_writer(io::stderr).init();
    let mut stdout = io::stdout().lock();
    match runner::run(&cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            let report = into_report(err);
            if writeln!(io::stderr(), "{report:?}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}

/// Recover the typed diagnostic so its code, labels and help survive
/// rendering.
fn into_report(err: anyhow::Error) -> miette::Report {
    downcast_report::<PlaceholderError>(err)
        .or_else(downcast_report::<FixtureError>)
        .or_else(downcast_report::<LookupError>)
        .or_else(downcast_report::<AccessError>)
        .or_else(downcast_report::<ConfigError>)
        .unwrap_or_else(|other| miette::miette!("{other:#}"))
}

fn downcast_report<E>(err: anyhow::Error) -> Result<miette::Report, anyhow::Error>
where
    E: Diagnostic + Send + Sync + 'static,
{
    err.downcast::<E>().map(miette::Report::new)
}
