//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! builds the expression environment from the parsed arguments and writes the
//! command's output.

use std::io::Write;

use anyhow::{Context, Result};
use tracing::debug;

use crate::{
    cli::{Cli, Commands, LookupArgs, ResolveArgs},
    config::{StepsConfig, UnbalancedPolicy},
    expression::ExpressionEnvironment,
    fixtures::FixtureFile,
    placeholder,
    record::Field,
};

/// Execute the parsed [`Cli`] command, writing its result to `out`.
///
/// # Errors
///
/// Returns an error when fixtures cannot be loaded, the text cannot be
/// resolved, the lookup fails, or `out` cannot be written.
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    match &cli.command {
        Commands::Resolve(args) => {
            let resolved = resolve(args)?;
            writeln!(out, "{resolved}").context("write resolved text")?;
        }
        Commands::Lookup(args) => {
            let value = lookup(args)?;
            let rendered = serde_json::to_string_pretty(&value).context("serialise record")?;
            writeln!(out, "{rendered}").context("write record")?;
        }
    }
    Ok(())
}

fn resolve(args: &ResolveArgs) -> Result<String> {
    let mut config = StepsConfig::new();
    if let Some(dir) = &args.base_dir {
        config = config.open_base_dir(dir)?;
    }
    if args.lenient {
        config = config.with_policy(UnbalancedPolicy::Lenient);
    }
    if let Some(instant) = args.now {
        config = config.with_fixed_now(instant);
    }
    let mut env = ExpressionEnvironment::new(&config);
    if let Some(path) = &args.fixtures {
        FixtureFile::load(path)?.install(&mut env);
    }
    for (name, value) in &args.vars {
        env.add_serialized(name.as_str(), value);
    }
    debug!(text = %args.text, "resolving placeholders");
    Ok(placeholder::resolve(&args.text, &env)?)
}

fn lookup(args: &LookupArgs) -> Result<serde_json::Value> {
    let fixtures = FixtureFile::load(&args.fixtures)?;
    let table = fixtures
        .table(&args.table)
        .with_context(|| {
            format!(
                "no table named '{}' in {}",
                args.table,
                args.fixtures.display()
            )
        })?
        .to_lookup(&args.table);
    let accessor = table.get(&args.key)?;
    debug!(origin = accessor.origin(), "found record");
    let field = match &args.path {
        Some(path) => accessor.read(path)?,
        None => Field::Record(accessor.record().clone()),
    };
    Ok(field.to_json())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;
    use std::{fs, path::PathBuf};
    use tempfile::TempDir;

    struct FixtureDir {
        _dir: TempDir,
        path: PathBuf,
    }

    #[fixture]
    fn fixtures() -> FixtureDir {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("fixtures.yml");
        fs::write(
            &path,
            "variables:\n  name: World\ntables:\n  users:\n    field: email\n    records:\n      - { id: 1, email: a@example.com, roles: [admin] }\n",
        )
        .expect("write fixtures");
        FixtureDir { _dir: dir, path }
    }

    fn resolve_args(text: &str) -> ResolveArgs {
        ResolveArgs {
            fixtures: None,
            base_dir: None,
            lenient: false,
            vars: Vec::new(),
            now: None,
            text: text.to_owned(),
        }
    }

    fn run_to_string(command: Commands) -> Result<String> {
        let cli = Cli {
            verbose: false,
            command,
        };
        let mut out = Vec::new();
        run(&cli, &mut out)?;
        Ok(String::from_utf8(out).expect("utf-8 output"))
    }

    #[rstest]
    fn resolve_uses_fixtures_and_vars(fixtures: FixtureDir) {
        let mut args = resolve_args("Hello %name%, user %users.last.id% is %role%");
        args.fixtures = Some(fixtures.path.clone());
        args.vars.push(("role".to_owned(), json!("admin")));
        let output = run_to_string(Commands::Resolve(args)).expect("resolves");
        assert_eq!(output, "Hello World, user 1 is admin\n");
    }

    #[rstest]
    fn resolve_honours_lenient_policy() {
        let mut args = resolve_args("100% done");
        assert!(run_to_string(Commands::Resolve(args.clone())).is_err());
        args.lenient = true;
        let output = run_to_string(Commands::Resolve(args)).expect("lenient");
        assert_eq!(output, "100% done\n");
    }

    #[rstest]
    #[case(None, "{\n  \"id\": 1,\n  \"email\": \"a@example.com\",\n  \"roles\": [\n    \"admin\"\n  ]\n}\n")]
    #[case(Some("roles.0"), "\"admin\"\n")]
    fn lookup_prints_json(
        fixtures: FixtureDir,
        #[case] path: Option<&str>,
        #[case] expected: &str,
    ) {
        let args = LookupArgs {
            fixtures: fixtures.path.clone(),
            table: "users".to_owned(),
            key: "a@example.com".to_owned(),
            path: path.map(str::to_owned),
        };
        let output = run_to_string(Commands::Lookup(args)).expect("lookup");
        assert_eq!(output, expected);
    }

    #[rstest]
    fn lookup_reports_unknown_tables(fixtures: FixtureDir) {
        let args = LookupArgs {
            fixtures: fixtures.path.clone(),
            table: "posts".to_owned(),
            key: "last".to_owned(),
            path: None,
        };
        let err = run_to_string(Commands::Lookup(args)).expect_err("unknown table");
        assert!(err.to_string().starts_with("no table named 'posts'"), "{err}");
    }
}
