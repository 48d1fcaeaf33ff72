//! # jsref CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use jsref_cli::check::{run_check_schema, CheckSchemaArgs};
use jsref_cli::validate::{run_validate, ValidateArgs};

/// Draft-04 JSON Schema validator with cross-document `$ref` resolution.
#[derive(Parser, Debug)]
#[command(name = "jsref", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate instance documents against a schema.
    Validate(ValidateArgs),

    /// Compile and meta-validate schema files as one batch.
    CheckSchema(CheckSchemaArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
        Commands::CheckSchema(args) => run_check_schema(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_validate_command() {
        let cli = Cli::try_parse_from([
            "jsref",
            "validate",
            "--schema",
            "schema.json",
            "--remote",
            "http://x.org/a.json=a.json",
            "--paths-as-array",
            "one.json",
            "two.yaml",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.schema, "schema.json");
        assert_eq!(args.remotes.len(), 1);
        assert!(args.paths_as_array);
        assert_eq!(args.instances.len(), 2);
    }

    #[test]
    fn test_parse_check_schema_requires_files() {
        assert!(Cli::try_parse_from(["jsref", "check-schema"]).is_err());
        assert!(Cli::try_parse_from(["jsref", "check-schema", "a.json"]).is_ok());
    }
}
