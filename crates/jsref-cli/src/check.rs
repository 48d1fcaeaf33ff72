//! # Check-Schema Subcommand
//!
//! Compiles and meta-validates a set of schema files as one batch, so
//! schemas may reference each other in any order. Error paths start with
//! the position of the offending file in the argument list.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;

use jsref_schema::read_document;

use crate::{build_validator, load_options};

/// Arguments for `jsref check-schema`.
#[derive(Args, Debug)]
pub struct CheckSchemaArgs {
    /// Directory of schema files used to load references outside the batch.
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// JSON or YAML options file (camelCase fields).
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Schema files to check.
    #[arg(value_name = "FILE", required = true)]
    pub schemas: Vec<PathBuf>,
}

/// Run `jsref check-schema`, printing to stdout.
pub fn run_check_schema(args: &CheckSchemaArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    check_schemas(args, &mut out)
}

/// Check the schemas in `args` as a batch, writing the result to `out`.
pub fn check_schemas(args: &CheckSchemaArgs, out: &mut impl Write) -> Result<u8> {
    let options = load_options(args.options.as_deref())?;
    let mut validator = build_validator(options, args.schema_dir.as_deref())?;

    let mut batch = Vec::with_capacity(args.schemas.len());
    for path in &args.schemas {
        let document = read_document(path)
            .with_context(|| format!("failed to read schema {}", path.display()))?;
        batch.push(document);
    }
    let batch = Value::Array(batch);

    let valid = validator
        .validate_schema(&batch)
        .context("schema check aborted")?;

    if valid {
        writeln!(out, "PASS  {} schema(s)", args.schemas.len())?;
        return Ok(0);
    }

    writeln!(out, "FAIL  {} schema(s)", args.schemas.len())?;
    for (index, path) in args.schemas.iter().enumerate() {
        writeln!(out, "  [{index}] {}", path.display())?;
    }
    for uri in validator.missing_remote_references() {
        writeln!(out, "  missing: {uri}")?;
    }
    let rendered = serde_json::to_string_pretty(validator.errors())
        .context("failed to serialize error report")?;
    writeln!(out, "{rendered}")?;

    tracing::info!(
        schemas = args.schemas.len(),
        errors = validator.errors().len(),
        "schema check failed"
    );
    Ok(1)
}
