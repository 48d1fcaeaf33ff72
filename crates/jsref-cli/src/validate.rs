//! # Validate Subcommand
//!
//! Validates instance documents against one schema. The schema is either a
//! file (JSON or YAML) or an absolute URI reachable through `--remote`
//! registrations or the `--schema-dir` loader.
//!
//! One `PASS`/`FAIL` line is printed per instance; failures are followed by
//! the JSON error report.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

use jsref_core::uri::is_absolute_uri;
use jsref_core::ValidationError;
use jsref_schema::{read_document, SchemaValidator};

use crate::{build_validator, load_options};

/// Arguments for `jsref validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema file, or the absolute URI of a registered or loadable schema.
    #[arg(long, value_name = "FILE|URI")]
    pub schema: String,

    /// Register a remote schema document as `URI=FILE`. Repeatable.
    #[arg(long = "remote", value_name = "URI=FILE", value_parser = parse_remote)]
    pub remotes: Vec<(String, PathBuf)>,

    /// Directory of schema files used to load uncached references.
    #[arg(long, value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// JSON or YAML options file (camelCase fields).
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Report error paths as segment arrays.
    #[arg(long)]
    pub paths_as_array: bool,

    /// Tolerate absolute references to documents that cannot be obtained.
    #[arg(long)]
    pub ignore_unresolvable: bool,

    /// Instance documents to validate.
    #[arg(value_name = "INSTANCE", required = true)]
    pub instances: Vec<PathBuf>,
}

/// JSON report printed after a `FAIL` line.
#[derive(Debug, Serialize)]
struct FailureReport<'a> {
    instance: String,
    errors: &'a [ValidationError],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_references: Vec<String>,
}

/// Parse a `URI=FILE` pair.
pub fn parse_remote(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((uri, file)) if !uri.is_empty() && !file.is_empty() => {
            Ok((uri.to_string(), PathBuf::from(file)))
        }
        _ => Err(format!("expected URI=FILE, got '{raw}'")),
    }
}

/// Run `jsref validate`, printing to stdout.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    validate_instances(args, &mut out)
}

/// Validate every instance in `args`, writing the results to `out`.
///
/// Returns `0` when all instances pass, `1` otherwise.
pub fn validate_instances(args: &ValidateArgs, out: &mut impl Write) -> Result<u8> {
    let options = load_options(args.options.as_deref())?;
    let options = options
        .with_paths_as_array(options.report_paths_as_array || args.paths_as_array)
        .with_ignore_unresolvable(
            options.ignore_unresolvable_references || args.ignore_unresolvable,
        );

    let mut validator = build_validator(options, args.schema_dir.as_deref())?;
    for (uri, file) in &args.remotes {
        let document = read_document(file)
            .with_context(|| format!("failed to read remote schema for {uri}"))?;
        validator.set_remote_reference(uri, &document);
    }

    let schema = if is_absolute_uri(&args.schema) {
        Value::String(args.schema.clone())
    } else {
        read_document(Path::new(&args.schema))
            .with_context(|| format!("failed to read schema {}", args.schema))?
    };

    let mut failures = 0usize;
    for path in &args.instances {
        let instance = read_document(path)
            .with_context(|| format!("failed to read instance {}", path.display()))?;
        let valid = validator
            .validate(&instance, &schema)
            .with_context(|| format!("validation of {} aborted", path.display()))?;

        if valid {
            writeln!(out, "PASS  {}", path.display())?;
        } else {
            failures += 1;
            writeln!(out, "FAIL  {}", path.display())?;
            write_failure(out, path, &validator)?;
        }
    }

    tracing::info!(
        instances = args.instances.len(),
        failures,
        "validation finished"
    );
    Ok(if failures == 0 { 0 } else { 1 })
}

fn write_failure(out: &mut impl Write, path: &Path, validator: &SchemaValidator) -> Result<()> {
    let report = FailureReport {
        instance: path.display().to_string(),
        errors: validator.errors(),
        missing_references: validator.missing_references(),
    };
    let rendered =
        serde_json::to_string_pretty(&report).context("failed to serialize error report")?;
    writeln!(out, "{rendered}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn workspace(name: &str, files: &[(&str, Value)]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("jsref-cli-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        for (file, document) in files {
            std::fs::write(dir.join(file), serde_json::to_string(document).unwrap()).unwrap();
        }
        dir
    }

    fn args(schema: String, instances: Vec<PathBuf>) -> ValidateArgs {
        ValidateArgs {
            schema,
            remotes: Vec::new(),
            schema_dir: None,
            options: None,
            paths_as_array: false,
            ignore_unresolvable: false,
            instances,
        }
    }

    #[test]
    fn test_parse_remote() {
        let (uri, file) = parse_remote("http://x.org/a.json=schemas/a.json").unwrap();
        assert_eq!(uri, "http://x.org/a.json");
        assert_eq!(file, PathBuf::from("schemas/a.json"));
        assert!(parse_remote("no-separator").is_err());
        assert!(parse_remote("=file.json").is_err());
    }

    #[test]
    fn test_pass_and_fail_lines() {
        let dir = workspace(
            "passfail",
            &[
                ("schema.json", json!({"type": "object", "required": ["name"]})),
                ("good.json", json!({"name": "Ada"})),
                ("bad.json", json!({})),
            ],
        );
        let args = args(
            dir.join("schema.json").display().to_string(),
            vec![dir.join("good.json"), dir.join("bad.json")],
        );
        let mut out = Vec::new();
        let code = validate_instances(&args, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(code, 1);
        assert!(text.starts_with("PASS  "));
        assert!(text.contains("FAIL  "));
        assert!(text.contains("OBJECT_MISSING_REQUIRED_PROPERTY"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_remote_registration_and_uri_schema() {
        let dir = workspace(
            "remote",
            &[
                ("name.json", json!({"type": "string", "minLength": 1})),
                ("one.json", json!("Ada")),
            ],
        );
        let mut args = args("http://x.org/name.json".to_string(), vec![dir.join("one.json")]);
        args.remotes
            .push(("http://x.org/name.json".to_string(), dir.join("name.json")));
        let mut out = Vec::new();
        assert_eq!(validate_instances(&args, &mut out).unwrap(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_ignore_unresolvable_flag() {
        let dir = workspace(
            "ignore",
            &[
                (
                    "schema.json",
                    json!({"properties": {"a": {"$ref": "http://x.org/absent.json"}}}),
                ),
                ("instance.json", json!({"b": 1})),
            ],
        );
        let mut args = args(
            dir.join("schema.json").display().to_string(),
            vec![dir.join("instance.json")],
        );

        let mut out = Vec::new();
        assert_eq!(validate_instances(&args, &mut out).unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("http://x.org/absent.json"));

        args.ignore_unresolvable = true;
        let mut out = Vec::new();
        assert_eq!(validate_instances(&args, &mut out).unwrap(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_instance_file_is_an_error() {
        let dir = workspace("missing", &[("schema.json", json!({}))]);
        let args = args(
            dir.join("schema.json").display().to_string(),
            vec![dir.join("absent.json")],
        );
        let mut out = Vec::new();
        assert!(validate_instances(&args, &mut out).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
