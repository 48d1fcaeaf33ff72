//! # jsref-cli: Command-Line Interface for jsref
//!
//! Validates JSON and YAML documents against draft-04 JSON Schemas and
//! checks schema sets for malformed keywords and unresolved references.
//!
//! ## Subcommands
//!
//! - `jsref validate`: validate instance documents against a schema.
//! - `jsref check-schema`: compile and meta-validate schemas as one batch.
//!
//! ## Crate Policy
//!
//! - Library modules hold the argument structs and handlers; `main.rs`
//!   only parses and dispatches.
//! - Handlers return an exit code (`0` success, `1` failure) and use
//!   `anyhow` for I/O and setup errors.

pub mod check;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use jsref_core::Options;
use jsref_schema::{DirectoryLoader, SchemaValidator};

/// Read an options file. YAML files are parsed as YAML, anything else as
/// JSON. Missing fields keep their defaults.
pub fn load_options(path: Option<&Path>) -> Result<Options> {
    let Some(path) = path else {
        return Ok(Options::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read options file {}", path.display()))?;
    let options = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in options file {}", path.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in options file {}", path.display()))?,
    };
    tracing::debug!(?options, path = %path.display(), "loaded options file");
    Ok(options)
}

/// Build a validator, backed by a directory loader when `schema_dir` is set.
pub fn build_validator(options: Options, schema_dir: Option<&Path>) -> Result<SchemaValidator> {
    match schema_dir {
        Some(dir) => {
            let loader = DirectoryLoader::new(dir)
                .with_context(|| format!("failed to index schema directory {}", dir.display()))?;
            tracing::info!(
                dir = %loader.dir().display(),
                keys = loader.key_count(),
                "using schema directory"
            );
            Ok(SchemaValidator::with_loader(options, loader))
        }
        None => Ok(SchemaValidator::new(options)),
    }
}
