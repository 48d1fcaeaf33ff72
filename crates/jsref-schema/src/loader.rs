//! # Schema Loaders
//!
//! When a reference names a document that is not cached, the cache asks a
//! [`SchemaLoader`] for it. The engine performs no network access of its
//! own; loaders decide where documents come from.
//!
//! - [`MapLoader`] serves documents from an in-memory table.
//! - [`DirectoryLoader`] indexes a directory of `.json` / `.yaml` files by
//!   filename and by declared `id`, so `http://host/path/name.json` finds
//!   `<dir>/name.json` without a network round trip.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use jsref_core::uri::remote_path;

/// Failure to read or parse a schema document.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("io error reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{path}': {reason}")]
    InvalidJson { path: String, reason: String },

    #[error("invalid YAML in '{path}': {reason}")]
    InvalidYaml { path: String, reason: String },
}

/// Source of remote schema documents.
///
/// `Ok(None)` means "not available here", which the caller reports as an
/// unresolvable reference. `Err` is logged and treated the same way.
pub trait SchemaLoader: fmt::Debug {
    fn load(&self, uri: &str) -> Result<Option<Value>, LoadError>;
}

/// In-memory loader keyed by canonical document URI.
#[derive(Debug, Default, Clone)]
pub struct MapLoader {
    documents: HashMap<String, Value>,
}

impl MapLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: &str, document: Value) {
        self.documents.insert(remote_path(uri).to_string(), document);
    }

    pub fn with(mut self, uri: &str, document: Value) -> Self {
        self.insert(uri, document);
        self
    }
}

impl SchemaLoader for MapLoader {
    fn load(&self, uri: &str) -> Result<Option<Value>, LoadError> {
        Ok(self.documents.get(remote_path(uri)).cloned())
    }
}

/// Loader backed by a directory of schema files.
#[derive(Debug)]
pub struct DirectoryLoader {
    dir: PathBuf,
    /// Documents keyed by file name and by declared `id`.
    by_key: HashMap<String, Value>,
}

impl DirectoryLoader {
    /// Read and index every `.json`, `.yaml` and `.yml` file in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let dir = dir.into();
        let entries = std::fs::read_dir(&dir).map_err(|source| LoadError::Io {
            path: dir.display().to_string(),
            source,
        })?;

        let mut by_key = HashMap::new();
        for entry in entries {
            let path = entry
                .map_err(|source| LoadError::Io {
                    path: dir.display().to_string(),
                    source,
                })?
                .path();
            if !is_schema_file(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let document = read_document(&path)?;
            if let Some(id) = document.get("id").and_then(Value::as_str) {
                let id = remote_path(id);
                if !id.is_empty() {
                    by_key.insert(id.to_string(), document.clone());
                }
            }
            by_key.insert(name.to_string(), document);
        }

        tracing::debug!(dir = %dir.display(), documents = by_key.len(), "indexed schema directory");
        Ok(Self { dir, by_key })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of lookup keys (file names plus declared ids).
    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }
}

impl SchemaLoader for DirectoryLoader {
    fn load(&self, uri: &str) -> Result<Option<Value>, LoadError> {
        let uri = remote_path(uri);
        if let Some(document) = self.by_key.get(uri) {
            return Ok(Some(document.clone()));
        }
        let filename = uri.rsplit('/').next().unwrap_or(uri);
        Ok(self.by_key.get(filename).cloned())
    }
}

fn is_schema_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("json" | "yaml" | "yml")
    )
}

/// Read a JSON or YAML document, chosen by file extension.
pub fn read_document(path: &Path) -> Result<Value, LoadError> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: display.clone(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(&content).map_err(|e| LoadError::InvalidYaml {
                    path: display.clone(),
                    reason: e.to_string(),
                })?;
            yaml_to_json_value(&yaml).map_err(|reason| LoadError::InvalidYaml {
                path: display,
                reason,
            })
        }
        _ => serde_json::from_str(&content).map_err(|e| LoadError::InvalidJson {
            path: display,
            reason: e.to_string(),
        }),
    }
}

/// Convert a YAML value to JSON. Tags are dropped; non-string keys are
/// stringified.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(u.into()))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => seq
            .iter()
            .map(yaml_to_json_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        serde_yaml::Value::Mapping(map) => {
            let mut object = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key: {other:?}")),
                };
                object.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(object))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
