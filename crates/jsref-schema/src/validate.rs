//! # Validator Facade
//!
//! [`SchemaValidator`] is the public entry point. It owns a
//! [`SchemaContext`] with the draft-04 meta-schema pre-registered, runs the
//! compile / meta-validate / validate pipeline, and keeps the report of the
//! most recent run for inspection.
//!
//! A schema may be given as a URI (looked up in the cache or the loader),
//! as an inline JSON object, or as an array of schemas compiled as a batch.

use indexmap::IndexSet;
use serde_json::{json, Value};

use jsref_core::uri::remote_path;
use jsref_core::{ErrorKind, Options, Report, SchemaError, ValidationError};

use crate::arena::NodeId;
use crate::cache;
use crate::compiler;
use crate::context::SchemaContext;
use crate::draft04::{draft04_meta_schema, DRAFT04_URI};
use crate::engine::InstanceValidator;
use crate::loader::SchemaLoader;
use crate::meta;

/// How a caller names the schema to use.
#[derive(Debug, Clone, Copy)]
pub enum SchemaInput<'a> {
    /// A URI resolved through the cache and loader.
    Uri(&'a str),
    /// An inline schema, or an array of schemas.
    Value(&'a Value),
}

impl<'a> From<&'a str> for SchemaInput<'a> {
    fn from(uri: &'a str) -> Self {
        Self::Uri(uri)
    }
}

impl<'a> From<&'a String> for SchemaInput<'a> {
    fn from(uri: &'a String) -> Self {
        Self::Uri(uri)
    }
}

/// A JSON string is taken as a URI; anything else as an inline schema.
impl<'a> From<&'a Value> for SchemaInput<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::String(uri) => Self::Uri(uri),
            other => Self::Value(other),
        }
    }
}

/// Compiles schemas and validates instances against them.
///
/// # Example
///
/// ```
/// use jsref_schema::{Options, SchemaValidator};
/// use serde_json::json;
///
/// let mut validator = SchemaValidator::new(Options::default());
/// let schema = json!({"type": "object", "required": ["name"]});
/// assert!(!validator.validate(&json!({}), &schema).unwrap());
/// assert_eq!(validator.errors()[0].path.to_string(), "#/");
/// ```
#[derive(Debug)]
pub struct SchemaValidator {
    ctx: SchemaContext,
    last_report: Option<Report>,
}

impl SchemaValidator {
    pub fn new(options: Options) -> Self {
        Self::from_context(SchemaContext::new(options))
    }

    /// A validator that fetches uncached remote documents through `loader`.
    pub fn with_loader(options: Options, loader: impl SchemaLoader + 'static) -> Self {
        Self::from_context(SchemaContext::with_loader(options, Box::new(loader)))
    }

    fn from_context(mut ctx: SchemaContext) -> Self {
        ctx.register_document(DRAFT04_URI, &draft04_meta_schema());
        Self {
            ctx,
            last_report: None,
        }
    }

    pub fn options(&self) -> Options {
        self.ctx.options()
    }

    pub fn context(&self) -> &SchemaContext {
        &self.ctx
    }

    /// Register `schema` under `uri`, replacing any earlier document there.
    pub fn set_remote_reference(&mut self, uri: &str, schema: &Value) {
        self.ctx.register_document(uri, schema);
        tracing::debug!(uri = remote_path(uri), "registered remote schema");
    }

    /// Compile a schema and resolve its references.
    pub fn compile_schema<'s>(
        &mut self,
        schema: impl Into<SchemaInput<'s>>,
    ) -> Result<bool, SchemaError> {
        let schema = schema.into();
        self.run(|ctx, report| {
            let Some(node) = locate(ctx, report, schema)? else {
                return Ok(false);
            };
            compiler::compile(ctx, report, node)
        })
    }

    /// Compile a schema and check it against the meta-schema rules.
    pub fn validate_schema<'s>(
        &mut self,
        schema: impl Into<SchemaInput<'s>>,
    ) -> Result<bool, SchemaError> {
        let schema = schema.into();
        self.run(|ctx, report| {
            let Some(node) = locate(ctx, report, schema)? else {
                return Ok(false);
            };
            if !compiler::compile(ctx, report, node)? {
                return Ok(false);
            }
            meta::validate_schema(ctx, report, node)
        })
    }

    /// Validate `instance` against `schema`.
    ///
    /// The schema is compiled and meta-validated first; an instance is only
    /// checked against a schema that passed both.
    pub fn validate<'s>(
        &mut self,
        instance: &Value,
        schema: impl Into<SchemaInput<'s>>,
    ) -> Result<bool, SchemaError> {
        let schema = schema.into();
        self.run(|ctx, report| {
            let Some(node) = locate(ctx, report, schema)? else {
                return Ok(false);
            };
            if !compiler::compile(ctx, report, node)? {
                return Ok(false);
            }
            if !meta::validate_schema(ctx, report, node)? {
                return Ok(false);
            }
            InstanceValidator::new(ctx).validate(report, node, instance)?;
            Ok(report.is_valid())
        })
    }

    fn run(
        &mut self,
        f: impl FnOnce(&mut SchemaContext, &mut Report) -> Result<bool, SchemaError>,
    ) -> Result<bool, SchemaError> {
        self.last_report = None;
        let mut report = Report::new(self.ctx.options());
        let valid = f(&mut self.ctx, &mut report)?;
        tracing::debug!(valid, errors = report.error_count(), "run finished");
        self.last_report = Some(report);
        Ok(valid)
    }

    /// Errors of the most recent run. Empty before the first run and after
    /// a run that ended in a fatal error.
    pub fn errors(&self) -> &[ValidationError] {
        self.last_report
            .as_ref()
            .map(Report::errors)
            .unwrap_or_default()
    }

    /// References the most recent run could not resolve, including those
    /// reported inside nested errors.
    pub fn missing_references(&self) -> Vec<String> {
        let mut found = IndexSet::new();
        collect_missing(self.errors(), &mut found);
        found.into_iter().collect()
    }

    /// Canonical document URIs of [`Self::missing_references`], without
    /// duplicates or empty (document-local) entries.
    pub fn missing_remote_references(&self) -> Vec<String> {
        let remotes: IndexSet<String> = self
            .missing_references()
            .iter()
            .map(|uri| remote_path(uri))
            .filter(|uri| !uri.is_empty())
            .map(str::to_string)
            .collect();
        remotes.into_iter().collect()
    }
}

fn collect_missing(errors: &[ValidationError], found: &mut IndexSet<String>) {
    for error in errors {
        if matches!(
            error.kind,
            ErrorKind::UnresolvableReference | ErrorKind::RefUnresolved
        ) {
            if let Some(uri) = error.first_param_str() {
                found.insert(uri.to_string());
            }
        }
        collect_missing(&error.inner, found);
    }
}

fn locate(
    ctx: &mut SchemaContext,
    report: &mut Report,
    schema: SchemaInput<'_>,
) -> Result<Option<NodeId>, SchemaError> {
    match schema {
        SchemaInput::Value(value) => Ok(Some(cache::intern_value(ctx, value))),
        SchemaInput::Uri(uri) => {
            let before = report.error_count();
            let node = cache::resolve(ctx, report, uri, None)?;
            if node.is_none() && report.error_count() == before {
                report.add_error(ErrorKind::SchemaNotReachable, vec![json!(uri)]);
            }
            Ok(node)
        }
    }
}
