//! # Validation Report
//!
//! Hierarchical, path-tracking error accumulator shared by the compiler,
//! the meta-schema validator, and the instance validator.
//!
//! A [`Report`] owns its own path-segment stack and its own error list.
//! Child reports are created for isolated sub-validation (composition
//! keywords, dependency checks, remote documents). A child captures its
//! parent's full path at creation, so errors recorded in the child carry
//! absolute paths; the parent stack cannot change while the child is in
//! use because the child only lives inside the recursion step that made it.
//!
//! A child's errors reach the parent only when the parent explicitly folds
//! them in, either as nested `inner` detail ([`Report::add_nested_error`])
//! or flat ([`Report::merge`]).

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::ErrorKind;
use crate::options::Options;
use crate::uri::{escape_pointer_segment, is_absolute_uri};

/// One step in an error path: an object property or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    /// Pointer form of this segment. Absolute URIs (cross-document jumps)
    /// are wrapped as `uri(...)`.
    fn to_pointer_segment(&self) -> String {
        match self {
            Self::Key(key) if is_absolute_uri(key) => format!("uri({key})"),
            Self::Key(key) => escape_pointer_segment(key),
            Self::Index(index) => index.to_string(),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A rendered error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorPath {
    /// `#/a/0/b~1c` form.
    Pointer(String),
    /// Structured form, used when `reportPathsAsArray` is set.
    Segments(Vec<PathSegment>),
}

impl ErrorPath {
    fn render(segments: Vec<PathSegment>, options: Options) -> Self {
        if options.report_paths_as_array {
            return Self::Segments(segments);
        }
        let joined: Vec<String> = segments.iter().map(PathSegment::to_pointer_segment).collect();
        Self::Pointer(format!("#/{}", joined.join("/")))
    }
}

impl fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer(pointer) => f.write_str(pointer),
            Self::Segments(segments) => {
                let parts: Vec<String> = segments.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// A single recorded error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Error kind; serialized as its code.
    #[serde(rename = "code")]
    pub kind: ErrorKind,
    /// Positional message parameters.
    pub params: Vec<Value>,
    /// Formatted human-readable message.
    pub message: String,
    /// Where the error occurred.
    pub path: ErrorPath,
    /// The offending schema's `description`, or failing that its `id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Errors of the sub-reports this error summarizes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inner: Vec<ValidationError>,
}

impl ValidationError {
    /// The first parameter as a string, when it is one.
    pub fn first_param_str(&self) -> Option<&str> {
        self.params.first().and_then(Value::as_str)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.path, self.kind, self.message)
    }
}

/// Error accumulator with a path stack.
#[derive(Debug, Clone)]
pub struct Report {
    options: Options,
    prefix: Vec<PathSegment>,
    path: Vec<PathSegment>,
    errors: Vec<ValidationError>,
}

impl Report {
    /// A standalone report for a fresh top-level run.
    pub fn new(options: Options) -> Self {
        Self {
            options,
            prefix: Vec::new(),
            path: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A child report inheriting options and the current path lineage.
    pub fn child(&self) -> Self {
        Self {
            options: self.options,
            prefix: self.current_segments(),
            path: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn path_push(&mut self, segment: impl Into<PathSegment>) {
        self.path.push(segment.into());
    }

    pub fn path_push_all(&mut self, segments: &[PathSegment]) {
        self.path.extend_from_slice(segments);
    }

    /// Pop `count` segments. Popping more than were pushed is a bug in the
    /// caller; the stack is simply emptied.
    pub fn path_pop(&mut self, count: usize) {
        let keep = self.path.len().saturating_sub(count);
        self.path.truncate(keep);
    }

    /// Run `f` with `segment` pushed, popping it afterwards whatever `f` returns.
    pub fn with_segment<T>(
        &mut self,
        segment: impl Into<PathSegment>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.path_push(segment);
        let out = f(self);
        self.path_pop(1);
        out
    }

    /// Run `f` with every segment of `segments` pushed.
    pub fn with_segments<T>(
        &mut self,
        segments: &[PathSegment],
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.path_push_all(segments);
        let out = f(self);
        self.path_pop(segments.len());
        out
    }

    /// Ancestor segments followed by this report's own stack.
    pub fn current_segments(&self) -> Vec<PathSegment> {
        let mut segments = Vec::with_capacity(self.prefix.len() + self.path.len());
        segments.extend_from_slice(&self.prefix);
        segments.extend_from_slice(&self.path);
        segments
    }

    /// Depth of this report's own stack (excluding ancestors).
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn current_path(&self) -> ErrorPath {
        ErrorPath::render(self.current_segments(), self.options)
    }

    /// Record an error at the current path.
    pub fn add_error(&mut self, kind: ErrorKind, params: Vec<Value>) {
        self.push_error(kind, params, Vec::new(), None);
    }

    /// Record an error annotated with the offending schema's description.
    pub fn add_error_described(
        &mut self,
        kind: ErrorKind,
        params: Vec<Value>,
        description: Option<String>,
    ) {
        self.push_error(kind, params, Vec::new(), description);
    }

    /// Record an error that embeds the errors of `sub_reports` as `inner`
    /// detail. An empty nested list is omitted.
    pub fn add_nested_error(
        &mut self,
        kind: ErrorKind,
        params: Vec<Value>,
        sub_reports: impl IntoIterator<Item = Report>,
        description: Option<String>,
    ) {
        let inner = sub_reports
            .into_iter()
            .flat_map(|report| report.errors)
            .collect();
        self.push_error(kind, params, inner, description);
    }

    fn push_error(
        &mut self,
        kind: ErrorKind,
        params: Vec<Value>,
        inner: Vec<ValidationError>,
        description: Option<String>,
    ) {
        let message = kind.format(&params);
        let path = self.current_path();
        self.errors.push(ValidationError {
            kind,
            params,
            message,
            path,
            description,
            inner,
        });
    }

    /// Fold a child's errors into this report without nesting.
    pub fn merge(&mut self, child: Report) {
        self.errors.extend(child.errors);
    }

    /// Drop every error recorded after the first `len`.
    pub fn truncate_errors(&mut self, len: usize) {
        self.errors.truncate(len);
    }

    /// True iff this report (not its ancestors or children) holds no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = PathSegment> {
        prop_oneof![
            "[a-z/~]{1,6}".prop_map(PathSegment::Key),
            (0usize..50).prop_map(PathSegment::Index),
        ]
    }

    fn descend(report: &mut Report, segments: &[PathSegment], fail_at: usize) -> Result<(), ()> {
        let Some((first, rest)) = segments.split_first() else {
            report.add_error(ErrorKind::NotPassed, vec![]);
            return Ok(());
        };
        report.with_segment(first.clone(), |r| {
            if fail_at == 0 {
                return Err(());
            }
            descend(r, rest, fail_at - 1)
        })
    }

    proptest! {
        /// Pushes and pops stay balanced even when a step bails out early.
        #[test]
        fn path_stack_balanced(
            segments in prop::collection::vec(segment(), 0..12),
            fail_at in 0usize..16,
        ) {
            let mut report = Report::new(Options::default().with_paths_as_array(true));
            let _ = descend(&mut report, &segments, fail_at);
            prop_assert_eq!(report.depth(), 0);
            if let Some(error) = report.errors().first() {
                prop_assert_eq!(&error.path, &ErrorPath::Segments(segments.clone()));
            }
        }
    }
}
