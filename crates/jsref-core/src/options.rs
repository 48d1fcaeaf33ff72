//! # Engine Options
//!
//! Options are carried by every [`Report`](crate::Report) so that child
//! reports inherit the configuration of the run they belong to. They can be
//! read from a JSON or YAML options file using the camelCase field names.

use serde::{Deserialize, Serialize};

/// Option set for one compile/validate run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Render error paths as a segment array instead of a `#/a/b` pointer.
    pub report_paths_as_array: bool,
    /// Tolerate absolute references to documents that were never supplied.
    pub ignore_unresolvable_references: bool,
}

impl Options {
    /// Returns a copy with `report_paths_as_array` set.
    pub fn with_paths_as_array(mut self, enabled: bool) -> Self {
        self.report_paths_as_array = enabled;
        self
    }

    /// Returns a copy with `ignore_unresolvable_references` set.
    pub fn with_ignore_unresolvable(mut self, enabled: bool) -> Self {
        self.ignore_unresolvable_references = enabled;
        self
    }
}
