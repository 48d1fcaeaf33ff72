//! # jsref-core: Foundational Types for jsref
//!
//! Leaf crate of the jsref workspace. It holds everything the compiler and
//! the validators share but that does not depend on how schemas are stored:
//!
//! - [`Report`]: the hierarchical, path-tracking error accumulator.
//! - [`ErrorKind`] and [`ValidationError`]: the closed error catalog and the
//!   recorded error entries.
//! - [`SchemaError`]: fatal conditions that abort a run.
//! - [`Options`]: the per-run option set.
//! - [`uri`]: reference splitting, scope merging, and JSON Pointer escapes.
//! - [`instance`]: semantic typing and strict equality of instance values.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jsref-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod instance;
pub mod options;
pub mod report;
pub mod uri;

pub use error::{ErrorKind, SchemaError, MAX_REFERENCE_HOPS};
pub use instance::{InstanceType, PRIMITIVE_TYPES};
pub use options::Options;
pub use report::{ErrorPath, PathSegment, Report, ValidationError};
