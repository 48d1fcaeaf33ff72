//! # jsref-schema: Draft-04 Schema Compiler and Validator
//!
//! Compiles JSON Schema (draft-04) documents, resolving `$ref` and
//! `$schema` references across documents, and validates JSON instances
//! against them with path-addressed error reports.
//!
//! ## Pipeline
//!
//! 1. **Locate**: a schema given by URI is looked up in the cache or fetched
//!    through a [`SchemaLoader`]; an inline schema is interned so repeated
//!    calls reuse its compilation state.
//! 2. **Compile** ([`compiler`]): references are merged with the enclosing
//!    `id` scope and resolved. Arrays of schemas compile as a batch that
//!    iterates until no further references can be satisfied.
//! 3. **Meta-validate** ([`meta`]): keyword values are checked for shape
//!    and a declared `$schema` parent is applied to the schema itself.
//! 4. **Validate** ([`engine`]): the instance is checked against every
//!    keyword, recursing into items and properties.
//!
//! [`SchemaValidator`] drives all four steps.
//!
//! ## Storage
//!
//! Schemas live in an append-only [`SchemaArena`]. Compilation state
//! (resolved targets, compiled and meta-validated flags, still-missing
//! references) is held in side tables keyed by [`NodeId`], never written
//! into the documents themselves.
//!
//! ## Crate Policy
//!
//! - Depends only on `jsref-core` internally.
//! - No network access: remote documents come from the cache or a loader.
//! - Recoverable problems are report entries; only reference-graph
//!   violations surface as [`SchemaError`].

#![recursion_limit = "256"]

pub mod arena;
pub mod cache;
pub mod compiler;
pub mod context;
pub mod draft04;
pub mod engine;
pub mod keyword;
pub mod loader;
pub mod meta;
pub mod validate;

pub use arena::{NodeId, SchemaArena, SchemaNode};
pub use cache::SchemaCache;
pub use context::{Annotations, RefKeyword, ReferenceEdge, SchemaContext};
pub use draft04::DRAFT04_URI;
pub use engine::InstanceValidator;
pub use keyword::Keyword;
pub use loader::{read_document, DirectoryLoader, LoadError, MapLoader, SchemaLoader};
pub use validate::{SchemaInput, SchemaValidator};

pub use jsref_core::{ErrorKind, ErrorPath, Options, PathSegment, Report, SchemaError, ValidationError};
