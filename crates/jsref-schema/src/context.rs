//! # Schema Context
//!
//! [`SchemaContext`] is the explicit context object threaded through every
//! compiler, cache, and validator call. It owns the arena, the schema cache,
//! the annotation side tables, the options, the optional document loader,
//! and the stack of documents currently being compiled.
//!
//! One context serves one compile/validate call at a time. Callers that
//! need concurrency use one context each.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use jsref_core::{Options, PathSegment};

use crate::arena::{NodeId, SchemaArena};
use crate::cache::SchemaCache;
use crate::loader::SchemaLoader;

/// Reference-bearing keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKeyword {
    Ref,
    Schema,
}

impl RefKeyword {
    pub const ALL: [RefKeyword; 2] = [RefKeyword::Ref, RefKeyword::Schema];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ref => "$ref",
            Self::Schema => "$schema",
        }
    }
}

/// A reference discovered during compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEdge {
    /// Node carrying the keyword.
    pub owner: NodeId,
    pub keyword: RefKeyword,
    /// Target URI after merging with the enclosing `id` scope.
    pub uri: String,
    /// Where the reference was found, relative to the compiled document.
    pub path: Vec<PathSegment>,
}

/// Compilation side tables, keyed by node identity.
#[derive(Debug, Default)]
pub struct Annotations {
    resolved: HashMap<(NodeId, RefKeyword), Option<NodeId>>,
    compiled: HashSet<NodeId>,
    missing: HashMap<NodeId, Vec<ReferenceEdge>>,
    meta_validated: HashSet<NodeId>,
}

impl Annotations {
    /// Record the resolution outcome of a reference, possibly "nothing".
    pub fn set_target(&mut self, owner: NodeId, keyword: RefKeyword, target: Option<NodeId>) {
        self.resolved.insert((owner, keyword), target);
    }

    /// The resolved target, if the compiler found one.
    pub fn target(&self, owner: NodeId, keyword: RefKeyword) -> Option<NodeId> {
        self.resolved.get(&(owner, keyword)).copied().flatten()
    }

    /// True once the reference has a resolved target. References annotated
    /// as unresolved are retried on the next compilation.
    pub fn is_resolved(&self, owner: NodeId, keyword: RefKeyword) -> bool {
        self.target(owner, keyword).is_some()
    }

    pub fn is_compiled(&self, node: NodeId) -> bool {
        self.compiled.contains(&node)
    }

    pub fn mark_compiled(&mut self, node: NodeId) {
        self.compiled.insert(node);
    }

    pub fn clear_compiled(&mut self, node: NodeId) {
        self.compiled.remove(&node);
    }

    pub fn missing(&self, node: NodeId) -> &[ReferenceEdge] {
        self.missing.get(&node).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn push_missing(&mut self, node: NodeId, edge: ReferenceEdge) {
        self.missing.entry(node).or_default().push(edge);
    }

    pub fn take_missing(&mut self, node: NodeId) -> Vec<ReferenceEdge> {
        self.missing.remove(&node).unwrap_or_default()
    }

    /// Replace the missing list; an empty list removes the entry.
    pub fn set_missing(&mut self, node: NodeId, edges: Vec<ReferenceEdge>) {
        if edges.is_empty() {
            self.missing.remove(&node);
        } else {
            self.missing.insert(node, edges);
        }
    }

    pub fn is_meta_validated(&self, node: NodeId) -> bool {
        self.meta_validated.contains(&node)
    }

    pub fn mark_meta_validated(&mut self, node: NodeId) {
        self.meta_validated.insert(node);
    }
}

/// Shared state for compilation and validation.
#[derive(Debug)]
pub struct SchemaContext {
    pub(crate) options: Options,
    pub(crate) arena: SchemaArena,
    pub(crate) cache: SchemaCache,
    pub(crate) annotations: Annotations,
    pub(crate) loader: Option<Box<dyn SchemaLoader>>,
    pub(crate) compile_stack: Vec<NodeId>,
}

impl SchemaContext {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            arena: SchemaArena::new(),
            cache: SchemaCache::default(),
            annotations: Annotations::default(),
            loader: None,
            compile_stack: Vec::new(),
        }
    }

    /// A context that fetches uncached documents through `loader`.
    pub fn with_loader(options: Options, loader: Box<dyn SchemaLoader>) -> Self {
        Self {
            loader: Some(loader),
            ..Self::new(options)
        }
    }

    pub fn options(&self) -> Options {
        self.options
    }

    pub fn arena(&self) -> &SchemaArena {
        &self.arena
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    /// Import `document` and associate it with `uri` in the cache.
    pub fn register_document(&mut self, uri: &str, document: &Value) -> NodeId {
        let node = self.arena.import(document);
        self.cache.cache(uri, node);
        node
    }

    /// True while `node` is being compiled further up the call stack.
    pub fn is_compiling(&self, node: NodeId) -> bool {
        self.compile_stack.contains(&node)
    }
}
