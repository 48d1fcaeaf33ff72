//! # Schema Cache
//!
//! Maps canonical document URIs (the part before `#`) to root nodes, and
//! resolves references against cached, root, or freshly loaded documents.
//!
//! Resolution of `uri` relative to a root document:
//!
//! 1. An empty remote path targets the root itself.
//! 2. Otherwise the cached document is used, or the loader is asked for one.
//! 3. A document other than the root that is not already being compiled is
//!    compiled and meta-validated in an isolated child report; failure is
//!    reported as `REMOTE_NOT_VALID` and resolution yields nothing.
//! 4. The fragment is applied: its first segment is an `id` lookup, the
//!    remaining segments are JSON Pointer steps.

use std::collections::HashMap;

use serde_json::{json, Value};

use jsref_core::uri::{decode_pointer_segment, query_path, remote_path};
use jsref_core::{ErrorKind, Report, SchemaError};

use crate::arena::{NodeId, SchemaArena, SchemaNode};
use crate::compiler;
use crate::context::SchemaContext;
use crate::meta;

/// URI-to-document table plus the intern table for inline schemas.
#[derive(Debug, Default)]
pub struct SchemaCache {
    documents: HashMap<String, NodeId>,
    interned: HashMap<String, NodeId>,
}

impl SchemaCache {
    /// Associate `node` with the canonical form of `uri`, replacing any
    /// previous association.
    pub fn cache(&mut self, uri: &str, node: NodeId) {
        self.documents.insert(remote_path(uri).to_string(), node);
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.documents.contains_key(remote_path(uri))
    }

    pub fn get(&self, uri: &str) -> Option<NodeId> {
        self.documents.get(remote_path(uri)).copied()
    }

    pub fn evict(&mut self, uri: &str) {
        if self.documents.remove(remote_path(uri)).is_some() {
            tracing::debug!(uri = remote_path(uri), "evicted schema from cache");
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Return the arena node for an inline schema value, importing it on first
/// sight. Equal values map to the same node, so compilation state carries
/// over between calls that pass the same schema.
///
/// Values are keyed by their JCS (RFC 8785) form, so member order does not
/// matter.
pub fn intern_value(ctx: &mut SchemaContext, value: &Value) -> NodeId {
    let key = serde_jcs::to_string(value).unwrap_or_else(|_| value.to_string());
    if let Some(&node) = ctx.cache.interned.get(&key) {
        return node;
    }
    let node = ctx.arena.import(value);
    ctx.cache.interned.insert(key, node);
    node
}

/// Resolve `uri` to a node. `root` is the document the reference occurs in.
pub fn resolve(
    ctx: &mut SchemaContext,
    report: &mut Report,
    uri: &str,
    root: Option<NodeId>,
) -> Result<Option<NodeId>, SchemaError> {
    let remote = remote_path(uri);

    let document = if remote.is_empty() {
        root
    } else {
        lookup_or_load(ctx, remote)
    };
    let Some(document) = document else {
        return Ok(None);
    };

    if !remote.is_empty() && Some(document) != root && !ctx.is_compiling(document) {
        let valid = report.with_segment(remote, |report| {
            let mut remote_report = report.child();
            if compiler::compile(ctx, &mut remote_report, document)? {
                meta::validate_schema(ctx, &mut remote_report, document)?;
            }
            let valid = remote_report.is_valid();
            if !valid {
                report.add_nested_error(
                    ErrorKind::RemoteNotValid,
                    vec![json!(uri)],
                    [remote_report],
                    None,
                );
            }
            Ok::<bool, SchemaError>(valid)
        })?;
        if !valid {
            return Ok(None);
        }
    }

    Ok(match query_path(uri) {
        Some(query) if !query.is_empty() => resolve_fragment(&ctx.arena, document, query),
        _ => Some(document),
    })
}

fn lookup_or_load(ctx: &mut SchemaContext, remote: &str) -> Option<NodeId> {
    if let Some(node) = ctx.cache.get(remote) {
        return Some(node);
    }
    let loaded = ctx.loader.as_ref()?.load(remote);
    match loaded {
        Ok(Some(document)) => {
            tracing::debug!(uri = remote, "loaded remote schema");
            Some(ctx.register_document(remote, &document))
        }
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(uri = remote, error = %e, "schema loader failed");
            None
        }
    }
}

/// Apply a fragment (`id` lookup, then pointer steps) inside `document`.
pub fn resolve_fragment(arena: &SchemaArena, document: NodeId, query: &str) -> Option<NodeId> {
    let mut segments = query.split('/');
    let first = decode_pointer_segment(segments.next().unwrap_or_default());
    let mut current = find_by_id(arena, document, &first)?;
    for segment in segments {
        let key = decode_pointer_segment(segment);
        current = step(arena, current, &key)?;
    }
    Some(current)
}

/// Depth-first search for the node whose `id` is `id` or `#id`.
/// An empty `id` names the starting node.
fn find_by_id(arena: &SchemaArena, node: NodeId, id: &str) -> Option<NodeId> {
    if id.is_empty() {
        return Some(node);
    }
    match arena.node(node) {
        SchemaNode::Object(map) => {
            if let Some(own) = arena.id_of(node) {
                if own == id || own.strip_prefix('#') == Some(id) {
                    return Some(node);
                }
            }
            map.values().find_map(|&child| find_by_id(arena, child, id))
        }
        SchemaNode::Array(items) => items.iter().find_map(|&child| find_by_id(arena, child, id)),
        _ => None,
    }
}

fn step(arena: &SchemaArena, node: NodeId, key: &str) -> Option<NodeId> {
    match arena.node(node) {
        SchemaNode::Object(map) => map.get(key).copied(),
        SchemaNode::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).copied()),
        _ => None,
    }
}
