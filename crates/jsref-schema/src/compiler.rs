//! # Schema Compiler
//!
//! Compilation walks a document, merges every `$ref` / `$schema` with the
//! `id` scope around it, resolves the result through the cache, and records
//! the outcome in the annotation side tables. A compiled document is marked
//! so repeat compilation is a no-op.
//!
//! An array of documents is compiled as a batch: members are compiled in
//! repeated passes, and references that failed only because their target is
//! another batch member are patched up between passes. The loop stops once
//! every member compiles or a pass makes no progress.
//!
//! Documents currently being compiled sit on the context's compile stack.
//! Resolution never recompiles a document on the stack, which is what keeps
//! mutually-referencing remotes (A refers to B refers to A) finite.

use serde_json::json;

use jsref_core::uri::{is_absolute_uri, merge_reference, query_path, remote_path};
use jsref_core::{ErrorKind, PathSegment, Report, SchemaError, MAX_REFERENCE_HOPS};

use crate::arena::{NodeId, SchemaArena, SchemaNode};
use crate::cache;
use crate::context::{Annotations, RefKeyword, ReferenceEdge, SchemaContext};

/// Compile `node`, or every member when `node` is an array.
///
/// Returns `Ok(true)` when the report is error-free afterwards.
pub fn compile(
    ctx: &mut SchemaContext,
    report: &mut Report,
    node: NodeId,
) -> Result<bool, SchemaError> {
    if let Some(members) = ctx.arena.items(node) {
        let members = members.to_vec();
        return compile_batch(ctx, report, &members);
    }

    if ctx.compile_stack.len() >= MAX_REFERENCE_HOPS {
        let uri = ctx.arena.id_of(node).unwrap_or("<anonymous>").to_string();
        tracing::warn!(%uri, depth = ctx.compile_stack.len(), "remote schema nesting too deep");
        return Err(SchemaError::CompileDepthExceeded {
            uri,
            limit: MAX_REFERENCE_HOPS,
        });
    }

    ctx.compile_stack.push(node);
    let result = compile_document(ctx, report, node);
    ctx.compile_stack.pop();
    result
}

fn compile_document(
    ctx: &mut SchemaContext,
    report: &mut Report,
    node: NodeId,
) -> Result<bool, SchemaError> {
    let id = ctx.arena.id_of(node).map(str::to_string);

    if ctx.annotations.is_compiled(node) {
        // An evicted or replaced cache entry invalidates the compiled flag.
        let still_cached = id
            .as_deref()
            .map_or(true, |id| ctx.cache.get(id) == Some(node));
        if still_cached {
            return Ok(true);
        }
        ctx.annotations.clear_compiled(node);
    }

    if let Some(id) = &id {
        ctx.cache.cache(id, node);
    }

    let valid_except_references = report.is_valid();
    ctx.annotations.set_missing(node, Vec::new());

    let collected = collect_references(&ctx.arena, &ctx.annotations, node);
    for (embedded_id, embedded) in collected.embedded {
        if !ctx.cache.contains(&embedded_id) {
            ctx.cache.cache(&embedded_id, embedded);
        }
    }

    for edge in collected.edges {
        let target = cache::resolve(ctx, report, &edge.uri, Some(node))?;
        if target.is_none() {
            // Absolute references into a loaded document, or to one that is
            // tolerated as absent, are left for validation to report.
            let loaded = ctx.cache.contains(&edge.uri);
            if !is_absolute_uri(&edge.uri)
                || (!loaded && !ctx.options.ignore_unresolvable_references)
            {
                report.with_segments(&edge.path, |report| {
                    report.add_error(ErrorKind::UnresolvableReference, vec![json!(edge.uri)]);
                });
                if valid_except_references {
                    ctx.annotations.push_missing(node, edge.clone());
                }
            }
        }
        ctx.annotations.set_target(edge.owner, edge.keyword, target);
    }

    let valid = report.is_valid();
    if valid {
        ctx.annotations.mark_compiled(node);
        tracing::debug!(id = id.as_deref().unwrap_or("<anonymous>"), "compiled schema");
    } else if let Some(id) = &id {
        ctx.cache.evict(id);
    }
    Ok(valid)
}

fn compile_batch(
    ctx: &mut SchemaContext,
    report: &mut Report,
    members: &[NodeId],
) -> Result<bool, SchemaError> {
    let baseline = report.error_count();
    let mut last_compiled: Option<usize> = None;
    let mut pass = 0usize;

    loop {
        // Errors of the previous pass are either regenerated or resolved.
        report.truncate_errors(baseline);

        let mut compiled = 0;
        for (index, &member) in members.iter().enumerate() {
            let mut member_report = report.child();
            let ok = member_report.with_segment(index, |r| compile(ctx, r, member))?;
            if ok {
                compiled += 1;
            }
            report.merge(member_report);
        }

        patch_batch_references(ctx, members);

        pass += 1;
        tracing::debug!(pass, compiled, total = members.len(), "batch compile pass");

        if compiled == members.len() || last_compiled == Some(compiled) {
            break;
        }
        last_compiled = Some(compiled);
    }

    Ok(report.is_valid())
}

/// Point still-missing references at batch members whose `id` names the
/// same document.
fn patch_batch_references(ctx: &mut SchemaContext, members: &[NodeId]) {
    for &member in members {
        let missing = ctx.annotations.take_missing(member);
        if missing.is_empty() {
            continue;
        }
        let mut unresolved = Vec::new();
        for edge in missing {
            match find_in_batch(&ctx.arena, members, &edge.uri) {
                Some(target) => {
                    tracing::trace!(uri = %edge.uri, "reference satisfied by batch member");
                    ctx.annotations.set_target(edge.owner, edge.keyword, Some(target));
                }
                None => unresolved.push(edge),
            }
        }
        ctx.annotations.set_missing(member, unresolved);
    }
}

fn find_in_batch(arena: &SchemaArena, members: &[NodeId], uri: &str) -> Option<NodeId> {
    let remote = remote_path(uri);
    let document = members.iter().copied().find(|&member| {
        arena
            .id_of(member)
            .is_some_and(|id| id == uri || (!remote.is_empty() && remote_path(id) == remote))
    })?;
    match query_path(uri) {
        Some(query) if !query.is_empty() => cache::resolve_fragment(arena, document, query),
        _ => Some(document),
    }
}

#[derive(Debug, Default)]
struct Collected {
    edges: Vec<ReferenceEdge>,
    /// Sub-schemas declaring an absolute document `id`.
    embedded: Vec<(String, NodeId)>,
}

fn collect_references(arena: &SchemaArena, annotations: &Annotations, root: NodeId) -> Collected {
    let mut collected = Collected::default();
    let mut scope = Vec::new();
    let mut path = Vec::new();
    walk(arena, annotations, root, root, &mut scope, &mut path, &mut collected);
    collected
}

fn walk(
    arena: &SchemaArena,
    annotations: &Annotations,
    root: NodeId,
    node: NodeId,
    scope: &mut Vec<String>,
    path: &mut Vec<PathSegment>,
    collected: &mut Collected,
) {
    match arena.node(node) {
        SchemaNode::Object(map) => {
            let id = arena.id_of(node);
            if let Some(id) = id {
                scope.push(id.to_string());
                let whole_document = query_path(id).map_or(true, str::is_empty);
                if node != root && is_absolute_uri(id) && whole_document {
                    collected.embedded.push((id.to_string(), node));
                }
            }

            for keyword in RefKeyword::ALL {
                let Some(reference) = arena.get_str(node, keyword.as_str()) else {
                    continue;
                };
                if annotations.is_resolved(node, keyword) {
                    continue;
                }
                collected.edges.push(ReferenceEdge {
                    owner: node,
                    keyword,
                    uri: merge_reference(scope, reference),
                    path: path.clone(),
                });
            }

            for (key, &child) in map {
                path.push(PathSegment::Key(key.clone()));
                walk(arena, annotations, root, child, scope, path, collected);
                path.pop();
            }

            if id.is_some() {
                scope.pop();
            }
        }
        SchemaNode::Array(items) => {
            for (index, &child) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk(arena, annotations, root, child, scope, path, collected);
                path.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MapLoader;
    use jsref_core::Options;
    use serde_json::Value;

    fn ctx() -> SchemaContext {
        SchemaContext::new(Options::default())
    }

    fn import(ctx: &mut SchemaContext, value: Value) -> NodeId {
        ctx.arena.import(&value)
    }

    #[test]
    fn test_local_reference_resolves() {
        let mut ctx = ctx();
        let root = import(
            &mut ctx,
            json!({"definitions": {"a": {"type": "integer"}}, "properties": {"x": {"$ref": "#/definitions/a"}}}),
        );
        let mut report = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut report, root).unwrap());

        let x = ctx.arena.get(ctx.arena.get(root, "properties").unwrap(), "x").unwrap();
        let target = ctx.annotations.target(x, RefKeyword::Ref).unwrap();
        assert_eq!(ctx.arena.to_value(target), json!({"type": "integer"}));
        assert!(ctx.annotations.is_compiled(root));
    }

    #[test]
    fn test_unresolvable_local_reference_reported_at_path() {
        let mut ctx = ctx();
        let root = import(&mut ctx, json!({"properties": {"a": {"$ref": "#/definitions/nope"}}}));
        let mut report = Report::new(Options::default());
        assert!(!compile(&mut ctx, &mut report, root).unwrap());
        let error = &report.errors()[0];
        assert_eq!(error.kind, ErrorKind::UnresolvableReference);
        assert_eq!(error.path.to_string(), "#/properties/a");
        assert_eq!(error.first_param_str(), Some("#/definitions/nope"));
        assert!(!ctx.annotations.is_compiled(root));
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut ctx = ctx();
        let root = import(&mut ctx, json!({"id": "http://x.org/a", "items": {"$ref": "#"}}));
        let mut first = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut first, root).unwrap());
        let arena_size = ctx.arena.len();
        let mut second = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut second, root).unwrap());
        assert!(second.is_valid());
        assert_eq!(ctx.arena.len(), arena_size);
    }

    #[test]
    fn test_eviction_invalidates_compiled_flag() {
        let mut ctx = ctx();
        let root = import(&mut ctx, json!({"id": "http://x.org/a", "type": "string"}));
        let mut report = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut report, root).unwrap());
        ctx.cache.evict("http://x.org/a");
        let mut again = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut again, root).unwrap());
        assert_eq!(ctx.cache.get("http://x.org/a"), Some(root));
    }

    #[test]
    fn test_failed_compile_evicts_id() {
        let mut ctx = ctx();
        let root = import(&mut ctx, json!({"id": "http://x.org/a", "not": {"$ref": "#/missing"}}));
        let mut report = Report::new(Options::default());
        assert!(!compile(&mut ctx, &mut report, root).unwrap());
        assert!(!ctx.cache.contains("http://x.org/a"));
    }

    #[test]
    fn test_ignore_unresolvable_absolute_reference() {
        let options = Options::default().with_ignore_unresolvable(true);
        let mut ctx = SchemaContext::new(options);
        let root = import(&mut ctx, json!({"$ref": "http://x.org/missing.json"}));
        let mut report = Report::new(options);
        assert!(compile(&mut ctx, &mut report, root).unwrap());
        assert_eq!(ctx.annotations.target(root, RefKeyword::Ref), None);
    }

    #[test]
    fn test_missing_fragment_in_loaded_document_is_left_unresolved() {
        let mut ctx = ctx();
        ctx.register_document(
            "http://x.org/defs.json",
            &json!({"definitions": {"a": {"type": "string"}}}),
        );
        let root = import(
            &mut ctx,
            json!({"properties": {"p": {"$ref": "http://x.org/defs.json#/definitions/nope"}}}),
        );
        let mut report = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut report, root).unwrap(), "{:?}", report.errors());
        let p = ctx.arena.get(ctx.arena.get(root, "properties").unwrap(), "p").unwrap();
        assert_eq!(ctx.annotations.target(p, RefKeyword::Ref), None);
        assert!(ctx.annotations.missing(root).is_empty());
    }

    #[test]
    fn test_ignore_does_not_cover_local_references() {
        let options = Options::default().with_ignore_unresolvable(true);
        let mut ctx = SchemaContext::new(options);
        let root = import(&mut ctx, json!({"$ref": "#/missing"}));
        let mut report = Report::new(options);
        assert!(!compile(&mut ctx, &mut report, root).unwrap());
    }

    #[test]
    fn test_scope_merging_uses_enclosing_id() {
        let loader = MapLoader::new().with(
            "http://x.org/dir/b.json",
            json!({"definitions": {"s": {"type": "string"}}}),
        );
        let mut ctx = SchemaContext::with_loader(Options::default(), Box::new(loader));
        let root = import(
            &mut ctx,
            json!({"id": "http://x.org/dir/a.json", "properties": {"p": {"$ref": "b.json#/definitions/s"}}}),
        );
        let mut report = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut report, root).unwrap());
        assert!(ctx.cache.contains("http://x.org/dir/b.json"));
    }

    #[test]
    fn test_embedded_absolute_id_is_cached() {
        let mut ctx = ctx();
        let root = import(
            &mut ctx,
            json!({
                "definitions": {"inner": {"id": "http://x.org/inner.json", "type": "string"}},
                "properties": {"p": {"$ref": "http://x.org/inner.json"}}
            }),
        );
        let mut report = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut report, root).unwrap());
        let p = ctx.arena.get(ctx.arena.get(root, "properties").unwrap(), "p").unwrap();
        let target = ctx.annotations.target(p, RefKeyword::Ref).unwrap();
        assert_eq!(ctx.arena.id_of(target), Some("http://x.org/inner.json"));
    }

    #[test]
    fn test_mutually_referencing_remotes_terminate() {
        let loader = MapLoader::new()
            .with(
                "http://x.org/a.json",
                json!({"id": "http://x.org/a.json", "items": {"$ref": "http://x.org/b.json"}}),
            )
            .with(
                "http://x.org/b.json",
                json!({"id": "http://x.org/b.json", "items": {"$ref": "http://x.org/a.json"}}),
            );
        let mut ctx = SchemaContext::with_loader(Options::default(), Box::new(loader));
        let root = import(&mut ctx, json!({"$ref": "http://x.org/a.json"}));
        let mut report = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut report, root).unwrap());
        assert!(ctx.cache.contains("http://x.org/a.json"));
        assert!(ctx.cache.contains("http://x.org/b.json"));
    }

    #[test]
    fn test_batch_resolves_forward_references() {
        let mut ctx = ctx();
        let batch = import(
            &mut ctx,
            json!([
                {"id": "http://x.org/a", "properties": {"b": {"$ref": "http://x.org/b#/definitions/s"}}},
                {"id": "http://x.org/b", "definitions": {"s": {"type": "string"}}, "items": {"$ref": "http://x.org/a"}}
            ]),
        );
        let mut report = Report::new(Options::default());
        assert!(compile(&mut ctx, &mut report, batch).unwrap(), "{:?}", report.errors());
        for member in ctx.arena.items(batch).unwrap().to_vec() {
            assert!(ctx.annotations.is_compiled(member));
        }
    }

    #[test]
    fn test_batch_keeps_genuinely_missing_reference() {
        let mut ctx = ctx();
        let batch = import(
            &mut ctx,
            json!([
                {"id": "http://x.org/a", "$ref": "http://x.org/nowhere"},
                {"id": "http://x.org/b", "type": "string"}
            ]),
        );
        let mut report = Report::new(Options::default());
        assert!(!compile(&mut ctx, &mut report, batch).unwrap());
        let unresolvable: Vec<_> = report
            .errors()
            .iter()
            .filter(|e| e.kind == ErrorKind::UnresolvableReference)
            .collect();
        assert_eq!(unresolvable.len(), 1);
        assert_eq!(unresolvable[0].path.to_string(), "#/0");
    }
}
