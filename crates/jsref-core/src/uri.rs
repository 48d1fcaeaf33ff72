//! # URI and JSON Pointer Helpers
//!
//! A reference such as `http://x.org/a.json#/definitions/b` is split into
//! its *remote path* (`http://x.org/a.json`, the canonical document URI
//! used as a cache key) and its *query path* (`/definitions/b`, resolved
//! inside that document).

use percent_encoding::percent_decode_str;

/// True for `http://` and `https://` URIs.
pub fn is_absolute_uri(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

/// True when `uri` has a document part followed by a fragment
/// (at least one character before a `#`).
pub fn is_relative_uri(uri: &str) -> bool {
    uri.chars().skip(1).any(|c| c == '#')
}

/// The canonical document URI: everything before the first `#`.
pub fn remote_path(uri: &str) -> &str {
    match uri.find('#') {
        Some(pos) => &uri[..pos],
        None => uri,
    }
}

/// The fragment after the first `#`, if any.
pub fn query_path(uri: &str) -> Option<&str> {
    uri.find('#').map(|pos| &uri[pos + 1..])
}

/// Decode one JSON Pointer segment: percent-decoding first, then
/// `~1` to `/` and `~0` to `~`.
pub fn decode_pointer_segment(segment: &str) -> String {
    let decoded = percent_decode_str(segment).decode_utf8_lossy();
    if !decoded.contains('~') {
        return decoded.into_owned();
    }
    decoded.replace("~1", "/").replace("~0", "~")
}

/// Escape one path segment for pointer rendering.
pub fn escape_pointer_segment(segment: &str) -> String {
    if !segment.contains('/') && !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace('~', "~0").replace('/', "~1")
}

/// Resolve `reference` against the stack of ancestor `id`s in scope.
///
/// - An absolute reference is returned unchanged.
/// - Absolute scope, relative reference: the scope is cut after its last `/`.
/// - Relative scope, relative reference: the scope contributes nothing.
/// - Absolute scope, fragment-only reference (`#...`): the scope's document
///   URI is kept whole and the fragment appended.
/// - Otherwise the trailing non-fragment segment of the scope is trimmed.
///
/// A doubled `##` produced by concatenation collapses to a single `#`.
pub fn merge_reference(scope: &[String], reference: &str) -> String {
    if is_absolute_uri(reference) {
        return reference.to_string();
    }

    let joined: String = scope.concat();
    let scope_absolute = is_absolute_uri(&joined);
    let scope_relative = is_relative_uri(&joined);
    let reference_relative = is_relative_uri(reference);

    let base: &str = if scope_absolute && reference_relative {
        match joined.rfind('/') {
            Some(pos) => &joined[..=pos],
            None => &joined,
        }
    } else if scope_relative && reference_relative {
        ""
    } else if scope_absolute && reference.starts_with('#') {
        remote_path(&joined)
    } else {
        let keep = joined
            .rfind(['#', '/'])
            .map(|pos| pos + 1)
            .unwrap_or(0);
        &joined[..keep]
    };

    format!("{base}{reference}").replace("##", "#")
}
