//! Route resolution for inbound calls.
//!
//! Decides whether a raw path belongs to the reserved internal surface
//! or is a tenant-facing capture path, and normalizes capture paths.
//! Pure functions, no side effects.

/// Path segment reserved for the internal query surface.
///
/// Calls to exactly this path bypass capture and are handed back to the
/// transport layer's own routing.
pub const RESERVED_PATH: &str = "graphql";

/// Routing decision for one inbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// The call targets the reserved internal path; do not capture.
    Reserved,

    /// The call is a tenant capture on the contained normalized path.
    Capture(String),
}

/// Classify a raw inbound path.
///
/// The reserved check is an exact match against the whole normalized
/// path: `graphql` is reserved, while `graphql-webhook` and
/// `graphql/queries` are ordinary capture paths.
pub fn resolve(raw_path: &str) -> RouteDecision {
    let normalized = normalize_path(raw_path);
    if normalized.strip_prefix('/') == Some(RESERVED_PATH) {
        RouteDecision::Reserved
    } else {
        RouteDecision::Capture(normalized)
    }
}

/// Normalize a raw path to exactly one leading separator.
///
/// Empty input becomes the root path. Idempotent: normalizing an
/// already-normalized path returns it unchanged.
pub fn normalize_path(raw: &str) -> String {
    let rest = raw.trim_start_matches('/');
    if rest.is_empty() {
        "/".to_string()
    } else {
        format!("/{rest}")
    }
}
