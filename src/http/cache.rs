//! HTTP cache validation module
//!
//! Entity-tag comparison for conditional requests and the `Cache-Control`
//! policy applied to served assets.

/// Split an entity-tag into `(is_weak, opaque_tag)`.
///
/// Returns `None` when the value is not a quoted entity-tag.
fn parse_etag(value: &str) -> Option<(bool, &str)> {
    let value = value.trim();
    let (weak, tagged) = value
        .strip_prefix("W/")
        .map_or((false, value), |rest| (true, rest));
    let inner = tagged.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('"') {
        return None;
    }
    Some((weak, inner))
}

/// Strong comparison: both tags must be strong and identical
pub fn etag_strong_match(a: &str, b: &str) -> bool {
    match (parse_etag(a), parse_etag(b)) {
        (Some((false, a)), Some((false, b))) => a == b,
        _ => false,
    }
}

/// Weak comparison: opaque tags identical, weakness ignored
pub fn etag_weak_match(a: &str, b: &str) -> bool {
    match (parse_etag(a), parse_etag(b)) {
        (Some((_, a)), Some((_, b))) => a == b,
        _ => false,
    }
}

/// Check if an `If-None-Match` value matches the current `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", W/"def456"`
/// - Wildcard: `*`
///
/// Uses weak comparison. A match means the client copy is current.
pub fn if_none_match(header: &str, etag: Option<&str>) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || etag.is_some_and(|etag| etag_weak_match(candidate, etag))
    })
}

/// Check if an `If-Match` value matches the current `ETag`
///
/// Uses strong comparison, so a weak current `ETag` only matches `*`.
pub fn if_match(header: &str, etag: Option<&str>) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || etag.is_some_and(|etag| etag_strong_match(candidate, etag))
    })
}

/// Shared-cache policy for served assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Freshness lifetime in seconds
    pub max_age: u32,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        format!("public, max-age={}", self.max_age)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { max_age: 3600 } // 1 hour
    }
}
