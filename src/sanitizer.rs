//! Dimension-name sanitization and reserved-name collision detection.

use std::collections::HashSet;

/// The reserved per-metric dimension names: configuring any of these, or a
/// name that sanitizes to the same thing, is a configuration error.
pub const RESERVED_METRIC_DIMENSIONS: &[&str] = &["operation", "span.kind", "status.code"];

/// The reserved resource-attribute dimension name.
pub const RESERVED_RESOURCE_DIMENSIONS: &[&str] = &["service.name"];

/// Normalize a name for collision detection: non-alphanumeric becomes `_`,
/// a leading digit gets a `key_` prefix, a leading `_` gets a `key` prefix.
/// An empty input stays empty.
pub fn sanitize(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let mut out: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out = format!("key_{out}");
    } else if out.starts_with('_') {
        out = format!("key{out}");
    }
    out
}

/// Check a sequence of configured dimension names against a reserved set,
/// in both raw and sanitized form. Returns the first offending name found.
pub fn find_collision(reserved: &[&str], configured: &[String]) -> Option<String> {
    let mut seen_raw: HashSet<String> = reserved.iter().map(|s| s.to_string()).collect();
    let mut seen_sanitized: HashSet<String> = reserved.iter().map(|s| sanitize(s)).collect();

    for name in configured {
        let normalized = sanitize(name);
        if seen_raw.contains(name) || seen_sanitized.contains(&normalized) {
            return Some(name.clone());
        }
        seen_raw.insert(name.clone());
        seen_sanitized.insert(normalized);
    }
    None
}
