//! Prefix scans over `parent:child` keys.

/// Exclusive upper bound for every key starting with `prefix`.
///
/// `"agent-1:"` becomes `"agent-1;"`, the next byte after `:`.
pub fn prefix_end_bound(prefix: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }

    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}

/// `(start, end)` bounds for `table.range(start..end)`.
pub fn prefix_range(prefix: &str) -> (String, String) {
    (prefix.to_string(), prefix_end_bound(prefix))
}

/// Key prefix that selects every child of `parent`.
pub fn child_prefix(parent: &str) -> String {
    format!("{}:", parent)
}
