use chrono::Utc;

/// Wall-clock milliseconds since the Unix epoch; every persisted timestamp.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Zero-padded nanoseconds, so keys built from it sort by time as strings.
///
/// Clamps to 0 outside the range chrono can express in an `i64`.
pub fn sortable_nanos() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(0).max(0);
    format!("{:020}", nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sortable_nanos_is_fixed_width_and_ordered() {
        let first = sortable_nanos();
        let second = sortable_nanos();
        assert_eq!(first.len(), 20);
        assert!(first <= second);
    }
}
