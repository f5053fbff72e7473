//! Shared text utility functions.

/// Find the largest byte index <= `index` that is a valid char boundary.
pub fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Cut `s` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return s.chars().take(max_chars).collect();
    }
    let mut out: String = s.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// Keep the head and tail of `content` within `max_len` bytes.
pub fn middle_truncate(content: &str, max_len: usize) -> String {
    if content.len() <= max_len {
        return content.to_string();
    }

    let marker = format!("\n...[{} bytes truncated]...\n", content.len() - max_len);
    let budget = max_len.saturating_sub(marker.len());
    let head_end = floor_char_boundary(content, budget / 2);
    let mut tail_start = content.len() - (budget - head_end);
    while tail_start < content.len() && !content.is_char_boundary(tail_start) {
        tail_start += 1;
    }

    let mut out = String::with_capacity(max_len);
    out.push_str(&content[..head_end]);
    out.push_str(&marker);
    out.push_str(&content[tail_start..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multibyte_boundary() {
        let s = "你好世界";
        assert_eq!(floor_char_boundary(s, 1), 0);
        assert_eq!(floor_char_boundary(s, 4), 3);
        assert_eq!(floor_char_boundary(s, 100), s.len());
    }

    #[test]
    fn test_truncate_chars_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("short", 200), "short");
        let long = "é".repeat(300);
        let cut = truncate_chars(&long, 200);
        assert_eq!(cut.chars().count(), 200);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_middle_truncate_keeps_both_ends() {
        let content = format!("HEAD{}TAIL", "x".repeat(10_000));
        let out = middle_truncate(&content, 4000);
        assert!(out.len() <= 4000);
        assert!(out.starts_with("HEAD"));
        assert!(out.ends_with("TAIL"));
        assert!(out.contains("bytes truncated"));
    }

    #[test]
    fn test_middle_truncate_utf8_safe() {
        let content = "中".repeat(3000);
        let out = middle_truncate(&content, 4000);
        assert!(out.len() <= 4000);
    }
}
