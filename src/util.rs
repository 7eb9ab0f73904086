//! Small helpers shared across the crate.

/// Shorten `s` to at most `max_chars` characters for log lines, appending
/// "..." when truncated. Counts characters, not bytes, so multi-byte UTF-8
/// never splits.
pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", s[..idx].trim_end()),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(preview("hello", 10), "hello");
        assert_eq!(preview("", 10), "");
    }

    #[test]
    fn long_strings_are_truncated() {
        assert_eq!(preview("hello world", 5), "hello...");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(preview("ééééé", 3), "ééé...");
    }
}
