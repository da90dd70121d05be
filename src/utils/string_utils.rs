//! UTF-8-safe string truncation utilities
//!
//! Safe string slicing that respects UTF-8 character boundaries, preventing
//! panics on multi-byte characters (chevrons, arrows, emoji) that routinely
//! appear in scraped anchor and heading text.

/// Safely truncate a string to a maximum number of CHARACTERS (not bytes).
///
/// Returns a slice of the original string containing at most `max_chars`
/// characters, or the full string if it is already short enough.
#[inline]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Clip text to a character budget, collapsing inner whitespace runs first.
///
/// Heading and sample texts are clipped through this before dedup so that
/// two headings differing only in whitespace compare equal.
#[must_use]
pub fn clip_chars(s: &str, max_chars: usize) -> String {
    let collapsed: String = s.split_whitespace().collect::<Vec<_>>().join(" ");
    safe_truncate_chars(&collapsed, max_chars)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
        assert_eq!(safe_truncate_chars("»»»»", 2), "»»");
        assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
    }

    #[test]
    fn clip_collapses_whitespace_runs() {
        assert_eq!(clip_chars("  a \n\t b   c ", 80), "a b c");
        assert_eq!(clip_chars("long   heading here", 8), "long hea");
    }
}
