//! Text helpers for one-line previews.

/// Truncate a string to a maximum number of Unicode characters.
///
/// If the string exceeds `max_chars`, the result is the first `max_chars - 3`
/// characters followed by `...`. If `max_chars <= 3`, returns `"."` repeated
/// `max_chars` times.
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 3 {
        ".".repeat(max_chars)
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

/// Collapse all whitespace runs to single spaces, then truncate.
pub fn preview(s: &str, max_chars: usize) -> String {
    let collapsed = s.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate(&collapsed, max_chars)
}
