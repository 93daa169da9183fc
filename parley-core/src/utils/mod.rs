//! Utility functions and helpers

/// Shorten `s` to at most `max_chars` characters for log output, marking the
/// cut with `...`
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    }
}
