/// Upper bound for response text carried inside errors and log fields.
pub const SNIPPET_BYTES: usize = 400;

/// Trim `text` and cut it at a char boundary no later than `max_bytes`,
/// marking the cut with `...`.
pub fn snippet(text: &str, max_bytes: usize) -> String {
    let text = text.trim();
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
