/// Content length at which an element is wrapped onto continuation lines.
pub const SOFT_LINE_LIMIT: usize = 72;

const ELEMENT_INDENT: &str = "    ";
const CONTINUATION_INDENT: &str = "        ";

/// Serialize element contents as an annotated array, one marker per element.
///
/// Long contents are split at spaces into literals chained with `+`; only the
/// first line of an element carries its marker.
pub fn render<S: AsRef<str>>(contents: &[S]) -> String {
    let mut out = String::from("[\n");
    for (index, content) in contents.iter().enumerate() {
        let pieces = wrap_content(content.as_ref(), SOFT_LINE_LIMIT);
        let separator = if index + 1 < contents.len() { "," } else { "" };
        for (piece_index, piece) in pieces.iter().enumerate() {
            if piece_index == 0 {
                out.push_str(&format!("{ELEMENT_INDENT}/* {} */ \"{piece}\"", index + 1));
            } else {
                out.push_str(&format!("{CONTINUATION_INDENT}\"{piece}\""));
            }
            if piece_index + 1 < pieces.len() {
                out.push_str(" +\n");
            } else {
                out.push_str(separator);
                out.push('\n');
            }
        }
    }
    out.push(']');
    out
}

/// Split `content` into pieces of roughly `limit` characters whose
/// concatenation is `content`. Breaks fall after a space that is not escaped.
fn wrap_content(content: &str, limit: usize) -> Vec<&str> {
    if content.chars().count() <= limit {
        return vec![content];
    }
    let mut pieces = Vec::new();
    let mut piece_start = 0;
    let mut piece_chars = 0;
    let mut last_break = None;
    let mut previous = None;
    for (offset, ch) in content.char_indices() {
        if piece_chars >= limit {
            if let Some(at) = last_break.take() {
                pieces.push(&content[piece_start..at]);
                piece_chars = content[at..offset].chars().count();
                piece_start = at;
            }
        }
        piece_chars += 1;
        if ch == ' ' && previous != Some('\\') {
            last_break = Some(offset + 1);
        }
        previous = Some(ch);
    }
    pieces.push(&content[piece_start..]);
    pieces
}
