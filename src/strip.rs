//! Deterministic comment removal.
//!
//! Runs after any oracle-assisted removal: the oracle's pass is advisory and
//! this one is what guarantees the result holds no `/* */` or `//` comment
//! outside string literals.
use crate::scan::{is_inline_blank, tokenize};

/// Remove every block and line comment outside string literals.
///
/// A comment that opens its line takes the following spaces with it so the
/// element keeps its indentation. Lines left holding only whitespace after a
/// removal are dropped, and every line loses its trailing whitespace.
pub fn strip_all(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    let mut removals = Vec::new();
    let mut cursor = 0;
    for token in tokenize(fragment).into_iter().filter(|token| token.is_comment()) {
        out.push_str(&fragment[cursor..token.start]);
        let line_head = &out[out.rfind('\n').map_or(0, |pos| pos + 1)..];
        let mut end = token.end;
        if is_inline_blank(line_head) {
            let rest = &fragment[end..];
            end += rest.len() - rest.trim_start_matches([' ', '\t']).len();
        }
        removals.push(out.len());
        cursor = end;
    }
    out.push_str(&fragment[cursor..]);
    tidy_lines(&out, &removals)
}

fn tidy_lines(text: &str, removals: &[usize]) -> String {
    let mut kept = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        let line_end = offset + line.len();
        let touched = removals
            .iter()
            .any(|pos| (offset..=line_end).contains(pos));
        let trimmed = line.trim_end();
        if !(touched && trimmed.trim_start().is_empty()) {
            kept.push(trimmed);
        }
        offset = line_end + 1;
    }
    kept.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_markers_and_keeps_indentation() {
        let input = "let a = [\n    /* 1 */ \"x\",\n    /* 2 */ \"y\"\n]";
        assert_eq!(strip_all(input), "let a = [\n    \"x\",\n    \"y\"\n]");
    }

    #[test]
    fn removes_trailing_line_comments() {
        let input = "let a = [ // header\n    \"x\", // first\n]";
        assert_eq!(strip_all(input), "let a = [\n    \"x\",\n]");
    }

    #[test]
    fn drops_comment_only_lines_but_keeps_blank_ones() {
        let input = "[\n    // intro\n    \"x\",\n\n    /* multi\n       line */\n    \"y\"\n]";
        assert_eq!(strip_all(input), "[\n    \"x\",\n\n    \"y\"\n]");
    }

    #[test]
    fn keeps_comment_text_inside_strings() {
        let input = "[\"http://example.org\", \"a /* b */ c\"] // done";
        assert_eq!(strip_all(input), "[\"http://example.org\", \"a /* b */ c\"]");
    }

    #[test]
    fn slash_after_comment_is_not_an_opener() {
        assert_eq!(strip_all("x/* a *//y"), "x/y");
    }

    #[test]
    fn stripping_is_idempotent() {
        let inputs = [
            "[\n  /* 1 */ \"a\", // one\n  /* 2 */ \"b\"\n]",
            "/* unterminated\n\"a\"",
            "plain text with no comments  \n",
            "[\"a\" /* 1 */ /* 2 */, \"b\"]",
        ];
        for input in inputs {
            let once = strip_all(input);
            assert_eq!(strip_all(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn unterminated_block_comment_removes_rest() {
        assert_eq!(strip_all("[\"a\"] /* open"), "[\"a\"]");
    }
}
