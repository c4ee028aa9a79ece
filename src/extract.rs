//! Recover a candidate fragment from raw oracle text.
//!
//! Oracles wrap their answer in fences, sprinkle sentinel tokens such as
//! `<|im_end|>`, and add prose around the code. Extraction never fails: when
//! nothing recognizable is found the cleaned text is returned as-is and the
//! validator gets to judge it.
use regex::Regex;
use std::sync::LazyLock;

use crate::scan::{tokenize, TokenKind};

/// Sentinel shape `<|token|>`, with ASCII or fullwidth pipes.
static SENTINEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[|｜][^|｜>]+[|｜]>").expect("sentinel pattern compiles"));

const SENTINEL_FRAGMENTS: &[&str] = &["<|", "|>", "<｜", "｜>"];

/// Prose lead-ins oracles put on their own line before or after the code.
const LEAD_INS: &[&str] = &["Output", "Result", "Corrected", "Here is", "Here's", "---"];

const FENCE: &str = "```";

/// Which cleanup steps apply for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Keep only the first fenced block's content.
    pub strip_fences: bool,
    /// Narrow the text to the first bracketed array.
    pub array_slice: bool,
}

impl ExtractOptions {
    pub const ARRAY: Self = Self {
        strip_fences: true,
        array_slice: true,
    };
    pub const CODE: Self = Self {
        strip_fences: true,
        array_slice: false,
    };
}

/// Clean raw oracle text into a candidate fragment.
pub fn extract(raw: &str, options: ExtractOptions) -> String {
    let body = if options.strip_fences {
        first_fenced_block(raw).unwrap_or(raw)
    } else {
        raw
    };
    let body = SENTINEL.replace_all(body, "");
    let cleaned = body
        .lines()
        .filter(|line| !is_commentary(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    if options.array_slice {
        if let Some(slice) = slice_array(&cleaned) {
            return slice;
        }
        tracing::debug!("no bracketed array in oracle output; returning cleaned text");
    }
    cleaned
}

fn is_commentary(line: &str) -> bool {
    let head = line.trim_start();
    LEAD_INS.iter().any(|lead| head.starts_with(lead))
        || SENTINEL_FRAGMENTS.iter().any(|fragment| line.contains(fragment))
}

/// Remove sentinel tokens from a prose reply and trim it.
pub fn strip_sentinels(raw: &str) -> String {
    SENTINEL.replace_all(raw, "").trim().to_string()
}

/// Content of the first fenced block, or `None` when there is no fence.
fn first_fenced_block(raw: &str) -> Option<&str> {
    let mut offset = 0;
    let mut open_end = None;
    for line in raw.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        if !line.trim_start().starts_with(FENCE) {
            continue;
        }
        match open_end {
            None => open_end = Some(offset),
            Some(start) => return Some(&raw[start..line_start]),
        }
    }
    open_end.map(|start| &raw[start..])
}

/// Lines from the first `[` or marker through the bracket that closes the
/// first `[`.
fn slice_array(cleaned: &str) -> Option<String> {
    let tokens = tokenize(cleaned);
    let first_open = tokens
        .iter()
        .position(|token| token.kind == TokenKind::OpenBracket)?;
    let start = tokens
        .iter()
        .find(|token| {
            token.kind == TokenKind::OpenBracket || token.marker_value(cleaned).is_some()
        })
        .map(|token| token.start)?;
    let mut depth = 0usize;
    let mut close = None;
    for token in &tokens[first_open..] {
        match token.kind {
            TokenKind::OpenBracket => depth += 1,
            TokenKind::CloseBracket => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    close = Some(token.end);
                    break;
                }
            }
            _ => {}
        }
    }
    let close = close?;
    let line_start = cleaned[..start].rfind('\n').map_or(0, |pos| pos + 1);
    let line_end = cleaned[close..]
        .find('\n')
        .map_or(cleaned.len(), |pos| close + pos);
    Some(cleaned[line_start..line_end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = "private let text = [\n    /* 1 */ \"First line\",\n    /* 2 */ \"Second line\"\n]";

    #[test]
    fn prose_and_fence_are_removed() {
        let raw = format!("Here is the corrected code:\n```swift\n{FRAGMENT}\n```");
        assert_eq!(extract(&raw, ExtractOptions::ARRAY), FRAGMENT);
        assert_eq!(extract(&raw, ExtractOptions::CODE), FRAGMENT);
    }

    #[test]
    fn trailing_explanation_after_fence_is_dropped() {
        let raw = format!("```\n{FRAGMENT}\n```\nI numbered every element.");
        assert_eq!(extract(&raw, ExtractOptions::CODE), FRAGMENT);
    }

    #[test]
    fn sentinels_are_removed() {
        let raw = format!("{FRAGMENT}<|im_end|>\n<｜end▁of▁sentence｜>");
        assert_eq!(extract(&raw, ExtractOptions::ARRAY), FRAGMENT);
    }

    #[test]
    fn unknown_sentinels_with_the_same_shape_are_removed() {
        let raw = "<|brand_new_token|>[\"a\"]";
        assert_eq!(extract(raw, ExtractOptions::ARRAY), "[\"a\"]");
    }

    #[test]
    fn lead_in_lines_are_dropped() {
        let raw = format!("Corrected code:\n{FRAGMENT}\n---\nResult: 2 elements");
        assert_eq!(extract(&raw, ExtractOptions::ARRAY), FRAGMENT);
    }

    #[test]
    fn array_slice_skips_prose_without_lead_in() {
        let raw = format!("Sure! I added the numbers.\n{FRAGMENT}\nLet me know if you need more.");
        assert_eq!(extract(&raw, ExtractOptions::ARRAY), FRAGMENT);
    }

    #[test]
    fn bracket_inside_string_does_not_end_slice() {
        let raw = "Sure:\nlet a = [\n    /* 1 */ \"[Psalm 22]\",\n    /* 2 */ \"b\"\n]\nDone.";
        assert_eq!(
            extract(raw, ExtractOptions::ARRAY),
            "let a = [\n    /* 1 */ \"[Psalm 22]\",\n    /* 2 */ \"b\"\n]"
        );
    }

    #[test]
    fn no_bracket_falls_back_to_cleaned_text() {
        let raw = "```\n/* 1 */ \"a\",\n/* 2 */ \"b\"\n```";
        assert_eq!(extract(raw, ExtractOptions::ARRAY), "/* 1 */ \"a\",\n/* 2 */ \"b\"");
    }

    #[test]
    fn prose_keeps_lines_and_loses_sentinels() {
        let raw = "<|im_start|>Result: the Lord is my shepherd.\n---\nOutput ends here<|im_end|>\n";
        assert_eq!(
            strip_sentinels(raw),
            "Result: the Lord is my shepherd.\n---\nOutput ends here"
        );
    }

    #[test]
    fn empty_response_stays_empty() {
        assert_eq!(extract("", ExtractOptions::ARRAY), "");
    }
}
