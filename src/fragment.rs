//! Code fragment model: fences, language tags and assignment prefixes.
use regex::Regex;
use std::sync::LazyLock;

use crate::scan::{tokenize, TokenKind};

/// Language assumed when neither the caller nor a fence names one.
pub const DEFAULT_LANGUAGE: &str = "swift";

const FENCE: &str = "```";

static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*(\S(?:.*?[^=!<>])?=)\s*\[").expect("assignment pattern compiles")
});

/// Caller-supplied subject text with the wrapping it arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    /// Fragment text with any fence removed.
    pub body: String,
    pub language: String,
    /// Tag of the fence the input was wrapped in; `Some("")` for an untagged fence.
    pub fence_tag: Option<String>,
    /// `name =` clause preceding the array, when present.
    pub assignment: Option<String>,
}

impl CodeFragment {
    /// Split caller input into body, fence and assignment prefix.
    ///
    /// An explicit `language` wins over the fence tag, which wins over
    /// [`DEFAULT_LANGUAGE`].
    pub fn parse(raw: &str, language: Option<&str>) -> Self {
        let trimmed = raw.trim();
        let (fence_tag, body) = match unwrap_fence(trimmed) {
            Some((tag, body)) => (Some(tag.to_string()), body),
            None => (None, trimmed),
        };
        let language = language
            .map(str::to_string)
            .or_else(|| fence_tag.clone().filter(|tag| !tag.is_empty()))
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let assignment = assignment_prefix(body).map(str::to_string);
        Self {
            body: body.to_string(),
            language,
            fence_tag,
            assignment,
        }
    }

    /// Re-wrap `body` in this fragment's fence, if it had one.
    ///
    /// An untagged fence gets [`DEFAULT_LANGUAGE`] as its tag.
    pub fn rewrap(&self, body: &str) -> String {
        match self.fence_tag.as_deref() {
            Some("") => wrap_fence(body, DEFAULT_LANGUAGE),
            Some(tag) => wrap_fence(body, tag),
            None => body.to_string(),
        }
    }
}

/// Split a fence-wrapped text into its tag and body.
///
/// Returns `None` unless the text opens with a fence line. A missing closing
/// fence leaves the body running to the end of the text.
pub fn unwrap_fence(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let rest = text.strip_prefix(FENCE)?;
    let (tag, body) = match rest.split_once('\n') {
        Some((tag, body)) => (tag.trim(), body),
        None => (rest.trim(), ""),
    };
    let body = match body.rfind(FENCE) {
        Some(close) if body[close..].trim() == FENCE => &body[..close],
        _ => body,
    };
    Some((tag, body.trim_matches('\n').trim_end()))
}

pub fn wrap_fence(body: &str, tag: &str) -> String {
    format!("{FENCE}{tag}\n{body}\n{FENCE}")
}

/// Assignment clause (`private let text =`) before the array's opening bracket.
///
/// Only the text ahead of the first string literal or comment is considered,
/// so quoted `=` characters never count.
pub fn assignment_prefix(code: &str) -> Option<&str> {
    let head_end = tokenize(code)
        .into_iter()
        .find(|token| token.is_comment() || matches!(token.kind, TokenKind::Str))
        .map(|token| token.start)
        .unwrap_or(code.len());
    let head = &code[..head_end];
    let captures = ASSIGNMENT.captures(head)?;
    captures.get(1).map(|prefix| prefix.as_str().trim())
}

/// Put the original assignment clause back when `output` lost it.
pub fn restore_assignment(original: &str, output: &str) -> String {
    let trimmed = output.trim_start();
    match assignment_prefix(original) {
        Some(prefix) if trimmed.starts_with('[') => format!("{prefix} {trimmed}"),
        _ => output.to_string(),
    }
}
