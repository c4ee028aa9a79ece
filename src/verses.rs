//! Verse segmentation, oracle-assisted restructuring and array rendering.
//!
//! The flow is segment → analyze → adjust → render. Both oracle-assisted steps
//! have a deterministic fallback (one verse per element) and never fail.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::strip::strip_all;

mod analyze;
mod render;
mod restructure;
mod segment;

pub use analyze::{analyze, fallback_analysis};
pub use render::{render, SOFT_LINE_LIMIT};
pub use restructure::{adjust, fallback_restructuring, FALLBACK_EXPLANATION};
pub use segment::segment;

/// One string-literal entry of an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayElement {
    /// Zero-based position among the kept elements.
    pub position: usize,
    /// Source text between the quotes, escapes kept verbatim.
    pub content: String,
    /// Value of the `/* N */` marker directly before the literal.
    pub marker: Option<u32>,
}

/// A semantic verse built from one or more array elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseBoundary {
    pub verse_number: u32,
    pub content: String,
    /// Positions of the array elements forming this verse.
    #[serde(default)]
    pub array_lines: Vec<usize>,
}

/// Grouping of array elements into verses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseStructureAnalysis {
    pub verse_boundaries: Vec<VerseBoundary>,
    #[serde(default)]
    pub total_complete_verses: usize,
    #[serde(default)]
    pub notes: String,
    /// Set when the one-verse-per-element fallback produced this analysis.
    #[serde(default, skip_deserializing)]
    pub fallback: bool,
}

/// A verse of the restructured list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub verse_number: u32,
    pub content: String,
    /// Positions of the original array elements this verse was built from.
    #[serde(default)]
    pub source_lines: Vec<usize>,
}

/// Verse list re-partitioned toward a target count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Restructuring {
    pub new_verses: Vec<Verse>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default, skip_deserializing)]
    pub fallback: bool,
}

/// Decode the first brace-delimited region of `text` that parses as `T`.
///
/// Regions are found by brace balancing that respects JSON strings. Comments
/// the oracle copies from prompt examples are stripped before decoding.
pub(crate) fn decode_structured<T: DeserializeOwned>(text: &str) -> Option<T> {
    let mut search_from = 0;
    while let Some((start, end)) = balanced_object(text, search_from) {
        let candidate = strip_all(&text[start..end]);
        match serde_json::from_str(&candidate) {
            Ok(value) => return Some(value),
            Err(err) => {
                tracing::debug!(error = %err, start, end, "brace region did not decode");
                search_from = end;
            }
        }
    }
    None
}

fn balanced_object(text: &str, from: usize) -> Option<(usize, usize)> {
    let start = from + text[from..].find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Escape bare quotes and a dangling backslash, and flatten newlines, in
/// oracle-produced verse text so it renders as a single string literal.
pub(crate) fn literal_safe(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut escaped = false;
    for ch in content.trim().chars() {
        match ch {
            _ if escaped => {
                escaped = false;
                out.push(ch);
            }
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            '"' => out.push_str("\\\""),
            '\n' | '\r' => out.push(' '),
            _ => out.push(ch),
        }
    }
    if escaped {
        out.push('\\');
    }
    out
}

/// Whitespace-insensitive comparison of verse text with the source elements.
pub fn text_preserved(elements: &[ArrayElement], verses: &[Verse]) -> bool {
    let source = elements.iter().map(|element| element.content.as_str());
    let target = verses.iter().map(|verse| verse.content.as_str());
    squeeze(source) == squeeze(target)
}

fn squeeze<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::chars)
        .filter(|ch| !ch.is_whitespace())
        .collect()
}
