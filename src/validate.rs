//! Structural sanity checks on transformed fragments.
//!
//! These are cheap heuristics. A transformation that keeps the line count
//! but corrupts the content passes.
use serde::Serialize;
use std::fmt;

use crate::error::PipelineError;
use crate::markers::marker_values;
use crate::scan::{tokenize, TokenKind};
use crate::verses::segment;

/// Advisory findings reported alongside best-effort output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    MissingOpenBracket,
    MissingCloseBracket,
    NoMarkers,
    /// Markers and string elements disagree, e.g. the oracle dropped an element.
    MarkerCountMismatch { markers: usize, elements: usize },
}

impl fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingOpenBracket => write!(f, "output has no opening bracket"),
            Self::MissingCloseBracket => write!(f, "output has no closing bracket"),
            Self::NoMarkers => write!(f, "output has no sequential markers"),
            Self::MarkerCountMismatch { markers, elements } => write!(
                f,
                "{markers} markers for {elements} string elements"
            ),
        }
    }
}

/// Reject output with fewer than half the original's lines.
pub fn check_complete<'a>(original: &str, transformed: &'a str) -> Result<&'a str, PipelineError> {
    let original_lines = line_count(original);
    let transformed_lines = line_count(transformed);
    if transformed_lines * 2 < original_lines {
        tracing::warn!(
            original_lines,
            transformed_lines,
            "transformed code looks truncated"
        );
        return Err(PipelineError::Incomplete {
            original_lines,
            transformed_lines,
        });
    }
    Ok(transformed)
}

/// A string with no newline counts as one line, as does the empty string.
fn line_count(text: &str) -> usize {
    text.split('\n').count()
}

/// Check an annotated array for brackets and markers.
///
/// The marker count is cross-checked against the number of string elements
/// the segmenter finds, so an oracle that drops an element but numbers the
/// rest `1..N` is still flagged.
pub fn check_array_structure(fragment: &str) -> Vec<StructuralWarning> {
    let tokens = tokenize(fragment);
    let mut warnings = Vec::new();
    if !tokens.iter().any(|token| token.kind == TokenKind::OpenBracket) {
        warnings.push(StructuralWarning::MissingOpenBracket);
    }
    if !tokens.iter().any(|token| token.kind == TokenKind::CloseBracket) {
        warnings.push(StructuralWarning::MissingCloseBracket);
    }
    let markers = marker_values(fragment).len();
    if markers == 0 {
        warnings.push(StructuralWarning::NoMarkers);
        return warnings;
    }
    let elements = segment(fragment).len();
    if markers != elements {
        warnings.push(StructuralWarning::MarkerCountMismatch { markers, elements });
    }
    warnings
}
