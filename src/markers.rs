//! Sequential marker normalization and validation.
//!
//! A sequential marker is a `/* N */` comment directly before the array
//! element it numbers. Oracles sometimes emit the marker after the element
//! instead; [`normalize_positions`] moves it back in front. Numbering is only
//! diagnosed here, never repaired: deciding which element a stray marker was
//! meant for needs the markers to already sit directly before their elements.
use serde::Serialize;
use std::fmt;

use crate::scan::{is_inline_blank, tokenize, TokenKind};

/// Result of checking marker numbering against `1..count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Numbering {
    /// Markers read `1..count` in document order.
    Sequential(usize),
    /// Markers exist but are out of order, duplicated or have gaps.
    NonSequential { count: usize, sequence: Vec<u32> },
}

impl Numbering {
    pub fn is_sequential(&self) -> bool {
        matches!(self, Self::Sequential(_))
    }
}

impl fmt::Display for Numbering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential(count) => write!(f, "{count}"),
            Self::NonSequential { count, sequence } => {
                write!(f, "{count} (non-sequential: {sequence:?})")
            }
        }
    }
}

/// Rewrite `"text" /* N */` as `/* N */ "text"` wherever a marker trails its
/// element on the same line.
pub fn normalize_positions(fragment: &str) -> String {
    let tokens = tokenize(fragment);
    let mut out = String::with_capacity(fragment.len());
    let mut cursor = 0;
    let mut idx = 0;
    while idx < tokens.len() {
        let literal = tokens[idx];
        let trailing = tokens.get(idx + 1).filter(|next| {
            literal.kind == TokenKind::Str
                && next.marker_value(fragment).is_some()
                && is_inline_blank(&fragment[literal.end..next.start])
        });
        match trailing {
            Some(marker) => {
                out.push_str(&fragment[cursor..literal.start]);
                out.push_str(marker.text(fragment));
                out.push(' ');
                out.push_str(literal.text(fragment));
                cursor = marker.end;
                idx += 2;
            }
            None => idx += 1,
        }
    }
    out.push_str(&fragment[cursor..]);
    out
}

/// Marker values in document order, ignoring anything inside string literals.
pub fn marker_values(fragment: &str) -> Vec<u32> {
    tokenize(fragment)
        .into_iter()
        .filter_map(|token| token.marker_value(fragment))
        .collect()
}

/// Compare the fragment's markers against `1..count`.
///
/// A fragment without markers reports `Sequential(0)`.
pub fn validate_sequential(fragment: &str) -> Numbering {
    let sequence = marker_values(fragment);
    let count = sequence.len();
    let in_order = sequence
        .iter()
        .zip(1u32..)
        .all(|(value, expected)| *value == expected);
    if in_order {
        Numbering::Sequential(count)
    } else {
        Numbering::NonSequential { count, sequence }
    }
}
