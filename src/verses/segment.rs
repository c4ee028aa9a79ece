use super::ArrayElement;
use crate::scan::{is_blank, tokenize, Token, TokenKind};

/// Extract the string elements of a flat array fragment, in order.
///
/// A literal counts as an element when spaces or tabs after it lead to a
/// comma, a comment opener, a closing bracket, a newline or the end of input.
/// Literals chained with `+` are one element. Whitespace-only elements are
/// dropped.
pub fn segment(fragment: &str) -> Vec<ArrayElement> {
    let tokens = tokenize(fragment);
    let mut elements = Vec::new();
    let mut idx = 0;
    while idx < tokens.len() {
        let first = tokens[idx];
        let Some(body) = first.literal_body(fragment) else {
            idx += 1;
            continue;
        };
        let marker = idx
            .checked_sub(1)
            .map(|prev| tokens[prev])
            .filter(|prev| is_blank(&fragment[prev.end..first.start]))
            .and_then(|prev| prev.marker_value(fragment));

        let mut content = body.to_string();
        let mut last = first;
        while let Some(next) = continuation(fragment, &tokens, idx, last) {
            if let Some(piece) = next.literal_body(fragment) {
                content.push_str(piece);
            }
            last = next;
            idx += 2;
        }
        idx += 1;

        if !closes_element(&fragment[last.end..]) || content.trim().is_empty() {
            continue;
        }
        elements.push(ArrayElement {
            position: elements.len(),
            content,
            marker,
        });
    }
    elements
}

/// The literal after `"..." +`, when `tokens[idx]` is followed by one.
fn continuation(fragment: &str, tokens: &[Token], idx: usize, last: Token) -> Option<Token> {
    let plus = tokens.get(idx + 1)?;
    let next = tokens.get(idx + 2)?;
    let joined = plus.kind == TokenKind::Plus
        && next.kind == TokenKind::Str
        && is_blank(&fragment[last.end..plus.start])
        && is_blank(&fragment[plus.end..next.start]);
    joined.then_some(*next)
}

fn closes_element(rest: &str) -> bool {
    let unindented = rest.trim_start_matches([' ', '\t']);
    unindented.is_empty()
        || unindented.starts_with([',', ']', '\n', '\r'])
        || unindented.starts_with("/*")
}
