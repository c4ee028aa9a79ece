//! Lexical scanner for flat array literals.
//!
//! This is not a grammar for any language. It recognizes just enough to
//! reason about single-level arrays of double-quoted strings: string literals
//! (with backslash escapes), block and line comments, brackets, commas and the
//! `+` used to continue long literals. Everything else is skipped, so callers
//! slice the source between token spans to recover surrounding text.

/// Kinds of lexical tokens the scanner emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A terminated `"..."` literal, quotes included.
    Str,
    /// A literal that hit a newline or end of input before its closing quote.
    UnterminatedStr,
    /// `/* ... */`, or `/*` to end of input when unterminated.
    BlockComment,
    /// `//` up to, not including, the newline.
    LineComment,
    OpenBracket,
    CloseBracket,
    Comma,
    Plus,
}

/// A token with its byte span in the scanned source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::BlockComment | TokenKind::LineComment)
    }

    /// Marker value when this token is a `/* N */` sequential marker.
    pub fn marker_value(&self, src: &str) -> Option<u32> {
        if self.kind != TokenKind::BlockComment {
            return None;
        }
        marker_value(self.text(src))
    }

    /// Text between the quotes of a terminated string literal.
    pub fn literal_body<'a>(&self, src: &'a str) -> Option<&'a str> {
        if self.kind != TokenKind::Str {
            return None;
        }
        Some(&src[self.start + 1..self.end - 1])
    }
}

/// Scan `src` into tokens in document order.
pub fn tokenize(src: &str) -> Vec<Token> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let kind = match bytes[i] {
            b'"' => {
                let (end, terminated) = scan_string(bytes, i);
                i = end;
                if terminated {
                    TokenKind::Str
                } else {
                    TokenKind::UnterminatedStr
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = src[i + 2..]
                    .find("*/")
                    .map(|offset| i + 2 + offset + 2)
                    .unwrap_or(bytes.len());
                TokenKind::BlockComment
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                i = src[i..]
                    .find('\n')
                    .map(|offset| i + offset)
                    .unwrap_or(bytes.len());
                TokenKind::LineComment
            }
            b'[' => {
                i += 1;
                TokenKind::OpenBracket
            }
            b']' => {
                i += 1;
                TokenKind::CloseBracket
            }
            b',' => {
                i += 1;
                TokenKind::Comma
            }
            b'+' => {
                i += 1;
                TokenKind::Plus
            }
            _ => {
                i += 1;
                continue;
            }
        };
        tokens.push(Token {
            kind,
            start,
            end: i,
        });
    }
    tokens
}

/// Returns the end offset of the literal opening at `start` and whether a
/// closing quote was found before a newline.
fn scan_string(bytes: &[u8], start: usize) -> (usize, bool) {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return (i + 1, true),
            b'\n' => return (i, false),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

/// Parse the value of a `/* N */` marker comment.
pub fn marker_value(comment: &str) -> Option<u32> {
    let inner = comment.strip_prefix("/*")?.strip_suffix("*/")?.trim();
    if inner.is_empty() || !inner.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    inner.parse().ok()
}

/// True when the slice holds only whitespace (newlines included).
pub fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// True when the slice holds only spaces and tabs.
pub fn is_inline_blank(text: &str) -> bool {
    text.chars().all(|ch| ch == ' ' || ch == '\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn scans_flat_array() {
        assert_eq!(
            kinds(r#"let a = [/* 1 */ "x", "y"]"#),
            vec![
                TokenKind::OpenBracket,
                TokenKind::BlockComment,
                TokenKind::Str,
                TokenKind::Comma,
                TokenKind::Str,
                TokenKind::CloseBracket,
            ]
        );
    }

    #[test]
    fn comment_openers_inside_strings_are_text() {
        let src = r#"["http://example.org /* not a comment */"]"#;
        assert_eq!(
            kinds(src),
            vec![
                TokenKind::OpenBracket,
                TokenKind::Str,
                TokenKind::CloseBracket
            ]
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_literal() {
        let src = r#""say \"amen\"", "b""#;
        let tokens = tokenize(src);
        assert_eq!(tokens[0].literal_body(src), Some(r#"say \"amen\""#));
        assert_eq!(tokens[2].literal_body(src), Some("b"));
    }

    #[test]
    fn newline_ends_unterminated_literal() {
        let src = "\"open\n\"closed\"";
        assert_eq!(
            kinds(src),
            vec![TokenKind::UnterminatedStr, TokenKind::Str]
        );
    }

    #[test]
    fn unterminated_block_comment_runs_to_end() {
        let src = "[\"a\" /* dangling";
        let tokens = tokenize(src);
        let last = tokens.last().expect("token");
        assert_eq!(last.kind, TokenKind::BlockComment);
        assert_eq!(last.end, src.len());
    }

    #[test]
    fn line_comment_stops_before_newline() {
        let src = "// note\n\"a\"";
        let tokens = tokenize(src);
        assert_eq!(tokens[0].text(src), "// note");
        assert_eq!(tokens[1].kind, TokenKind::Str);
    }

    #[test]
    fn marker_values() {
        assert_eq!(marker_value("/* 12 */"), Some(12));
        assert_eq!(marker_value("/*3*/"), Some(3));
        assert_eq!(marker_value("/* note */"), None);
        assert_eq!(marker_value("/* */"), None);
        assert_eq!(marker_value("/* -1 */"), None);
    }

    #[test]
    fn handles_multibyte_text() {
        let src = "[\"Dóminus ｜ regit\", \"me\"]";
        let tokens = tokenize(src);
        assert_eq!(tokens[1].literal_body(src), Some("Dóminus ｜ regit"));
        assert_eq!(tokens[3].literal_body(src), Some("me"));
    }
}
