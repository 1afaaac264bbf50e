//! Tag-aware lexer.
//!
//! Splits template text into [`Token`]s:
//!
//! | Syntax        | Token                    |
//! |---------------|--------------------------|
//! | `text`        | [`TokenKind::Text`]      |
//! | `<# code #>`  | [`TokenKind::Code`]      |
//! | `<#= expr #>` | [`TokenKind::Expression`]|
//! | `<#@ dir #>`  | [`TokenKind::Directive`] |
//!
//! A run of `\` directly in front of `<#` or `#>` is halved. An even run leaves
//! the marker active, an odd run turns it into literal text:
//!
//! ```text
//! \<#    -> \<#     (literal)
//! \\<#   -> \  + tag
//! \\\<#  -> \\<#    (literal)
//! \\\\<# -> \\ + tag
//! ```

use crate::section::{Token, TokenKind};

const OPEN: &str = "<#";
const CLOSE: &str = "#>";
const ESCAPE: char = '\\';

const FIRST_LINE: usize = 1;
const FIRST_COLUMN: usize = 0;

/// Lex `text` into tokens. Each call starts a fresh, independent scan.
pub fn lex(text: &str) -> Lexer<'_> {
    Lexer::new(text)
}

/// Lazy token iterator over one file's text.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    mode: TokenKind,
    buffer: String,
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            mode: TokenKind::Text,
            buffer: String::new(),
            line: FIRST_LINE,
            column: FIRST_COLUMN,
            start_line: FIRST_LINE,
            start_column: FIRST_COLUMN,
        }
    }

    /// Emit the buffered content as a token of the current mode.
    fn flush(&mut self) -> Option<Token> {
        if self.buffer.is_empty() {
            return None;
        }
        let content = std::mem::take(&mut self.buffer);
        Some(Token::new(
            self.mode,
            self.start_line,
            self.start_column,
            content,
        ))
    }

    fn begin(&mut self, mode: TokenKind) {
        self.mode = mode;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    /// Skip a marker. Markers are ASCII and never contain a newline.
    fn skip_marker(&mut self, len: usize) {
        self.pos += len;
        self.column += len;
    }

    fn consume(&mut self, ch: char) {
        self.buffer.push(ch);
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = FIRST_COLUMN;
        } else {
            self.column += 1;
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while let Some(ch) = self.src[self.pos..].chars().next() {
            let rest = &self.src[self.pos..];

            if self.mode == TokenKind::Text {
                if rest.starts_with(OPEN) && release_escapes(&mut self.buffer) {
                    let flushed = self.flush();
                    let kind = match rest.as_bytes().get(OPEN.len()) {
                        Some(b'=') => TokenKind::Expression,
                        Some(b'@') => TokenKind::Directive,
                        _ => TokenKind::Code,
                    };
                    let marker_len = match kind {
                        TokenKind::Code => OPEN.len(),
                        _ => OPEN.len() + 1,
                    };
                    self.skip_marker(marker_len);
                    self.begin(kind);
                    if flushed.is_some() {
                        return flushed;
                    }
                    continue;
                }
            } else if rest.starts_with(CLOSE) && release_escapes(&mut self.buffer) {
                let flushed = self.flush();
                self.skip_marker(CLOSE.len());
                self.begin(TokenKind::Text);
                if flushed.is_some() {
                    return flushed;
                }
                continue;
            }

            self.consume(ch);
        }

        self.flush()
    }
}

/// Halve the escape run at the end of `buffer`.
///
/// Returns `true` when the following marker is a real tag boundary.
fn release_escapes(buffer: &mut String) -> bool {
    let count = buffer.chars().rev().take_while(|&c| c == ESCAPE).count();
    let remove = count / 2;
    buffer.truncate(buffer.len() - remove * ESCAPE.len_utf8());
    count % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        lex(text).collect()
    }

    fn t(kind: TokenKind, line: usize, column: usize, content: &str) -> Token {
        Token::new(kind, line, column, content)
    }

    #[test]
    fn test_plain_text_is_one_token() {
        assert_eq!(
            tokens("just \"text\"\nhere"),
            vec![t(TokenKind::Text, 1, 0, "just \"text\"\nhere")]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(tokens("").is_empty());
    }

    #[test]
    fn test_expression_positions() {
        assert_eq!(
            tokens("Hello <#= \"World\" #>!"),
            vec![
                t(TokenKind::Text, 1, 0, "Hello "),
                t(TokenKind::Expression, 1, 9, " \"World\" "),
                t(TokenKind::Text, 1, 20, "!"),
            ]
        );
    }

    #[test]
    fn test_code_and_lines() {
        assert_eq!(
            tokens("a\n<# x #>\nb"),
            vec![
                t(TokenKind::Text, 1, 0, "a\n"),
                t(TokenKind::Code, 2, 2, " x "),
                t(TokenKind::Text, 2, 7, "\nb"),
            ]
        );
    }

    #[test]
    fn test_directive() {
        assert_eq!(
            tokens("<#@ include file=\"a.ttinc\" #>"),
            vec![t(TokenKind::Directive, 1, 3, " include file=\"a.ttinc\" ")]
        );
    }

    #[test]
    fn test_multiline_code_keeps_start_position() {
        let toks = tokens("x<# for i = 1, 2 do\n  y() end #>");
        assert_eq!(toks[1], t(TokenKind::Code, 1, 3, " for i = 1, 2 do\n  y() end "));
    }

    #[test]
    fn test_empty_tag_yields_nothing() {
        assert!(tokens("<##>").is_empty());
    }

    #[test]
    fn test_unterminated_tag_flushes_content() {
        assert_eq!(tokens("<# x"), vec![t(TokenKind::Code, 1, 2, " x")]);
    }

    #[test]
    fn test_single_escape_keeps_marker_literal() {
        assert_eq!(
            tokens("\\<# x #>"),
            vec![t(TokenKind::Text, 1, 0, "\\<# x #>")]
        );
    }

    #[test]
    fn test_double_escape_opens_tag() {
        assert_eq!(
            tokens("\\\\<# x #>"),
            vec![t(TokenKind::Text, 1, 0, "\\"), t(TokenKind::Code, 1, 4, " x ")]
        );
    }

    #[test]
    fn test_escape_runs() {
        // odd: floor(n/2) removed, marker literal
        assert_eq!(tokens("\\\\\\<#")[0].content, "\\\\<#");
        // even: n/2 removed, marker active
        let toks = tokens("\\\\\\\\<#x#>");
        assert_eq!(toks[0], t(TokenKind::Text, 1, 0, "\\\\"));
        assert_eq!(toks[1].kind, TokenKind::Code);
        assert_eq!(toks[1].content, "x");
    }

    #[test]
    fn test_escaped_close_marker_inside_code() {
        assert_eq!(
            tokens("<# a \\#> b #>"),
            vec![t(TokenKind::Code, 1, 2, " a \\#> b ")]
        );
    }

    #[test]
    fn test_restartable() {
        let text = "a<#= b #>c<# d #>";
        assert_eq!(tokens(text), tokens(text));
    }

    #[test]
    fn test_columns_count_chars() {
        let toks = tokens("héllo<#= x #>");
        assert_eq!(toks[1], t(TokenKind::Expression, 1, 8, " x "));
    }
}
