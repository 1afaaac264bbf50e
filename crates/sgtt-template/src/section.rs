//! Section and token types shared by the lexer, resolver and synthesizer.

use std::path::Path;
use std::sync::Arc;

/// Kind of a lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Literal text outside of any tag.
    Text,
    /// `<# ... #>`
    Code,
    /// `<#= ... #>`
    Expression,
    /// `<#@ ... #>`
    Directive,
}

/// A lexed region of one file, before directives are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based line of the first content character.
    pub line: usize,
    /// 0-based column of the first content character.
    pub column: usize,
    pub content: String,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize, content: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            column,
            content: content.into(),
        }
    }
}

/// Kind of a resolved section. Directives never survive resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Text,
    Code,
    Expression,
}

impl SectionKind {
    /// Section kind for a non-directive token.
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Text => Some(Self::Text),
            TokenKind::Code => Some(Self::Code),
            TokenKind::Expression => Some(Self::Expression),
            TokenKind::Directive => None,
        }
    }
}

/// A resolved section of the final program body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSection {
    pub kind: SectionKind,
    /// File the section was lexed from (template or include).
    pub file: Arc<Path>,
    pub line: usize,
    pub column: usize,
    pub content: String,
}
