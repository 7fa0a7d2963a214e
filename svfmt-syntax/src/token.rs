//! Token definitions for SystemVerilog source text
//!
//! This module defines the token kinds produced by the lexer. The kinds are defined
//! using the logos derive macro for efficient tokenization. Tokens carry no text of
//! their own; the lexer pairs each kind with the byte range of its source text, and
//! callers slice the original source to recover the text.
//!
//! The lexer is deliberately forgiving: bytes that match no rule become [`TokenKind::Unknown`]
//! tokens rather than hard errors, so that downstream token-stream comparison still works
//! over inputs the grammar does not cover. The only conditions reported as syntax errors
//! are unterminated block comments and unterminated strings, which would otherwise swallow
//! the rest of the file.

use logos::{Lexer, Logos};
use std::ops::Range;

/// All token kinds recognized in SystemVerilog source.
///
/// Keywords are not distinguished here; the lexer reclassifies identifiers against a
/// keyword table after matching, so that the logos grammar stays a plain tokenizer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Identifier-shaped tokens. `Identifier` may be reclassified as `Keyword`.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_$]*")]
    Identifier,
    Keyword,
    #[regex(r"\$[a-zA-Z_][a-zA-Z0-9_$]*")]
    SystemIdentifier,
    #[regex(r"\\[\x21-\x7E]+")]
    EscapedIdentifier,

    // Numeric literals: decimal/real, and based literals with optional size prefix.
    #[regex(r"[0-9][0-9_]*(\.[0-9_]+)?([eE][+-]?[0-9][0-9_]*)?")]
    #[regex(r"([0-9][0-9_]*[ \t]*)?'[sS]?[bodhBODH][ \t]*[0-9a-fA-FxXzZ?_]+")]
    #[regex(r"'[01xXzZ]")]
    Number,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StringLiteral,

    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", lex_block_comment)]
    BlockComment,

    // Compiler directives: `define, `include, `ifdef, macro calls, ...
    #[regex(r"`[a-zA-Z_][a-zA-Z0-9_]*")]
    Directive,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("::")]
    ScopeColon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("#")]
    Hash,
    #[token("@")]
    At,
    #[token("'")]
    Apostrophe,

    // Operators, longest spellings first so logos prefers them.
    #[token("<<<=")]
    #[token(">>>=")]
    #[token("===")]
    #[token("!==")]
    #[token("==?")]
    #[token("!=?")]
    #[token("<<<")]
    #[token(">>>")]
    #[token("<->")]
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("&&")]
    #[token("||")]
    #[token("<<")]
    #[token(">>")]
    #[token("->")]
    #[token("=>")]
    #[token("+:")]
    #[token("-:")]
    #[token("++")]
    #[token("--")]
    #[token("**")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token("~&")]
    #[token("~|")]
    #[token("~^")]
    #[token("^~")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("~")]
    #[token("!")]
    #[token("<")]
    #[token(">")]
    #[token("=")]
    #[token("?")]
    Operator,

    #[regex(r"[ \t\r]+")]
    Whitespace,
    #[token("\n")]
    Newline,

    /// Any byte sequence no other rule matched.
    Unknown,
}

/// Consume a block comment body after the opening `/*`.
///
/// Returns false (an error token) when the comment is unterminated, which the
/// lexer surfaces as a syntax error.
fn lex_block_comment(lex: &mut Lexer<TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            lex.bump(lex.remainder().len());
            false
        }
    }
}

impl TokenKind {
    /// Whitespace and newline tokens carry no lexical content.
    pub fn is_whitespace(&self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Newline)
    }

    /// Line and block comments.
    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Tokens that open a bracketed group.
    pub fn is_open_group(&self) -> bool {
        matches!(
            self,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace
        )
    }

    /// Tokens that close a bracketed group.
    pub fn is_close_group(&self) -> bool {
        matches!(
            self,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
        )
    }

    /// Identifier-shaped tokens, including keywords.
    pub fn is_identifier_like(&self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::Keyword
                | TokenKind::SystemIdentifier
                | TokenKind::EscapedIdentifier
        )
    }
}

/// A lexed token: a kind plus the byte range of its text in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub kind: TokenKind,
    pub range: Range<usize>,
}

impl TokenInfo {
    pub fn new(kind: TokenKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }

    /// The token's text, sliced from the source it was lexed from.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexing::tokenize;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_identifiers_and_keywords() {
        assert_eq!(
            kinds("module foo"),
            vec![TokenKind::Keyword, TokenKind::Whitespace, TokenKind::Identifier]
        );
    }

    #[test]
    fn test_based_literal_is_one_token() {
        let (tokens, errors) = tokenize("4'b0101");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Number);
    }

    #[test]
    fn test_multi_char_operators_win() {
        assert_eq!(kinds("<="), vec![TokenKind::Operator]);
        assert_eq!(kinds("==="), vec![TokenKind::Operator]);
        assert_eq!(kinds("::"), vec![TokenKind::ScopeColon]);
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let (tokens, errors) = tokenize("/* a\n b */");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::BlockComment);
        assert_eq!(tokens[0].range, 0..10);
    }

    #[test]
    fn test_unterminated_block_comment_reports_error() {
        let (_, errors) = tokenize("/* never closed");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_unknown_bytes_do_not_abort() {
        let (tokens, _) = tokenize("a \u{7f} b");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Unknown));
    }
}
