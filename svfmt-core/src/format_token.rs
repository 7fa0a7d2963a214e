//! Format tokens: lexer tokens decorated with pre-formatting spacing metadata
//!
//!     A [`PreFormatToken`] wraps one significant token from the text structure with a
//!     mutable `before` record describing the spacing decision between it and its
//!     predecessor: minimum spaces, a break decision, a wrap penalty, and (for
//!     format-disabled regions) where preserved original whitespace begins.
//!
//!     The annotator populates `before` in place; after annotation the records are
//!     read-only for the wrap search.

use std::ops::Range;
use svfmt_syntax::{TextStructure, TokenKind};

/// The break decision for the space before one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpacingOptions {
    /// The wrap search may choose to append or wrap.
    #[default]
    Undecided,
    /// The token must stay on the same line as its predecessor.
    MustAppend,
    /// The token must start a new line.
    MustWrap,
    /// The original inter-token text is copied verbatim (format-disabled).
    Preserve,
}

/// Spacing metadata attached before one token.
#[derive(Debug, Clone, Default)]
pub struct InterTokenInfo {
    /// Minimum spaces between the previous token and this one when appended.
    pub spaces_required: usize,
    pub break_decision: SpacingOptions,
    /// Cost of wrapping before this token.
    pub break_penalty: i64,
    /// Byte offset where preserved whitespace starts, for `Preserve` tokens.
    pub preserved_space_start: Option<usize>,
}

/// One significant token plus its mutable before-spacing record.
#[derive(Debug, Clone)]
pub struct PreFormatToken {
    pub kind: TokenKind,
    pub range: Range<usize>,
    pub before: InterTokenInfo,
}

impl PreFormatToken {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range.clone()]
    }

    /// Rendered width of the token in columns.
    pub fn width(&self, source: &str) -> usize {
        self.text(source).chars().count()
    }
}

/// Wrap the text structure's significant tokens into format tokens with
/// default (unannotated) spacing records.
pub fn preformat_tokens(structure: &TextStructure) -> Vec<PreFormatToken> {
    structure
        .tokens
        .iter()
        .map(|token| PreFormatToken {
            kind: token.kind,
            range: token.range.clone(),
            before: InterTokenInfo::default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preformat_tokens_mirror_structure() {
        let structure = TextStructure::from_source("assign x = 1;\n");
        let ftokens = preformat_tokens(&structure);
        assert_eq!(ftokens.len(), structure.tokens.len());
        assert_eq!(ftokens[0].text(&structure.contents), "assign");
        assert_eq!(ftokens[0].before.break_decision, SpacingOptions::Undecided);
    }

    #[test]
    fn test_width_counts_chars() {
        let structure = TextStructure::from_source("assign x = 1;\n");
        let ftokens = preformat_tokens(&structure);
        assert_eq!(ftokens[0].width(&structure.contents), 6);
    }
}
