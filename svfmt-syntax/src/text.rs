//! Text structure: the bundle of views over one source file
//!
//! The formatter core consumes a [`TextStructure`]: the original contents, the
//! significant token stream (whitespace dropped, comments kept), the outline syntax
//! tree, and a line/column map, all built in one pass by [`TextStructure::from_source`].
//!
//! Byte offsets are the common currency between the views. Token ranges index into
//! `contents`, the line map translates offsets to line/column positions, and the
//! syntax tree refers to tokens by index into the significant stream.

use crate::lexing::tokenize;
use crate::syntax::{parse_source, SyntaxNode};
use crate::token::TokenInfo;
use std::fmt;
use std::ops::Range;

/// Maps byte offsets to line/column positions and lines to byte ranges.
///
/// Lines are 0-based internally; [`LineColumn`] displays 1-based, which is what
/// diagnostics print.
#[derive(Debug, Clone)]
pub struct LineColumnMap {
    line_starts: Vec<usize>,
    len: usize,
}

/// A 0-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

impl LineColumnMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// Number of lines, counting a trailing partial line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// The 0-based line containing `offset`.
    pub fn line_of_offset(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset) - 1
    }

    /// Byte offset where 0-based `line` starts; `len` when past the last line.
    pub fn line_start(&self, line: usize) -> usize {
        self.line_starts.get(line).copied().unwrap_or(self.len)
    }

    /// Byte range of 0-based `line`, including its newline if present.
    pub fn line_range(&self, line: usize) -> Range<usize> {
        self.line_start(line)..self.line_start(line + 1)
    }

    pub fn line_column(&self, offset: usize) -> LineColumn {
        let line = self.line_of_offset(offset);
        LineColumn {
            line,
            column: offset - self.line_starts[line],
        }
    }
}

/// Structural information about one source file: contents, significant tokens,
/// outline syntax tree, and line map.
#[derive(Debug, Clone)]
pub struct TextStructure {
    pub contents: String,
    /// Significant tokens only: whitespace and newlines dropped, comments kept.
    pub tokens: Vec<TokenInfo>,
    pub syntax_tree: SyntaxNode,
    pub line_map: LineColumnMap,
    /// Lexical error messages; non-empty means the input failed to lex cleanly.
    pub syntax_errors: Vec<String>,
}

impl TextStructure {
    pub fn from_source(source: &str) -> Self {
        let (raw_tokens, syntax_errors) = tokenize(source);
        let tokens: Vec<TokenInfo> = raw_tokens
            .into_iter()
            .filter(|t| !t.kind.is_whitespace())
            .collect();
        let line_map = LineColumnMap::new(source);
        let syntax_tree = parse_source(source, &tokens, &line_map);
        Self {
            contents: source.to_string(),
            tokens,
            syntax_tree,
            line_map,
            syntax_errors,
        }
    }

    /// The text of the token at `index`.
    pub fn token_text(&self, index: usize) -> &str {
        self.tokens[index].text(&self.contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;

    #[test]
    fn test_line_map_offsets() {
        let map = LineColumnMap::new("ab\ncd\n");
        assert_eq!(map.line_count(), 3);
        assert_eq!(map.line_of_offset(0), 0);
        assert_eq!(map.line_of_offset(2), 0);
        assert_eq!(map.line_of_offset(3), 1);
        assert_eq!(map.line_range(1), 3..6);
        assert_eq!(map.line_start(5), 6);
    }

    #[test]
    fn test_line_column_display_is_one_based() {
        let map = LineColumnMap::new("a\nbc\n");
        assert_eq!(map.line_column(3).to_string(), "2:2");
    }

    #[test]
    fn test_text_structure_filters_whitespace() {
        let structure = TextStructure::from_source("assign x = 1;\n");
        assert!(structure
            .tokens
            .iter()
            .all(|t| !t.kind.is_whitespace()));
        assert_eq!(structure.tokens[0].kind, TokenKind::Keyword);
        assert_eq!(structure.token_text(0), "assign");
    }

    #[test]
    fn test_token_ranges_are_monotonic() {
        let structure = TextStructure::from_source("module m;\nendmodule\n");
        for pair in structure.tokens.windows(2) {
            assert!(pair[0].range.end <= pair[1].range.start);
        }
    }
}
