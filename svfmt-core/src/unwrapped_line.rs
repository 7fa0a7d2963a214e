//! Unwrapped lines and formatted excerpts
//!
//!     An unwrapped line is a contiguous range of format tokens considered as one
//!     wrap-search problem, together with its indentation and a partition policy that
//!     tells the layout stage whether the node it came from prefers to stay on one
//!     line or expand into its children.
//!
//!     A formatted excerpt is the search's answer for one unwrapped line: a concrete
//!     pre-whitespace decision for every token.

use crate::format_token::{PreFormatToken, SpacingOptions};
use crate::style::FormatStyle;
use std::ops::Range;

/// How an interior partition decides between staying collapsed and expanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionPolicy {
    /// Expand whenever there are two or more children.
    AlwaysExpand,
    /// Stay on one line if the concatenation fits within the column limit.
    FitOnLineElseExpand,
    /// Pack leading children onto the head's line, reshaping into groups.
    AppendFittingSubPartitions,
    /// Grouping-only node introduced by reshaping; fits-else-expand semantics.
    Inline,
}

/// A contiguous range of format tokens formatted as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnwrappedLine {
    /// Indices into the format-token sequence, half-open.
    pub range: Range<usize>,
    pub indentation_spaces: usize,
    pub policy: PartitionPolicy,
}

impl UnwrappedLine {
    pub fn new(range: Range<usize>, indentation_spaces: usize, policy: PartitionPolicy) -> Self {
        Self {
            range,
            indentation_spaces,
            policy,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Extend the upper bound of the token range.
    pub fn span_up_to(&mut self, end: usize) {
        debug_assert!(end >= self.range.end);
        self.range.end = end;
    }
}

/// Result of measuring an unwrapped line against the column limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitsResult {
    pub fits: bool,
    /// Column after the last token when everything is appended.
    pub final_column: usize,
}

/// Measure whether the line's tokens, all appended, stay within the column limit.
///
/// A `MustWrap` token or preserved spacing containing a newline means the line
/// cannot be rendered flat at all.
pub fn fits_on_line(
    line: &UnwrappedLine,
    ftokens: &[PreFormatToken],
    source: &str,
    style: &FormatStyle,
) -> FitsResult {
    let mut column = line.indentation_spaces;
    for (position, index) in line.range.clone().enumerate() {
        let token = &ftokens[index];
        if position > 0 {
            match token.before.break_decision {
                SpacingOptions::MustWrap => {
                    return FitsResult {
                        fits: false,
                        final_column: column,
                    }
                }
                SpacingOptions::Preserve => {
                    let start = token
                        .before
                        .preserved_space_start
                        .unwrap_or(token.range.start);
                    let preserved = &source[start..token.range.start];
                    if preserved.contains('\n') {
                        return FitsResult {
                            fits: false,
                            final_column: column,
                        };
                    }
                    column += preserved.chars().count();
                }
                _ => column += token.before.spaces_required,
            }
        }
        column += token.width(source);
    }
    FitsResult {
        fits: column <= style.column_limit,
        final_column: column,
    }
}

/// The concrete whitespace emitted before one token of a formatted excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreSpacing {
    /// First token of the excerpt; indentation is handled by the excerpt.
    None,
    Spaces(usize),
    /// A line break followed by this many spaces.
    NewlineIndent(usize),
    /// Copy this byte range of the original source verbatim.
    Preserved(Range<usize>),
}

/// One token of a formatted excerpt: its source range plus decided pre-whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedToken {
    pub range: Range<usize>,
    pub before: PreSpacing,
}

/// The output of wrap search for one unwrapped line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedExcerpt {
    pub indentation_spaces: usize,
    pub tokens: Vec<FormattedToken>,
    /// False when the search hit its state budget and the layout is best-effort.
    pub completed_formatting: bool,
}

impl FormattedExcerpt {
    /// Byte offset of the excerpt's first token in the original source.
    pub fn first_token_offset(&self) -> usize {
        self.tokens.first().map(|t| t.range.start).unwrap_or(0)
    }

    /// Byte offset just past the excerpt's last token.
    pub fn last_token_end(&self) -> usize {
        self.tokens.last().map(|t| t.range.end).unwrap_or(0)
    }

    /// Append the rendered excerpt to `out`. When `indent` is false the leading
    /// indentation prefix is suppressed (the caller has already emitted
    /// preserved text that supplies it).
    pub fn formatted_text(&self, out: &mut String, source: &str, indent: bool) {
        debug_assert!(!self.tokens.is_empty());
        if indent {
            for _ in 0..self.indentation_spaces {
                out.push(' ');
            }
        }
        for token in &self.tokens {
            match &token.before {
                PreSpacing::None => {}
                PreSpacing::Spaces(count) => {
                    for _ in 0..*count {
                        out.push(' ');
                    }
                }
                PreSpacing::NewlineIndent(indent) => {
                    out.push('\n');
                    for _ in 0..*indent {
                        out.push(' ');
                    }
                }
                PreSpacing::Preserved(range) => out.push_str(&source[range.clone()]),
            }
            out.push_str(&source[token.range.clone()]);
        }
    }

    /// Render the excerpt as a standalone string, with indentation.
    pub fn render(&self, source: &str) -> String {
        let mut out = String::new();
        self.formatted_text(&mut out, source, true);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_token::preformat_tokens;
    use svfmt_syntax::TextStructure;

    fn setup(source: &str) -> (TextStructure, Vec<PreFormatToken>) {
        let structure = TextStructure::from_source(source);
        let mut ftokens = preformat_tokens(&structure);
        // Single spaces everywhere, as a stand-in for annotation.
        for token in ftokens.iter_mut().skip(1) {
            token.before.spaces_required = 1;
        }
        (structure, ftokens)
    }

    #[test]
    fn test_fits_on_line_measures_appended_width() {
        let (structure, ftokens) = setup("assign x = 1;\n");
        let line = UnwrappedLine::new(0..ftokens.len(), 2, PartitionPolicy::FitOnLineElseExpand);
        let result = fits_on_line(&line, &ftokens, &structure.contents, &FormatStyle::default());
        assert!(result.fits);
        // "  assign x = 1 ;" appended with single spaces.
        assert_eq!(result.final_column, 2 + "assign x = 1 ;".len());
    }

    #[test]
    fn test_must_wrap_never_fits() {
        let (structure, mut ftokens) = setup("assign x = 1;\n");
        ftokens[2].before.break_decision = SpacingOptions::MustWrap;
        let line = UnwrappedLine::new(0..ftokens.len(), 0, PartitionPolicy::FitOnLineElseExpand);
        let result = fits_on_line(&line, &ftokens, &structure.contents, &FormatStyle::default());
        assert!(!result.fits);
    }

    #[test]
    fn test_excerpt_renders_spacing_decisions() {
        let excerpt = FormattedExcerpt {
            indentation_spaces: 2,
            tokens: vec![
                FormattedToken {
                    range: 0..6,
                    before: PreSpacing::None,
                },
                FormattedToken {
                    range: 7..8,
                    before: PreSpacing::Spaces(1),
                },
                FormattedToken {
                    range: 9..10,
                    before: PreSpacing::NewlineIndent(6),
                },
            ],
            completed_formatting: true,
        };
        assert_eq!(excerpt.render("assign x = 1;\n"), "  assign x\n      =");
    }
}
