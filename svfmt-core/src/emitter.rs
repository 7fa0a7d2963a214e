//! Emission of formatted excerpts
//!
//!     Walks the formatted excerpts in order. The gap between two consecutive
//!     excerpts (and before the first and after the last) is re-derived from the
//!     original source bytes: fully enabled gaps collapse to one newline plus up to
//!     `max_blank_lines` preserved blank lines; gaps overlapping format-disabled
//!     ranges are split, with disabled sub-gaps copied byte-for-byte and enabled
//!     sub-gaps normalized.
//!
//!     An excerpt whose first token starts inside a disabled range suppresses its
//!     own indentation prefix, because the preserved bytes before it already supply
//!     the line's leading whitespace.

use crate::disabled_ranges::ByteOffsetSet;
use crate::style::FormatStyle;
use crate::unwrapped_line::FormattedExcerpt;
use std::ops::Range;
use svfmt_syntax::TextStructure;

/// Render the final output text.
pub fn emit(
    formatted_lines: &[FormattedExcerpt],
    structure: &TextStructure,
    disabled_ranges: &ByteOffsetSet,
    style: &FormatStyle,
) -> String {
    let source = structure.contents.as_str();
    let mut out = String::with_capacity(source.len() + source.len() / 8);
    let mut position = 0usize;
    let mut first = true;

    for line in formatted_lines {
        if line.tokens.is_empty() {
            continue;
        }
        let front = line.first_token_offset();
        let required = usize::from(!first);
        emit_gap(
            &mut out,
            source,
            disabled_ranges,
            style,
            position..front,
            required,
        );
        line.formatted_text(&mut out, source, !disabled_ranges.contains(front));
        position = line.last_token_end();
        first = false;
    }

    let required = usize::from(!first);
    emit_gap(
        &mut out,
        source,
        disabled_ranges,
        style,
        position..source.len(),
        required,
    );
    out
}

fn emit_gap(
    out: &mut String,
    source: &str,
    disabled_ranges: &ByteOffsetSet,
    style: &FormatStyle,
    gap: Range<usize>,
    required_newlines: usize,
) {
    if gap.is_empty() {
        // An empty junction inside a disabled range must not invent a newline.
        if !disabled_ranges.contains(gap.start) {
            push_newlines(out, required_newlines);
        }
        return;
    }

    let pieces = disabled_ranges.split_range(gap);
    let fully_enabled = pieces.iter().all(|(_, disabled)| !disabled);

    if fully_enabled {
        let count = count_newlines(&source[pieces[0].0.clone()]);
        let limit = style.max_blank_lines + required_newlines;
        push_newlines(out, count.clamp(required_newlines, limit));
        return;
    }

    for (range, disabled) in pieces {
        if disabled {
            out.push_str(&source[range]);
        } else {
            let count = count_newlines(&source[range]);
            push_newlines(out, count.min(style.max_blank_lines + 1));
        }
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

fn push_newlines(out: &mut String, count: usize) {
    for _ in 0..count {
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unwrapped_line::{FormattedToken, PreSpacing};

    fn excerpt(tokens: Vec<FormattedToken>, indent: usize) -> FormattedExcerpt {
        FormattedExcerpt {
            indentation_spaces: indent,
            tokens,
            completed_formatting: true,
        }
    }

    fn token(range: Range<usize>, before: PreSpacing) -> FormattedToken {
        FormattedToken { range, before }
    }

    #[test]
    fn test_single_newline_between_excerpts() {
        // "a;b;" with excerpts [a;][b;]: the empty enabled junction gets one newline.
        let structure = TextStructure::from_source("a;b;\n");
        let lines = vec![
            excerpt(
                vec![
                    token(0..1, PreSpacing::None),
                    token(1..2, PreSpacing::Spaces(0)),
                ],
                0,
            ),
            excerpt(
                vec![
                    token(2..3, PreSpacing::None),
                    token(3..4, PreSpacing::Spaces(0)),
                ],
                0,
            ),
        ];
        let output = emit(
            &lines,
            &structure,
            &ByteOffsetSet::new(),
            &FormatStyle::default(),
        );
        assert_eq!(output, "a;\nb;\n");
    }

    #[test]
    fn test_blank_lines_capped() {
        let structure = TextStructure::from_source("a;\n\n\n\n\nb;\n");
        let lines = vec![
            excerpt(
                vec![
                    token(0..1, PreSpacing::None),
                    token(1..2, PreSpacing::Spaces(0)),
                ],
                0,
            ),
            excerpt(
                vec![
                    token(7..8, PreSpacing::None),
                    token(8..9, PreSpacing::Spaces(0)),
                ],
                0,
            ),
        ];
        let output = emit(
            &lines,
            &structure,
            &ByteOffsetSet::new(),
            &FormatStyle::default(),
        );
        // max_blank_lines = 2: two blank lines plus the separating newline.
        assert_eq!(output, "a;\n\n\nb;\n");
    }

    #[test]
    fn test_disabled_gap_is_verbatim() {
        let source = "a;   \n\n\n  b;\n";
        let structure = TextStructure::from_source(source);
        let mut disabled = ByteOffsetSet::new();
        disabled.add(2, source.find("b;").unwrap());
        let lines = vec![
            excerpt(
                vec![
                    token(0..1, PreSpacing::None),
                    token(1..2, PreSpacing::Spaces(0)),
                ],
                0,
            ),
            excerpt(
                vec![
                    token(10..11, PreSpacing::None),
                    token(11..12, PreSpacing::Spaces(0)),
                ],
                0,
            ),
        ];
        let output = emit(&lines, &structure, &disabled, &FormatStyle::default());
        assert_eq!(output, "a;   \n\n\n  b;\n");
    }

    #[test]
    fn test_no_invented_newline_inside_disabled_junction() {
        // Two excerpts adjacent in the original, junction inside a disabled range.
        let source = "a;b;\n";
        let structure = TextStructure::from_source(source);
        let mut disabled = ByteOffsetSet::new();
        disabled.add(0, 4);
        let lines = vec![
            excerpt(
                vec![
                    token(0..1, PreSpacing::None),
                    token(1..2, PreSpacing::Preserved(1..1)),
                ],
                0,
            ),
            excerpt(
                vec![
                    token(2..3, PreSpacing::None),
                    token(3..4, PreSpacing::Preserved(3..3)),
                ],
                0,
            ),
        ];
        let output = emit(&lines, &structure, &disabled, &FormatStyle::default());
        assert_eq!(output, "a;b;\n");
    }
}
