//! Format-disabled byte ranges
//!
//!     Three sources can disable formatting over a byte interval of the input:
//!
//!         1. `// verilog_format: off` ... `// verilog_format: on` comment pairs.
//!         2. Style-gated syntactic regions (module port declaration lists when
//!            `format_module_port_declarations` is off).
//!         3. A caller-supplied set of enabled line ranges, whose complement is
//!            disabled.
//!
//!     The union of the three is a [`ByteOffsetSet`]. Tokens whose start offset falls
//!     inside the set have their break decision overwritten to `Preserve`, recording
//!     where the preserved original whitespace begins. `Preserve` wins over any
//!     decision the annotator made.

use crate::format_token::{PreFormatToken, SpacingOptions};
use crate::style::FormatStyle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use svfmt_syntax::{NonterminalKind, SyntaxNode, SyntaxUnit, TextStructure, TokenKind};

/// An ordered set of non-overlapping half-open byte intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteOffsetSet {
    intervals: Vec<(usize, usize)>,
}

impl ByteOffsetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Insert `[lo, hi)`, merging overlapping or touching intervals.
    pub fn add(&mut self, lo: usize, hi: usize) {
        if lo >= hi {
            return;
        }
        let mut merged = (lo, hi);
        let mut out = Vec::with_capacity(self.intervals.len() + 1);
        let mut placed = false;
        for &(start, end) in &self.intervals {
            if end < merged.0 {
                out.push((start, end));
            } else if start > merged.1 {
                if !placed {
                    out.push(merged);
                    placed = true;
                }
                out.push((start, end));
            } else {
                merged.0 = merged.0.min(start);
                merged.1 = merged.1.max(end);
            }
        }
        if !placed {
            out.push(merged);
        }
        self.intervals = out;
    }

    pub fn union(&mut self, other: &ByteOffsetSet) {
        for &(lo, hi) in &other.intervals {
            self.add(lo, hi);
        }
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.intervals
            .iter()
            .any(|&(lo, hi)| lo <= offset && offset < hi)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.intervals.iter().copied()
    }

    /// Split `gap` into maximal sub-ranges, each flagged disabled or enabled,
    /// in order and covering `gap` exactly.
    pub fn split_range(&self, gap: Range<usize>) -> Vec<(Range<usize>, bool)> {
        let mut pieces = Vec::new();
        let mut cursor = gap.start;
        for &(lo, hi) in &self.intervals {
            if hi <= cursor {
                continue;
            }
            if lo >= gap.end {
                break;
            }
            let lo = lo.max(cursor);
            let hi = hi.min(gap.end);
            if lo > cursor {
                pieces.push((cursor..lo, false));
            }
            pieces.push((lo..hi, true));
            cursor = hi;
        }
        if cursor < gap.end {
            pieces.push((cursor..gap.end, false));
        }
        pieces
    }
}

/// A sorted set of 1-based line intervals (inclusive lo, exclusive hi).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineNumberSet {
    ranges: Vec<(usize, usize)>,
}

impl LineNumberSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn add(&mut self, lo: usize, hi: usize) {
        if lo >= hi {
            return;
        }
        self.ranges.push((lo, hi));
        self.ranges.sort_unstable();
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.ranges.iter().copied()
    }
}

static DIRECTIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"verilog_format:\s*(off|on)\b").expect("directive pattern"));

/// Scan line comments for `verilog_format: off`/`on` pairs.
///
/// An `off` opens an interval at the byte offset just past the directive line's
/// newline; `on` closes it at the directive's start; an unclosed interval runs
/// to end of file.
pub fn disable_formatting_ranges(structure: &TextStructure) -> ByteOffsetSet {
    let mut set = ByteOffsetSet::new();
    let mut open: Option<usize> = None;

    for token in &structure.tokens {
        if token.kind != TokenKind::LineComment {
            continue;
        }
        let text = token.text(&structure.contents);
        let Some(captures) = DIRECTIVE.captures(text) else {
            continue;
        };
        match &captures[1] {
            "off" if open.is_none() => {
                let line = structure.line_map.line_of_offset(token.range.start);
                open = Some(structure.line_map.line_range(line).end);
            }
            "on" => {
                if let Some(lo) = open.take() {
                    set.add(lo, token.range.start);
                }
            }
            _ => {}
        }
    }
    if let Some(lo) = open {
        set.add(lo, structure.contents.len());
    }
    set
}

/// Byte ranges of syntactic regions the style excludes from formatting.
///
/// A region covers `[first_token.lo, last_token.hi)` exactly, so every token of
/// the region (the first one included) preserves its original spacing.
pub fn style_disabled_ranges(structure: &TextStructure, style: &FormatStyle) -> ByteOffsetSet {
    let mut set = ByteOffsetSet::new();
    if !style.format_module_port_declarations {
        collect_port_list_ranges(&structure.syntax_tree, structure, &mut set);
    }
    set
}

fn collect_port_list_ranges(node: &SyntaxNode, structure: &TextStructure, set: &mut ByteOffsetSet) {
    if node.tag == NonterminalKind::PortDeclarationList {
        if let Some(span) = node.token_span() {
            let lo = structure.tokens[span.start].range.start;
            let hi = structure.tokens[span.end - 1].range.end;
            set.add(lo, hi);
        }
    }
    for child in &node.children {
        if let SyntaxUnit::Node(child) = child {
            collect_port_list_ranges(child, structure, set);
        }
    }
}

/// Convert caller-enabled line ranges into the disabled byte-range complement.
/// An empty set means all lines are enabled and nothing is disabled.
pub fn enabled_lines_to_disabled_byte_ranges(
    lines: &LineNumberSet,
    structure: &TextStructure,
) -> ByteOffsetSet {
    let mut set = ByteOffsetSet::new();
    if lines.is_empty() {
        return set;
    }
    let len = structure.contents.len();
    let mut cursor = 0usize;
    for (lo, hi) in lines.iter() {
        // 1-based line lo starts the enabled region; hi is exclusive.
        let enabled_start = structure.line_map.line_start(lo.saturating_sub(1));
        let enabled_end = structure.line_map.line_start(hi.saturating_sub(1));
        set.add(cursor, enabled_start);
        cursor = cursor.max(enabled_end);
    }
    set.add(cursor, len);
    set
}

/// Mark tokens inside disabled ranges as preserving their original spacing.
///
/// When a disabled range begins right after a `//` comment, the preserved
/// whitespace start is advanced past the comment's trailing newline, which the
/// emitter prints itself.
pub fn preserve_spaces_on_disabled_token_ranges(
    ftokens: &mut [PreFormatToken],
    disabled_ranges: &ByteOffsetSet,
    structure: &TextStructure,
) {
    let mut search_from = 0usize;
    for (lo, hi) in disabled_ranges.iter() {
        let begin = ftokens[search_from..]
            .iter()
            .position(|t| t.range.start >= lo)
            .map(|p| search_from + p)
            .unwrap_or(ftokens.len());
        let mut end = begin;
        while end < ftokens.len() && ftokens[end].range.start < hi {
            end += 1;
        }

        for index in begin..end {
            let preserved_from = if index == 0 {
                0
            } else {
                ftokens[index - 1].range.end
            };
            let token = &mut ftokens[index];
            token.before.break_decision = SpacingOptions::Preserve;
            token.before.preserved_space_start = Some(preserved_from);
        }

        if begin < end && begin > 0 && ftokens[begin - 1].kind == TokenKind::LineComment {
            // Skip the comment's trailing newline; Emit prints that newline.
            if let Some(start) = ftokens[begin].before.preserved_space_start.as_mut() {
                if structure.contents[*start..].starts_with('\n') {
                    *start += 1;
                }
            }
        }
        search_from = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_token::preformat_tokens;

    #[test]
    fn test_add_merges_overlaps() {
        let mut set = ByteOffsetSet::new();
        set.add(10, 20);
        set.add(30, 40);
        set.add(15, 35);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![(10, 40)]);
    }

    #[test]
    fn test_contains_half_open() {
        let mut set = ByteOffsetSet::new();
        set.add(5, 8);
        assert!(!set.contains(4));
        assert!(set.contains(5));
        assert!(set.contains(7));
        assert!(!set.contains(8));
    }

    #[test]
    fn test_split_range_orders_pieces() {
        let mut set = ByteOffsetSet::new();
        set.add(5, 8);
        set.add(12, 14);
        let pieces = set.split_range(0..20);
        assert_eq!(
            pieces,
            vec![
                (0..5, false),
                (5..8, true),
                (8..12, false),
                (12..14, true),
                (14..20, false),
            ]
        );
    }

    #[test]
    fn test_comment_directives_define_range() {
        let source = "a = 1;\n// verilog_format: off\nb   =   2;\n// verilog_format: on\nc = 3;\n";
        let structure = TextStructure::from_source(source);
        let set = disable_formatting_ranges(&structure);
        let ranges: Vec<_> = set.iter().collect();
        assert_eq!(ranges.len(), 1);
        let (lo, hi) = ranges[0];
        // Opens after the off-directive's newline, closes at the on-directive.
        assert_eq!(&source[lo..hi], "b   =   2;\n");
    }

    #[test]
    fn test_unclosed_off_extends_to_eof() {
        let source = "a = 1;\n// verilog_format: off\nb  = 2;\n";
        let structure = TextStructure::from_source(source);
        let set = disable_formatting_ranges(&structure);
        let ranges: Vec<_> = set.iter().collect();
        assert_eq!(ranges, vec![(source.find("b ").unwrap(), source.len())]);
    }

    #[test]
    fn test_port_list_range_when_style_disables() {
        let source = "module m(input a, input b);\nendmodule\n";
        let structure = TextStructure::from_source(source);
        let style = FormatStyle {
            format_module_port_declarations: false,
            ..FormatStyle::default()
        };
        let set = style_disabled_ranges(&structure, &style);
        let ranges: Vec<_> = set.iter().collect();
        assert_eq!(ranges.len(), 1);
        let ports_start = source.find("input").unwrap();
        assert_eq!(ranges[0], (ports_start, source.find(')').unwrap()));
    }

    #[test]
    fn test_enabled_lines_complement() {
        let source = "a = 1;\nb = 2;\nc = 3;\n";
        let structure = TextStructure::from_source(source);
        let mut lines = LineNumberSet::new();
        lines.add(2, 3); // only line 2 enabled
        let set = enabled_lines_to_disabled_byte_ranges(&lines, &structure);
        assert!(set.contains(0)); // line 1 disabled
        assert!(!set.contains(source.find("b").unwrap()));
        assert!(set.contains(source.find("c").unwrap()));
    }

    #[test]
    fn test_preserve_marks_tokens_and_records_space_start() {
        let source = "a = 1;\n// verilog_format: off\nb   =   2;\n// verilog_format: on\n";
        let structure = TextStructure::from_source(source);
        let mut ftokens = preformat_tokens(&structure);
        let set = disable_formatting_ranges(&structure);
        preserve_spaces_on_disabled_token_ranges(&mut ftokens, &set, &structure);

        let b_index = ftokens
            .iter()
            .position(|t| t.text(source) == "b")
            .unwrap();
        assert_eq!(
            ftokens[b_index].before.break_decision,
            SpacingOptions::Preserve
        );
        // Preceding token is the off-comment: preserved space skips its newline.
        let start = ftokens[b_index].before.preserved_space_start.unwrap();
        assert!(!structure.contents[start..].starts_with('\n'));
        // The `=` inside the range preserves the triple space before it.
        let eq_index = b_index + 1;
        let eq_start = ftokens[eq_index].before.preserved_space_start.unwrap();
        assert_eq!(
            &source[eq_start..ftokens[eq_index].range.start],
            "   "
        );
    }
}
