//! The formatting driver
//!
//!     Wires the pipeline together: annotate spacing, resolve format-disabled
//!     ranges, partition into the token tree, reshape append-fitting nodes, decide
//!     expansion, wrap-search each unwrapped line, emit, and verify. The stages
//!     mutate the format tokens only up through disabled-range resolution; the
//!     search reads them immutably, line by line, writing results into an ordered
//!     buffer.
//!
//!     Cancellation is cooperative: the flag in [`ExecutionControl`] is checked at
//!     every search-state expansion and between unwrapped lines, and no partial
//!     output is produced on cancel.

use crate::annotate::annotate_formatting_information;
use crate::disabled_ranges::{
    disable_formatting_ranges, enabled_lines_to_disabled_byte_ranges,
    preserve_spaces_on_disabled_token_ranges, style_disabled_ranges, LineNumberSet,
};
use crate::emitter::emit;
use crate::error::FormatError;
use crate::format_token::{preformat_tokens, PreFormatToken};
use crate::partition_tree::{
    find_largest_partitions, reshape_fitting_subpartitions, verify_tree, PartitionNode,
    PartitionTreePrinter,
};
use crate::style::FormatStyle;
use crate::tree_unwrapper::unwrap_partitions;
use crate::unwrapped_line::{fits_on_line, FormattedExcerpt, PartitionPolicy, UnwrappedLine};
use crate::verify::verify_formatting;
use crate::wrap_search::search_line_wraps;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use svfmt_syntax::TextStructure;

/// Diagnostic and resource knobs for one format invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionControl {
    /// Wrap-search state budget per unwrapped line; 0 means the default.
    pub max_search_states: usize,
    /// Dump the token partition tree to the diagnostic stream.
    pub show_token_partition_tree: bool,
    /// Print the N largest leaf partitions; 0 disables.
    pub show_largest_token_partitions: usize,
    /// Report lines with more than one equally optimal wrapping.
    pub show_equally_optimal_wrappings: bool,
    /// Stop (with a `Cancelled` result) after emitting diagnostics.
    pub any_stop: bool,
    /// Cooperative cancellation flag, checked during the search.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Default wrap-search state budget.
pub const DEFAULT_MAX_SEARCH_STATES: usize = 100_000;

impl ExecutionControl {
    pub fn max_search_states(&self) -> usize {
        if self.max_search_states == 0 {
            DEFAULT_MAX_SEARCH_STATES
        } else {
            self.max_search_states
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Format SystemVerilog source text with default control and no diagnostics.
pub fn format_source(text: &str, style: &FormatStyle) -> Result<String, FormatError> {
    format(
        text,
        style,
        &LineNumberSet::new(),
        &ExecutionControl::default(),
        &mut std::io::sink(),
    )
}

/// Format SystemVerilog source text.
///
/// `enabled_lines` restricts formatting to those 1-based line ranges (empty
/// means everything). Diagnostics requested through `control` go to
/// `diagnostics`.
pub fn format(
    text: &str,
    style: &FormatStyle,
    enabled_lines: &LineNumberSet,
    control: &ExecutionControl,
    diagnostics: &mut dyn Write,
) -> Result<String, FormatError> {
    let structure = TextStructure::from_source(text);
    if !structure.syntax_errors.is_empty() {
        let mut messages = structure.syntax_errors.clone();
        messages.truncate(3);
        return Err(FormatError::InvalidInput(messages));
    }

    let mut ftokens = preformat_tokens(&structure);
    annotate_formatting_information(style, &structure, &mut ftokens);

    let mut disabled_ranges = enabled_lines_to_disabled_byte_ranges(enabled_lines, &structure);
    disabled_ranges.union(&disable_formatting_ranges(&structure));
    disabled_ranges.union(&style_disabled_ranges(&structure, style));
    preserve_spaces_on_disabled_token_ranges(&mut ftokens, &disabled_ranges, &structure);

    let mut partitions = unwrap_partitions(&structure, &ftokens, style);
    debug_assert_eq!(verify_tree(&partitions), Ok(()));

    partitions.apply_pre_order_mut(&mut |node: &mut PartitionNode| {
        if node.line.policy == PartitionPolicy::AppendFittingSubPartitions {
            reshape_fitting_subpartitions(node, &ftokens, &structure.contents, style);
        }
    });
    debug_assert_eq!(verify_tree(&partitions), Ok(()));

    if control.show_token_partition_tree {
        let printer = PartitionTreePrinter {
            root: &partitions,
            ftokens: &ftokens,
            source: &structure.contents,
        };
        let _ = writeln!(diagnostics, "Full token partition tree:\n{}", printer);
    }
    if control.show_largest_token_partitions > 0 {
        print_largest_partitions(
            diagnostics,
            &partitions,
            control.show_largest_token_partitions,
            &structure,
            &ftokens,
        );
    }
    if control.any_stop {
        return Err(FormatError::Cancelled(
            "halting for diagnostic operation".to_string(),
        ));
    }

    let worklist = make_unwrapped_lines_worklist(&partitions, &ftokens, &structure.contents, style);

    let mut formatted_lines: Vec<FormattedExcerpt> = Vec::with_capacity(worklist.len());
    let mut incomplete: Vec<&UnwrappedLine> = Vec::new();
    for line in &worklist {
        if control.cancelled() {
            return Err(FormatError::Cancelled("external cancellation".to_string()));
        }
        let solutions = search_line_wraps(
            line,
            &ftokens,
            &structure.contents,
            style,
            control.max_search_states(),
            control.cancel.as_deref(),
        )
        .map_err(|_| FormatError::Cancelled("external cancellation".to_string()))?;
        if control.show_equally_optimal_wrappings && solutions.len() > 1 {
            display_equally_optimal_wrappings(diagnostics, &structure.contents, &solutions);
        }
        let chosen = solutions.into_iter().next().expect("search returns a solution");
        if !chosen.completed_formatting {
            incomplete.push(line);
        }
        formatted_lines.push(chosen);
    }

    let output = emit(&formatted_lines, &structure, &disabled_ranges, style);
    verify_formatting(&structure, &output)?;

    if !incomplete.is_empty() {
        let mut detail = String::from("some token partitions did not finish within the budget:");
        for line in &incomplete {
            detail.push_str(&format!(
                " [tokens {}..{}]",
                line.range.start, line.range.end
            ));
        }
        return Err(FormatError::ResourceExhausted {
            formatted_text: output,
            detail,
        });
    }
    Ok(output)
}

/// Flatten the partition tree into independently searchable unwrapped lines.
///
/// Post-order expansion: a leaf is unexpanded; a node with an expanded child is
/// expanded; otherwise the partition policy and a fit check decide. The
/// returned lines are the unexpanded frontier, with empty partitions dropped.
fn make_unwrapped_lines_worklist(
    root: &PartitionNode,
    ftokens: &[PreFormatToken],
    source: &str,
    style: &FormatStyle,
) -> Vec<UnwrappedLine> {
    let (_, mut lines) = expand_or_collect(root, ftokens, source, style);
    lines.retain(|line| !line.is_empty());
    lines
}

fn expand_or_collect(
    node: &PartitionNode,
    ftokens: &[PreFormatToken],
    source: &str,
    style: &FormatStyle,
) -> (bool, Vec<UnwrappedLine>) {
    if node.is_leaf() {
        return (false, vec![node.line.clone()]);
    }

    let mut any_child_expanded = false;
    let mut collected: Vec<Vec<UnwrappedLine>> = Vec::with_capacity(node.children.len());
    for child in &node.children {
        let (expanded, lines) = expand_or_collect(child, ftokens, source, style);
        any_child_expanded |= expanded;
        collected.push(lines);
    }

    let expanded = any_child_expanded
        || match node.line.policy {
            PartitionPolicy::AlwaysExpand => node.children.len() > 1,
            PartitionPolicy::FitOnLineElseExpand
            | PartitionPolicy::Inline
            | PartitionPolicy::AppendFittingSubPartitions => {
                !fits_on_line(&node.line, ftokens, source, style).fits
            }
        };

    if expanded {
        (true, collected.into_iter().flatten().collect())
    } else {
        (false, vec![node.line.clone()])
    }
}

fn print_largest_partitions(
    out: &mut dyn Write,
    partitions: &PartitionNode,
    count: usize,
    structure: &TextStructure,
    ftokens: &[PreFormatToken],
) {
    let _ = writeln!(out, "Showing the {} largest (leaf) token partitions:", count);
    for leaf in find_largest_partitions(partitions, count) {
        let origin = structure
            .line_map
            .line_column(ftokens[leaf.line.range.start].range.start);
        let text: Vec<&str> = leaf
            .line
            .range
            .clone()
            .map(|i| ftokens[i].text(&structure.contents))
            .collect();
        let _ = writeln!(
            out,
            "[{} tokens, starting at line:col {}]: [{}]",
            leaf.line.len(),
            origin,
            text.join(" ")
        );
    }
}

fn display_equally_optimal_wrappings(
    out: &mut dyn Write,
    source: &str,
    solutions: &[FormattedExcerpt],
) {
    let _ = writeln!(out, "Found {} equally good wrappings:", solutions.len());
    for solution in solutions {
        let _ = writeln!(out, "============================");
        let _ = writeln!(out, "{}", solution.render(source));
    }
    let _ = writeln!(out, "============================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worklist_covers_token_stream() {
        let source = "module m(input a,input b);endmodule\n";
        let structure = TextStructure::from_source(source);
        let style = FormatStyle::default();
        let mut ftokens = preformat_tokens(&structure);
        annotate_formatting_information(&style, &structure, &mut ftokens);
        let tree = unwrap_partitions(&structure, &ftokens, &style);
        let worklist = make_unwrapped_lines_worklist(&tree, &ftokens, source, &style);

        let mut cursor = 0;
        for line in &worklist {
            assert_eq!(line.range.start, cursor);
            cursor = line.range.end;
        }
        assert_eq!(cursor, ftokens.len());
    }

    #[test]
    fn test_fitting_statement_collapses() {
        let source = "assign x = a + b;\n";
        let structure = TextStructure::from_source(source);
        let style = FormatStyle::default();
        let mut ftokens = preformat_tokens(&structure);
        annotate_formatting_information(&style, &structure, &mut ftokens);
        let tree = unwrap_partitions(&structure, &ftokens, &style);
        let worklist = make_unwrapped_lines_worklist(&tree, &ftokens, source, &style);
        assert_eq!(worklist.len(), 1);
    }

    #[test]
    fn test_any_stop_returns_cancelled() {
        let control = ExecutionControl {
            show_token_partition_tree: true,
            any_stop: true,
            ..ExecutionControl::default()
        };
        let mut diagnostics = Vec::new();
        let result = format(
            "assign x = 1;\n",
            &FormatStyle::default(),
            &LineNumberSet::new(),
            &control,
            &mut diagnostics,
        );
        assert!(matches!(result, Err(FormatError::Cancelled(_))));
        let dump = String::from_utf8(diagnostics).unwrap();
        assert!(dump.contains("Full token partition tree"));
    }

    #[test]
    fn test_invalid_input_is_refused() {
        let result = format_source("assign x = 1; /* unterminated\n", &FormatStyle::default());
        assert!(matches!(result, Err(FormatError::InvalidInput(_))));
    }
}
