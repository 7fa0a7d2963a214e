//! Token partition tree
//!
//!     A rose tree of unwrapped lines. Leaves carry formattable token ranges; interior
//!     nodes group them and carry the partition policy that decides expansion. The tree
//!     is built by the unwrapper, optionally reshaped for append-fitting packing, and
//!     then flattened into a worklist of independently searchable lines.
//!
//!     Structural invariants (checked by [`verify_tree`]): a parent's token range equals
//!     the concatenation of its children's ranges, sibling ranges are contiguous, and
//!     every leaf is non-empty. Violations are programmer errors; the driver asserts the
//!     invariants in debug builds.

use crate::format_token::PreFormatToken;
use crate::style::FormatStyle;
use crate::unwrapped_line::{fits_on_line, PartitionPolicy, UnwrappedLine};
use std::fmt;

/// One node of the token partition tree.
#[derive(Debug, Clone)]
pub struct PartitionNode {
    pub line: UnwrappedLine,
    pub children: Vec<PartitionNode>,
}

impl PartitionNode {
    pub fn leaf(line: UnwrappedLine) -> Self {
        Self {
            line,
            children: Vec::new(),
        }
    }

    pub fn interior(line: UnwrappedLine, children: Vec<PartitionNode>) -> Self {
        Self { line, children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Apply `f` to every node in pre-order.
    pub fn apply_pre_order_mut(&mut self, f: &mut impl FnMut(&mut PartitionNode)) {
        f(self);
        for child in &mut self.children {
            child.apply_pre_order_mut(f);
        }
    }
}

/// Check the range invariants over the whole tree.
pub fn verify_tree(node: &PartitionNode) -> Result<(), String> {
    if node.children.is_empty() {
        return Ok(());
    }
    let first = node.children.first().unwrap();
    let last = node.children.last().unwrap();
    if first.line.range.start != node.line.range.start || last.line.range.end != node.line.range.end
    {
        return Err(format!(
            "parent range {:?} != children span {:?}..{:?}",
            node.line.range, first.line.range.start, last.line.range.end
        ));
    }
    for pair in node.children.windows(2) {
        if pair[0].line.range.end != pair[1].line.range.start {
            return Err(format!(
                "sibling ranges not contiguous: {:?} then {:?}",
                pair[0].line.range, pair[1].line.range
            ));
        }
    }
    for child in &node.children {
        verify_tree(child)?;
    }
    Ok(())
}

/// Leaf partitions ranked by token count, largest first, at most `count` of them.
pub fn find_largest_partitions(root: &PartitionNode, count: usize) -> Vec<&PartitionNode> {
    let mut leaves = Vec::new();
    collect_leaves(root, &mut leaves);
    leaves.sort_by(|a, b| b.line.len().cmp(&a.line.len()));
    leaves.truncate(count);
    leaves
}

fn collect_leaves<'a>(node: &'a PartitionNode, out: &mut Vec<&'a PartitionNode>) {
    if node.is_leaf() {
        out.push(node);
    }
    for child in &node.children {
        collect_leaves(child, out);
    }
}

/// Reshape a node tagged `AppendFittingSubPartitions`.
///
/// Expects children `[head, argument-group]`. Leading arguments are packed onto
/// the head's line as long as they fit; the remainder forms further groups at a
/// continuation indent. Two packings are tried (append-first and wrap-first) and
/// the one producing fewer groups wins, preferring append-first on a tie. The
/// grouping preserves token order and total coverage.
pub fn reshape_fitting_subpartitions(
    node: &mut PartitionNode,
    ftokens: &[PreFormatToken],
    source: &str,
    style: &FormatStyle,
) {
    if node.children.len() != 2 || node.children[1].children.is_empty() {
        return;
    }

    let (appended, wrapped_first) = append_fitting_subpartitions(node, ftokens, source, style, false);
    let chosen = if wrapped_first {
        appended
    } else {
        let (wrapped, _) = append_fitting_subpartitions(node, ftokens, source, style, true);
        if appended.len() <= wrapped.len() {
            appended
        } else {
            wrapped
        }
    };

    node.children = chosen
        .into_iter()
        .map(|(mut line, children)| {
            // Groups should fit on a line; the expansion pass gets the final say.
            line.policy = PartitionPolicy::FitOnLineElseExpand;
            PartitionNode::interior(line, children)
        })
        .collect();
}

/// Greedily pack argument subpartitions after the head. Returns the groups and
/// whether the first argument had to wrap.
fn append_fitting_subpartitions(
    node: &PartitionNode,
    ftokens: &[PreFormatToken],
    source: &str,
    style: &FormatStyle,
    wrap_first_subpartition: bool,
) -> (Vec<(UnwrappedLine, Vec<PartitionNode>)>, bool) {
    let head = &node.children[0];
    let args = &node.children[1].children;

    let mut groups: Vec<(UnwrappedLine, Vec<PartitionNode>)> = Vec::new();
    let mut group_line = head.line.clone();
    let mut group_children = vec![head.clone()];

    // Continuation indent: under the first argument when it was appended,
    // one wrap level deeper when it had to wrap.
    let continuation_indent;

    let mut first_extended = group_line.clone();
    first_extended.span_up_to(args[0].line.range.end);
    let first_fits = fits_on_line(&first_extended, ftokens, source, style).fits;
    let wrapped_first = wrap_first_subpartition || !first_fits;
    if wrapped_first {
        continuation_indent = node.line.indentation_spaces + style.wrap_spaces;
        groups.push((group_line, group_children));
        group_line = args[0].line.clone();
        group_line.indentation_spaces = continuation_indent;
        group_children = vec![args[0].clone()];
    } else {
        continuation_indent = fits_on_line(&group_line, ftokens, source, style).final_column;
        group_line.span_up_to(args[0].line.range.end);
        group_children.push(args[0].clone());
    }

    for arg in &args[1..] {
        let mut candidate = group_line.clone();
        candidate.span_up_to(arg.line.range.end);
        if fits_on_line(&candidate, ftokens, source, style).fits {
            group_line = candidate;
            group_children.push(arg.clone());
        } else {
            groups.push((group_line, group_children));
            group_line = arg.line.clone();
            group_line.indentation_spaces = continuation_indent;
            group_children = vec![arg.clone()];
        }
    }
    groups.push((group_line, group_children));
    (groups, wrapped_first)
}

/// Human-readable dump of a partition tree, used by the diagnostic modes.
pub struct PartitionTreePrinter<'a> {
    pub root: &'a PartitionNode,
    pub ftokens: &'a [PreFormatToken],
    pub source: &'a str,
}

impl fmt::Display for PartitionTreePrinter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_node(f, self.root, 0)
    }
}

impl PartitionTreePrinter<'_> {
    fn print_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: &PartitionNode,
        depth: usize,
    ) -> fmt::Result {
        for _ in 0..depth {
            write!(f, "  ")?;
        }
        write!(f, "{{ ")?;
        for _ in 0..node.line.indentation_spaces {
            write!(f, ">")?;
        }
        write!(f, "[")?;
        for (position, index) in node.line.range.clone().enumerate() {
            if position > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", self.ftokens[index].text(self.source))?;
        }
        write!(f, "], policy: {}", policy_name(node.line.policy))?;
        if node.is_leaf() {
            writeln!(f, " }}")
        } else {
            writeln!(f)?;
            for child in &node.children {
                self.print_node(f, child, depth + 1)?;
            }
            for _ in 0..depth {
                write!(f, "  ")?;
            }
            writeln!(f, "}}")
        }
    }
}

fn policy_name(policy: PartitionPolicy) -> &'static str {
    match policy {
        PartitionPolicy::AlwaysExpand => "always-expand",
        PartitionPolicy::FitOnLineElseExpand => "fit-else-expand",
        PartitionPolicy::AppendFittingSubPartitions => "append-fitting-sub-partitions",
        PartitionPolicy::Inline => "inline",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_token::preformat_tokens;
    use svfmt_syntax::TextStructure;

    fn line(range: std::ops::Range<usize>, indent: usize) -> UnwrappedLine {
        UnwrappedLine::new(range, indent, PartitionPolicy::FitOnLineElseExpand)
    }

    #[test]
    fn test_verify_accepts_covering_children() {
        let tree = PartitionNode::interior(
            line(0..5, 0),
            vec![PartitionNode::leaf(line(0..2, 2)), PartitionNode::leaf(line(2..5, 2))],
        );
        assert!(verify_tree(&tree).is_ok());
    }

    #[test]
    fn test_verify_rejects_gap_between_siblings() {
        let tree = PartitionNode::interior(
            line(0..5, 0),
            vec![PartitionNode::leaf(line(0..2, 2)), PartitionNode::leaf(line(3..5, 2))],
        );
        assert!(verify_tree(&tree).is_err());
    }

    #[test]
    fn test_find_largest_partitions_ranks_leaves() {
        let tree = PartitionNode::interior(
            line(0..10, 0),
            vec![
                PartitionNode::leaf(line(0..7, 0)),
                PartitionNode::leaf(line(7..9, 0)),
                PartitionNode::leaf(line(9..10, 0)),
            ],
        );
        let largest = find_largest_partitions(&tree, 2);
        assert_eq!(largest.len(), 2);
        assert_eq!(largest[0].line.len(), 7);
        assert_eq!(largest[1].line.len(), 2);
    }

    #[test]
    fn test_reshape_packs_fitting_arguments() {
        // head `init(` then five arguments; narrow limit forces two groups.
        let source = "init(aaaa, bbbb, cccc, dddd, eeee);\n";
        let structure = TextStructure::from_source(source);
        let mut ftokens = preformat_tokens(&structure);
        for token in ftokens.iter_mut().skip(1) {
            token.before.spaces_required = 1;
        }
        // tokens: init ( aaaa , bbbb , cccc , dddd , eeee ) ;
        let head = PartitionNode::leaf(line(0..2, 0));
        let args = PartitionNode::interior(
            line(2..13, 0),
            vec![
                PartitionNode::leaf(line(2..4, 0)),
                PartitionNode::leaf(line(4..6, 0)),
                PartitionNode::leaf(line(6..8, 0)),
                PartitionNode::leaf(line(8..10, 0)),
                PartitionNode::leaf(line(10..13, 0)),
            ],
        );
        let mut node = PartitionNode::interior(
            UnwrappedLine::new(0..13, 0, PartitionPolicy::AppendFittingSubPartitions),
            vec![head, args],
        );
        let style = FormatStyle {
            column_limit: 20,
            ..FormatStyle::default()
        };
        reshape_fitting_subpartitions(&mut node, &ftokens, &structure.contents, &style);

        assert!(node.children.len() >= 2);
        assert!(verify_tree(&node).is_ok());
        // First group still starts with the head tokens.
        assert_eq!(node.children[0].line.range.start, 0);
        // Later groups sit at a continuation indent.
        assert!(node.children[1].line.indentation_spaces > 0);
    }
}
