//! Tree unwrapper: outline syntax tree to token partition tree
//!
//!     Converts each syntactic construct into its canonical partitioning:
//!
//!         container bodies (modules, packages, classes, functions, tasks)
//!             always expand into header, items (one indent level deeper), and
//!             closing-keyword partitions;
//!         module headers with ports
//!             expand into the `module name (` prefix, one partition per port at
//!             the wrap indent, and the `);` tail;
//!         statements
//!             become single fit-else-expand leaves, except calls with argument
//!             lists, which become append-fitting nodes of head plus arguments;
//!         if/else, case, loops, and procedural blocks
//!             fold their headers onto `begin` lines and expand per branch, with
//!             case items one level deeper.
//!
//!     The produced tree covers the token stream exactly; trailing empty partitions
//!     are the worklist builder's problem.

use crate::format_token::PreFormatToken;
use crate::partition_tree::PartitionNode;
use crate::style::FormatStyle;
use crate::unwrapped_line::{PartitionPolicy, UnwrappedLine};
use std::ops::Range;
use svfmt_syntax::{NonterminalKind, SyntaxNode, SyntaxUnit, TextStructure, TokenKind};

/// Partition the whole token stream according to the syntax tree.
pub fn unwrap_partitions(
    structure: &TextStructure,
    ftokens: &[PreFormatToken],
    style: &FormatStyle,
) -> PartitionNode {
    let unwrapper = TreeUnwrapper { structure, style };
    let children: Vec<PartitionNode> = structure
        .syntax_tree
        .children
        .iter()
        .filter_map(|child| match child {
            SyntaxUnit::Node(node) => Some(unwrapper.unwrap_item(node, 0)),
            SyntaxUnit::Token(index) => Some(PartitionNode::leaf(UnwrappedLine::new(
                *index..index + 1,
                0,
                PartitionPolicy::FitOnLineElseExpand,
            ))),
        })
        .collect();
    PartitionNode::interior(
        UnwrappedLine::new(0..ftokens.len(), 0, PartitionPolicy::AlwaysExpand),
        children,
    )
}

struct TreeUnwrapper<'a> {
    structure: &'a TextStructure,
    style: &'a FormatStyle,
}

impl TreeUnwrapper<'_> {
    fn leaf(&self, range: Range<usize>, indent: usize) -> PartitionNode {
        PartitionNode::leaf(UnwrappedLine::new(
            range,
            indent,
            PartitionPolicy::FitOnLineElseExpand,
        ))
    }

    /// Wrap sibling partitions into one node, collapsing the trivial case.
    fn group(
        &self,
        parts: Vec<PartitionNode>,
        indent: usize,
        policy: PartitionPolicy,
    ) -> PartitionNode {
        debug_assert!(!parts.is_empty());
        if parts.len() == 1 {
            return parts.into_iter().next().unwrap();
        }
        let range = parts.first().unwrap().line.range.start..parts.last().unwrap().line.range.end;
        PartitionNode::interior(UnwrappedLine::new(range, indent, policy), parts)
    }

    fn unwrap_item(&self, node: &SyntaxNode, indent: usize) -> PartitionNode {
        match node.tag {
            NonterminalKind::ModuleDeclaration
            | NonterminalKind::PackageDeclaration
            | NonterminalKind::ClassDeclaration
            | NonterminalKind::FunctionDeclaration
            | NonterminalKind::TaskDeclaration => self.unwrap_container(node, indent),
            NonterminalKind::ModuleHeader => self.unwrap_module_header(node, indent),
            NonterminalKind::PreprocessorDirective => {
                // Directives carry column-zero intent regardless of scope.
                let span = node.token_span().expect("directive has tokens");
                self.leaf(span, 0)
            }
            NonterminalKind::CommentLine => {
                let span = node.token_span().expect("comment has a token");
                self.leaf(span, indent)
            }
            _ => {
                let parts = self.unwrap_flow(node, indent, None);
                self.group(parts, indent, PartitionPolicy::AlwaysExpand)
            }
        }
    }

    /// Containers: header, indented items, closing-keyword line.
    fn unwrap_container(&self, node: &SyntaxNode, indent: usize) -> PartitionNode {
        let step = self.style.indentation_spaces;
        let mut parts: Vec<PartitionNode> = Vec::new();
        let mut trailing: Option<Range<usize>> = None;

        for (position, child) in node.children.iter().enumerate() {
            match child {
                SyntaxUnit::Node(sub) if position == 0 => {
                    parts.push(self.unwrap_item(sub, indent));
                }
                SyntaxUnit::Node(sub) => {
                    if let Some(run) = trailing.take() {
                        parts.push(self.leaf(run, indent));
                    }
                    parts.push(self.unwrap_item(sub, indent + step));
                }
                SyntaxUnit::Token(index) => match &mut trailing {
                    Some(run) => run.end = index + 1,
                    None => trailing = Some(*index..index + 1),
                },
            }
        }
        if let Some(run) = trailing {
            parts.push(self.leaf(run, indent));
        }
        self.group(parts, indent, PartitionPolicy::AlwaysExpand)
    }

    /// Module headers: `module name (` / one partition per port / `);`.
    ///
    /// With port formatting disabled the header stays one unexpanded leaf, so
    /// the preserved port bytes pass through without invented line breaks.
    fn unwrap_module_header(&self, node: &SyntaxNode, indent: usize) -> PartitionNode {
        let span = node.token_span().expect("header has tokens");
        if !self.style.format_module_port_declarations {
            return self.leaf(span, indent);
        }
        let ports = node.children.iter().find_map(|child| match child {
            SyntaxUnit::Node(sub) if sub.tag == NonterminalKind::PortDeclarationList => Some(sub),
            _ => None,
        });
        let Some(ports) = ports else {
            return self.leaf(span, indent);
        };
        let ports_span = ports.token_span().expect("port list is non-empty");

        let port_indent = indent + self.style.wrap_spaces;
        let port_leaves: Vec<PartitionNode> = self
            .split_at_commas(ports_span.clone())
            .into_iter()
            .map(|range| self.leaf(range, port_indent))
            .collect();
        let ports_node = self.group(port_leaves, port_indent, PartitionPolicy::AlwaysExpand);

        let mut parts = vec![self.leaf(span.start..ports_span.start, indent)];
        parts.push(ports_node);
        parts.push(self.leaf(ports_span.end..span.end, indent));
        self.group(parts, indent, PartitionPolicy::AlwaysExpand)
    }

    /// Statements and control flow. `prefix_start` extends the first produced
    /// partition backwards to fold a preceding header onto it.
    fn unwrap_flow(
        &self,
        node: &SyntaxNode,
        indent: usize,
        prefix_start: Option<usize>,
    ) -> Vec<PartitionNode> {
        match node.tag {
            NonterminalKind::BeginEndBlock => self.unwrap_block(node, indent, prefix_start),
            NonterminalKind::CaseStatement => self.unwrap_case(node, indent, prefix_start),
            _ => self.unwrap_segments(node, indent, prefix_start),
        }
    }

    /// Generic walker for statements, conditionals, loops, and procedural
    /// blocks: token runs accumulate into a pending head, sub-constructs fold
    /// the pending head onto their first line.
    fn unwrap_segments(
        &self,
        node: &SyntaxNode,
        indent: usize,
        prefix_start: Option<usize>,
    ) -> Vec<PartitionNode> {
        if let Some(call) = self.unwrap_call_statement(node, indent, prefix_start) {
            return vec![call];
        }

        let step = self.style.indentation_spaces;
        let mut parts: Vec<PartitionNode> = Vec::new();
        let mut pending: Option<Range<usize>> = None;
        let mut pending_start = prefix_start;

        for child in &node.children {
            match child {
                SyntaxUnit::Token(index) => match &mut pending {
                    Some(run) => run.end = index + 1,
                    None => {
                        let start = pending_start.take().unwrap_or(*index);
                        pending = Some(start..index + 1);
                    }
                },
                SyntaxUnit::Node(sub) => match sub.tag {
                    NonterminalKind::ForLoopHeader => {
                        let span = sub.token_span().expect("loop header has tokens");
                        match &mut pending {
                            Some(run) => run.end = span.end,
                            None => {
                                let start = pending_start.take().unwrap_or(span.start);
                                pending = Some(start..span.end);
                            }
                        }
                    }
                    NonterminalKind::BeginEndBlock
                    | NonterminalKind::CaseStatement
                    | NonterminalKind::ConditionalStatement
                    | NonterminalKind::Statement => {
                        let folded = pending.take().map(|run| run.start);
                        parts.extend(self.unwrap_flow(sub, indent, folded));
                    }
                    _ => {
                        if let Some(run) = pending.take() {
                            parts.push(self.leaf(run, indent));
                        }
                        parts.push(self.unwrap_item(sub, indent + step));
                    }
                },
            }
        }
        if let Some(run) = pending {
            parts.push(self.leaf(run, indent));
        } else if let Some(start) = pending_start {
            // A prefix with no following tokens cannot happen for well-formed
            // nodes, but cover it rather than drop tokens.
            debug_assert!(start >= node.token_span().map(|s| s.start).unwrap_or(start));
        }
        if parts.is_empty() {
            if let Some(span) = node.token_span() {
                parts.push(self.leaf(span, indent));
            }
        }
        parts
    }

    /// `begin ... end` (and fork/join): head folds the prefix, items one level
    /// deeper, closing keywords on their own line.
    fn unwrap_block(
        &self,
        node: &SyntaxNode,
        indent: usize,
        prefix_start: Option<usize>,
    ) -> Vec<PartitionNode> {
        let step = self.style.indentation_spaces;
        let span = node.token_span().expect("block has tokens");

        let mut leading_end = span.start;
        let mut first_node = None;
        for (position, child) in node.children.iter().enumerate() {
            match child {
                SyntaxUnit::Token(index) => leading_end = index + 1,
                SyntaxUnit::Node(_) => {
                    first_node = Some(position);
                    break;
                }
            }
        }
        let head_start = prefix_start.unwrap_or(span.start);

        let Some(first_node) = first_node else {
            // `begin end` with nothing inside: one partition.
            return vec![self.leaf(head_start..span.end, indent)];
        };

        let mut parts = vec![self.leaf(head_start..leading_end, indent)];
        let mut trailing: Option<Range<usize>> = None;
        for child in &node.children[first_node..] {
            match child {
                SyntaxUnit::Node(sub) => {
                    if let Some(run) = trailing.take() {
                        parts.push(self.leaf(run, indent + step));
                    }
                    parts.push(self.unwrap_item(sub, indent + step));
                }
                SyntaxUnit::Token(index) => match &mut trailing {
                    Some(run) => run.end = index + 1,
                    None => trailing = Some(*index..index + 1),
                },
            }
        }
        if let Some(run) = trailing {
            parts.push(self.leaf(run, indent));
        }
        parts
    }

    /// `case (expr)` head, one partition per item a level deeper, `endcase`.
    fn unwrap_case(
        &self,
        node: &SyntaxNode,
        indent: usize,
        prefix_start: Option<usize>,
    ) -> Vec<PartitionNode> {
        let step = self.style.indentation_spaces;
        let span = node.token_span().expect("case has tokens");

        let mut leading_end = span.start;
        let mut first_node = None;
        for (position, child) in node.children.iter().enumerate() {
            match child {
                SyntaxUnit::Token(index) => leading_end = index + 1,
                SyntaxUnit::Node(_) => {
                    first_node = Some(position);
                    break;
                }
            }
        }
        let head_start = prefix_start.unwrap_or(span.start);
        let Some(first_node) = first_node else {
            return vec![self.leaf(head_start..span.end, indent)];
        };

        let mut parts = vec![self.leaf(head_start..leading_end, indent)];
        let mut trailing: Option<Range<usize>> = None;
        for child in &node.children[first_node..] {
            match child {
                SyntaxUnit::Node(sub) if sub.tag == NonterminalKind::CaseItem => {
                    if let Some(run) = trailing.take() {
                        parts.push(self.leaf(run, indent + step));
                    }
                    parts.push(self.unwrap_case_item(sub, indent + step));
                }
                SyntaxUnit::Node(sub) => {
                    if let Some(run) = trailing.take() {
                        parts.push(self.leaf(run, indent + step));
                    }
                    parts.push(self.unwrap_item(sub, indent + step));
                }
                SyntaxUnit::Token(index) => match &mut trailing {
                    Some(run) => run.end = index + 1,
                    None => trailing = Some(*index..index + 1),
                },
            }
        }
        if let Some(run) = trailing {
            parts.push(self.leaf(run, indent));
        }
        parts
    }

    /// A case item joins its label and a short body on one line; block bodies
    /// fold the label onto `begin`.
    fn unwrap_case_item(&self, node: &SyntaxNode, indent: usize) -> PartitionNode {
        let span = node.token_span().expect("case item has tokens");
        let step = self.style.indentation_spaces;

        let mut label_end = span.start;
        let mut body: Option<&SyntaxNode> = None;
        for child in &node.children {
            match child {
                SyntaxUnit::Token(index) => label_end = index + 1,
                SyntaxUnit::Node(sub) => {
                    body = Some(sub);
                    break;
                }
            }
        }
        let Some(body) = body else {
            return self.leaf(span, indent);
        };

        if body.tag == NonterminalKind::BeginEndBlock {
            let parts = self.unwrap_block(body, indent, Some(span.start));
            return self.group(parts, indent, PartitionPolicy::AlwaysExpand);
        }

        let mut parts = vec![self.leaf(span.start..label_end, indent)];
        parts.extend(self.unwrap_flow(body, indent + step, None));
        self.group(parts, indent, PartitionPolicy::FitOnLineElseExpand)
    }

    /// `callee(arg, arg, ...);` becomes an append-fitting node: the head leaf
    /// (through the open paren) and a group of per-argument leaves, with the
    /// closing `);` attached to the last argument.
    fn unwrap_call_statement(
        &self,
        node: &SyntaxNode,
        indent: usize,
        prefix_start: Option<usize>,
    ) -> Option<PartitionNode> {
        if node.tag != NonterminalKind::Statement {
            return None;
        }
        let mut arguments: Option<&SyntaxNode> = None;
        for child in &node.children {
            if let SyntaxUnit::Node(sub) = child {
                if sub.tag == NonterminalKind::CallArgumentList && arguments.is_none() {
                    arguments = Some(sub);
                } else {
                    return None; // other nested structure: not a simple call
                }
            }
        }
        let arguments = arguments?;
        let span = node.token_span()?;
        let args_span = arguments.token_span()?;

        let head_start = prefix_start.unwrap_or(span.start);
        let arg_indent = indent + self.style.wrap_spaces;
        let mut arg_ranges = self.split_at_commas(args_span.clone());
        if let Some(last) = arg_ranges.last_mut() {
            last.end = span.end; // attach `);` and any trailing comment
        }
        let arg_leaves: Vec<PartitionNode> = arg_ranges
            .into_iter()
            .map(|range| self.leaf(range, arg_indent))
            .collect();
        let arg_group = PartitionNode::interior(
            UnwrappedLine::new(args_span.start..span.end, arg_indent, PartitionPolicy::Inline),
            arg_leaves,
        );

        let head = self.leaf(head_start..args_span.start, indent);
        Some(PartitionNode::interior(
            UnwrappedLine::new(
                head_start..span.end,
                indent,
                PartitionPolicy::AppendFittingSubPartitions,
            ),
            vec![head, arg_group],
        ))
    }

    /// Split a token range after each top-level comma.
    fn split_at_commas(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let mut pieces = Vec::new();
        let mut depth = 0usize;
        let mut start = range.start;
        for index in range.clone() {
            let kind = self.structure.tokens[index].kind;
            if kind.is_open_group() {
                depth += 1;
            } else if kind.is_close_group() {
                depth = depth.saturating_sub(1);
            } else if kind == TokenKind::Comma && depth == 0 && index + 1 < range.end {
                pieces.push(start..index + 1);
                start = index + 1;
            }
        }
        if start < range.end {
            pieces.push(start..range.end);
        }
        pieces
    }
}
