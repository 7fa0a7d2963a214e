//! Inter-token spacing and break annotation
//!
//!     Walks the format-token sequence once and fills in each token's `before` record:
//!     minimum spaces, break decision, and wrap penalty. Decisions are keyed on the
//!     adjacent token kinds, the tokens' syntactic context chains (derived from the
//!     outline tree), and the tokens' original line placement (for comment attachment).
//!
//!     The annotator always succeeds; pairs no rule matches fall back to a single
//!     space with an undecided break.
//!
//! Penalty bands
//!
//!     Wrap penalties are small integers in three bands: soft splits after commas,
//!     medium splits mid-expression, and near-prohibitive splits inside atomic token
//!     groups (array slices, hierarchical names, scope chains). The over-column-limit
//!     penalty from the style is what trades off against these.

use crate::format_token::{PreFormatToken, SpacingOptions};
use crate::style::FormatStyle;
use svfmt_syntax::{NonterminalKind, SyntaxNode, SyntaxUnit, TextStructure, TokenKind};

/// Soft split, e.g. after a comma.
const PENALTY_SOFT: i64 = 1;
/// Split between arbitrary expression tokens.
const PENALTY_EXPRESSION: i64 = 25;
/// Split before a binary operator.
const PENALTY_BINARY_OP: i64 = 30;
/// Split just inside an opened group.
const PENALTY_AFTER_OPEN: i64 = 50;
/// Split inside an atomic token group (index, slice, hierarchical name).
const PENALTY_ATOMIC: i64 = 2000;

/// Per-token chains of enclosing nonterminals, outermost first.
pub fn build_token_contexts(tree: &SyntaxNode, token_count: usize) -> Vec<Vec<NonterminalKind>> {
    let mut contexts = vec![Vec::new(); token_count];
    let mut stack = Vec::new();
    fill_contexts(tree, &mut stack, &mut contexts);
    contexts
}

fn fill_contexts(
    node: &SyntaxNode,
    stack: &mut Vec<NonterminalKind>,
    contexts: &mut [Vec<NonterminalKind>],
) {
    stack.push(node.tag);
    for child in &node.children {
        match child {
            SyntaxUnit::Token(index) => contexts[*index] = stack.clone(),
            SyntaxUnit::Node(child) => fill_contexts(child, stack, contexts),
        }
    }
    stack.pop();
}

fn in_chain(contexts: &[Vec<NonterminalKind>], index: usize, kind: NonterminalKind) -> bool {
    contexts[index].contains(&kind)
}

/// Populate every token's `before` record in place.
///
/// Token 0 keeps its default record; the wrap search always places the first
/// token at the line's indentation.
pub fn annotate_formatting_information(
    style: &FormatStyle,
    structure: &TextStructure,
    ftokens: &mut [PreFormatToken],
) {
    let _ = style; // the style owns only the over-limit scale today
    let contexts = build_token_contexts(&structure.syntax_tree, ftokens.len());
    let mut bracket_depth = 0usize;

    for i in 1..ftokens.len() {
        match ftokens[i - 1].kind {
            TokenKind::LBracket => bracket_depth += 1,
            TokenKind::RBracket => bracket_depth = bracket_depth.saturating_sub(1),
            _ => {}
        }
        let mut annotation = annotate_pair(structure, &contexts, ftokens, i, bracket_depth);

        // Preprocessor directives own their original line: the directive token wraps,
        // its body tokens stay appended with their ordinary spacing, and the first
        // token after the directive line wraps again.
        let cur_in_directive = in_chain(&contexts, i, NonterminalKind::PreprocessorDirective);
        let prev_in_directive = in_chain(&contexts, i - 1, NonterminalKind::PreprocessorDirective);
        if cur_in_directive {
            if ftokens[i].kind == TokenKind::Directive && !prev_in_directive {
                annotation.decision = SpacingOptions::MustWrap;
                annotation.spaces = 0;
            } else {
                annotation.decision = SpacingOptions::MustAppend;
            }
        } else if prev_in_directive {
            annotation.decision = SpacingOptions::MustWrap;
            annotation.spaces = 0;
        }

        let before = &mut ftokens[i].before;
        before.spaces_required = annotation.spaces;
        before.break_decision = annotation.decision;
        before.break_penalty = annotation.penalty;
    }
}

struct Annotation {
    spaces: usize,
    decision: SpacingOptions,
    penalty: i64,
}

impl Annotation {
    fn new(spaces: usize, decision: SpacingOptions, penalty: i64) -> Self {
        Self {
            spaces,
            decision,
            penalty,
        }
    }
}

fn same_original_line(structure: &TextStructure, left: &PreFormatToken, right: &PreFormatToken) -> bool {
    structure.line_map.line_of_offset(left.range.end.saturating_sub(1))
        == structure.line_map.line_of_offset(right.range.start)
}

/// Spacing and break decision for the pair `(ftokens[i-1], ftokens[i])`.
fn annotate_pair(
    structure: &TextStructure,
    contexts: &[Vec<NonterminalKind>],
    ftokens: &[PreFormatToken],
    i: usize,
    bracket_depth: usize,
) -> Annotation {
    use SpacingOptions::{MustAppend, MustWrap, Undecided};

    let source = structure.contents.as_str();
    let prev = &ftokens[i - 1];
    let cur = &ftokens[i];
    let cur_text = cur.text(source);

    // Comments first: attachment is decided by original line placement.
    if cur.kind == TokenKind::LineComment {
        return if same_original_line(structure, prev, cur) {
            Annotation::new(2, MustAppend, PENALTY_ATOMIC)
        } else {
            Annotation::new(0, MustWrap, 0)
        };
    }
    if cur.kind == TokenKind::BlockComment {
        return if same_original_line(structure, prev, cur) {
            Annotation::new(1, Undecided, PENALTY_EXPRESSION)
        } else {
            Annotation::new(0, MustWrap, 0)
        };
    }
    if prev.kind == TokenKind::LineComment {
        // Nothing may follow a line comment on its line.
        return Annotation::new(0, MustWrap, 0);
    }
    if prev.kind == TokenKind::BlockComment {
        return if same_original_line(structure, prev, cur) {
            Annotation::new(1, Undecided, PENALTY_EXPRESSION)
        } else {
            Annotation::new(0, MustWrap, 0)
        };
    }

    // Tight punctuation that binds to its predecessor.
    match cur.kind {
        TokenKind::Comma | TokenKind::Semicolon => {
            return Annotation::new(0, MustAppend, 0);
        }
        TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
            return Annotation::new(0, MustAppend, 0);
        }
        TokenKind::Dot => {
            let spaces = match prev.kind {
                TokenKind::LParen | TokenKind::LBrace => 0,
                _ if prev.kind == TokenKind::Comma => 1,
                _ if prev.kind.is_identifier_like() || prev.kind.is_close_group() => 0,
                _ => 1,
            };
            return Annotation::new(spaces, Undecided, PENALTY_ATOMIC);
        }
        TokenKind::ScopeColon => {
            return Annotation::new(0, MustAppend, 0);
        }
        _ => {}
    }

    match prev.kind {
        TokenKind::Semicolon => {
            // Statement boundary, except inside a for-loop header.
            return if in_chain(contexts, i - 1, NonterminalKind::ForLoopHeader) {
                Annotation::new(1, MustAppend, 0)
            } else {
                Annotation::new(1, MustWrap, 0)
            };
        }
        TokenKind::Comma => {
            return Annotation::new(1, Undecided, comma_split_penalty(contexts, i, bracket_depth));
        }
        TokenKind::LParen | TokenKind::LBrace => {
            return Annotation::new(0, Undecided, PENALTY_AFTER_OPEN);
        }
        TokenKind::LBracket => {
            return Annotation::new(0, Undecided, PENALTY_ATOMIC);
        }
        TokenKind::Dot | TokenKind::ScopeColon => {
            return Annotation::new(0, MustAppend, 0);
        }
        TokenKind::Hash | TokenKind::At | TokenKind::Apostrophe => {
            return Annotation::new(0, MustAppend, 0);
        }
        _ => {}
    }

    match cur.kind {
        TokenKind::LParen => {
            let spaces = if prev.kind == TokenKind::Keyword {
                1
            } else {
                0
            };
            return Annotation::new(spaces, Undecided, PENALTY_AFTER_OPEN);
        }
        TokenKind::LBracket => {
            // `logic [7:0]` keeps the space after a type keyword; `x[3]` binds tight.
            let spaces = if prev.kind == TokenKind::Keyword { 1 } else { 0 };
            return Annotation::new(spaces, Undecided, PENALTY_ATOMIC);
        }
        TokenKind::LBrace => {
            return Annotation::new(1, Undecided, PENALTY_EXPRESSION);
        }
        TokenKind::Colon => {
            if bracket_depth > 0 {
                // Part of a range or slice: `[7:0]`, `[a +: 4]`.
                return Annotation::new(0, MustAppend, 0);
            }
            if in_chain(contexts, i, NonterminalKind::CaseItem) {
                return Annotation::new(0, MustAppend, 0);
            }
            // Block labels and the ternary else-arm.
            return Annotation::new(1, Undecided, PENALTY_BINARY_OP);
        }
        TokenKind::Hash | TokenKind::At => {
            return Annotation::new(1, Undecided, PENALTY_EXPRESSION);
        }
        TokenKind::Apostrophe => {
            return Annotation::new(1, Undecided, PENALTY_EXPRESSION);
        }
        TokenKind::Operator => {
            if is_postfix_operator(cur_text, prev) {
                return Annotation::new(0, MustAppend, 0);
            }
            if bracket_depth > 0 {
                // Index and slice expressions stay tight: `[WIDTH-1:0]`.
                return Annotation::new(0, MustAppend, 0);
            }
            let penalty = if operator_is_unary(source, ftokens, i) {
                PENALTY_EXPRESSION
            } else {
                PENALTY_BINARY_OP
            };
            return Annotation::new(1, Undecided, penalty);
        }
        _ => {}
    }

    // After a unary operator, the operand binds tight.
    if prev.kind == TokenKind::Operator && operator_is_unary(source, ftokens, i - 1) {
        return Annotation::new(0, MustAppend, 0);
    }
    if prev.kind == TokenKind::Colon {
        // Tight inside ranges and slices; spaced after labels and ternary arms.
        return if bracket_depth > 0 {
            Annotation::new(0, MustAppend, 0)
        } else {
            Annotation::new(1, Undecided, PENALTY_EXPRESSION)
        };
    }
    if prev.kind == TokenKind::Operator {
        if bracket_depth > 0 {
            return Annotation::new(0, MustAppend, 0);
        }
        return Annotation::new(1, Undecided, PENALTY_EXPRESSION);
    }

    // Identifier/keyword/literal adjacency and everything unmatched.
    let penalty = if bracket_depth > 0 {
        PENALTY_ATOMIC
    } else {
        PENALTY_EXPRESSION
    };
    Annotation::new(1, Undecided, penalty)
}

/// Splitting after a comma is the preferred soft breakpoint, except inside
/// bracketed index/slice groups where the whole group is atomic.
fn comma_split_penalty(
    contexts: &[Vec<NonterminalKind>],
    i: usize,
    bracket_depth: usize,
) -> i64 {
    if bracket_depth > 0 {
        return PENALTY_ATOMIC;
    }
    if in_chain(contexts, i, NonterminalKind::CallArgumentList)
        || in_chain(contexts, i, NonterminalKind::PortDeclarationList)
    {
        return PENALTY_SOFT;
    }
    PENALTY_SOFT + 1
}

fn is_postfix_operator(text: &str, prev: &PreFormatToken) -> bool {
    matches!(text, "++" | "--")
        && (prev.kind.is_identifier_like() || prev.kind.is_close_group())
}

/// Whether the operator token at `index` is unary, judged by what precedes it.
fn operator_is_unary(source: &str, ftokens: &[PreFormatToken], index: usize) -> bool {
    let text = ftokens[index].text(source);
    if !matches!(
        text,
        "+" | "-" | "!" | "~" | "&" | "|" | "^" | "~&" | "~|" | "~^" | "^~" | "++" | "--"
    ) {
        return false;
    }
    if index == 0 {
        return true;
    }
    let prev = &ftokens[index - 1];
    match prev.kind {
        TokenKind::Operator
        | TokenKind::LParen
        | TokenKind::LBracket
        | TokenKind::LBrace
        | TokenKind::Comma
        | TokenKind::Semicolon
        | TokenKind::Colon
        | TokenKind::ScopeColon
        | TokenKind::At
        | TokenKind::Hash
        | TokenKind::Keyword => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_token::preformat_tokens;
    use rstest::rstest;

    fn annotate(source: &str) -> (TextStructure, Vec<PreFormatToken>) {
        let structure = TextStructure::from_source(source);
        let mut ftokens = preformat_tokens(&structure);
        annotate_formatting_information(&FormatStyle::default(), &structure, &mut ftokens);
        (structure, ftokens)
    }

    /// Render a single line by appending every token with its required spaces.
    fn flat_render(structure: &TextStructure, ftokens: &[PreFormatToken]) -> String {
        let mut out = String::new();
        for (position, token) in ftokens.iter().enumerate() {
            if position > 0 {
                for _ in 0..token.before.spaces_required {
                    out.push(' ');
                }
            }
            out.push_str(token.text(&structure.contents));
        }
        out
    }

    #[rstest]
    #[case("assign x = a+b+c ;\n", "assign x = a + b + c;")]
    #[case("x<=y ;\n", "x <= y;")]
    #[case("f = g ( a,b ) ;\n", "f = g(a, b);")]
    #[case("wire [7:0] w ;\n", "wire [7:0] w;")]
    #[case("x = top.sub.leaf ;\n", "x = top.sub.leaf;")]
    #[case("y = -x ;\n", "y = -x;")]
    #[case("y = a - x ;\n", "y = a - x;")]
    #[case("p::q = 1 ;\n", "p::q = 1;")]
    fn test_flat_spacing(#[case] source: &str, #[case] expected: &str) {
        let (structure, ftokens) = annotate(source);
        assert_eq!(flat_render(&structure, &ftokens), expected);
    }

    #[test]
    fn test_trailing_comment_must_append() {
        let (structure, ftokens) = annotate("a = 1; // note\n");
        let comment = ftokens
            .iter()
            .find(|t| t.kind == TokenKind::LineComment)
            .unwrap();
        assert_eq!(comment.before.break_decision, SpacingOptions::MustAppend);
        assert_eq!(comment.before.spaces_required, 2);
        let _ = structure;
    }

    #[test]
    fn test_standalone_comment_wraps_before_and_after() {
        let (_, ftokens) = annotate("a = 1;\n// standalone\nb = 2;\n");
        let position = ftokens
            .iter()
            .position(|t| t.kind == TokenKind::LineComment)
            .unwrap();
        assert_eq!(
            ftokens[position].before.break_decision,
            SpacingOptions::MustWrap
        );
        assert_eq!(
            ftokens[position + 1].before.break_decision,
            SpacingOptions::MustWrap
        );
    }

    #[test]
    fn test_semicolon_wraps_next_statement_but_appends_in_for_header() {
        let (_, ftokens) = annotate("for (i = 0; i < 4; i = i + 1) x = i;\ny = 1;\n");
        let mut semicolon_followers = Vec::new();
        for i in 1..ftokens.len() {
            if ftokens[i - 1].kind == TokenKind::Semicolon {
                semicolon_followers.push(ftokens[i].before.break_decision);
            }
        }
        // Two `;` inside the for header append; the statement-level ones wrap.
        assert_eq!(semicolon_followers[0], SpacingOptions::MustAppend);
        assert_eq!(semicolon_followers[1], SpacingOptions::MustAppend);
        assert_eq!(semicolon_followers[2], SpacingOptions::MustWrap);
    }

    #[test]
    fn test_directive_forces_wrap_before_itself() {
        let (_, ftokens) = annotate("a = 1;\n`define W 8\n");
        let position = ftokens
            .iter()
            .position(|t| t.kind == TokenKind::Directive)
            .unwrap();
        assert_eq!(
            ftokens[position].before.break_decision,
            SpacingOptions::MustWrap
        );
    }

    #[test]
    fn test_bracket_groups_are_atomic() {
        let (structure, ftokens) = annotate("x = mem[addr+1] ;\n");
        let open = ftokens
            .iter()
            .position(|t| t.kind == TokenKind::LBracket)
            .unwrap();
        // Tokens strictly inside the brackets are unsplittable: either bound
        // with must-append or carrying the atomic penalty band.
        for token in &ftokens[open + 1..] {
            if token.kind == TokenKind::RBracket {
                break;
            }
            assert!(
                token.before.break_decision == SpacingOptions::MustAppend
                    || token.before.break_penalty >= PENALTY_ATOMIC,
                "splittable token inside brackets: {:?}",
                token
            );
        }
        let _ = structure;
    }

    #[test]
    fn test_slice_expressions_stay_tight() {
        let (structure, ftokens) = annotate("wire [`WIDTH-1:0] w ;\n");
        assert_eq!(flat_render(&structure, &ftokens), "wire [`WIDTH-1:0] w;");
    }

    #[test]
    fn test_comma_split_is_soft_in_argument_lists() {
        let (_, ftokens) = annotate("init(a, b);\n");
        let b_index = ftokens.len() - 3; // `b` before `)` and `;`
        assert_eq!(ftokens[b_index].before.break_penalty, PENALTY_SOFT);
    }
}
