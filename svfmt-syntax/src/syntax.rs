//! Outline syntax tree for SystemVerilog
//!
//! The formatter does not need a full IEEE 1800 parse; it needs a partitioning of the
//! token stream into the constructs its layout rules dispatch on: containers (modules,
//! packages, classes, functions, tasks), block statements, conditionals, case
//! statements, loop headers, call argument lists, and everything else as plain
//! statements split at semicolons.
//!
//! This module builds that outline with a single recursive-descent pass over the
//! significant token stream. Parsing is best-effort and never fails: token runs the
//! grammar does not recognize are grouped into `Statement` nodes, so the resulting
//! tree always covers the input token stream exactly, in order, with no token
//! duplicated or dropped. That covering property is what the partitioning stage
//! depends on; anything the outline gets structurally wrong merely formats less
//! prettily.

use crate::text::LineColumnMap;
use crate::token::{TokenInfo, TokenKind};
use std::ops::Range;

/// Nonterminal tags the tree unwrapper dispatches on. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonterminalKind {
    SourceText,
    ModuleDeclaration,
    ModuleHeader,
    PortDeclarationList,
    PackageDeclaration,
    ClassDeclaration,
    FunctionDeclaration,
    TaskDeclaration,
    BeginEndBlock,
    ConditionalStatement,
    CaseStatement,
    CaseItem,
    ForLoopHeader,
    CallArgumentList,
    Statement,
    PreprocessorDirective,
    CommentLine,
}

/// A child of a syntax node: either a nested node or an index into the
/// significant token stream.
#[derive(Debug, Clone)]
pub enum SyntaxUnit {
    Node(SyntaxNode),
    Token(usize),
}

/// An outline syntax tree node.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub tag: NonterminalKind,
    pub children: Vec<SyntaxUnit>,
}

impl SyntaxNode {
    pub fn new(tag: NonterminalKind) -> Self {
        Self {
            tag,
            children: Vec::new(),
        }
    }

    /// Index of the first token covered by this node, in tree order.
    pub fn first_token_index(&self) -> Option<usize> {
        self.children.iter().find_map(|child| match child {
            SyntaxUnit::Token(index) => Some(*index),
            SyntaxUnit::Node(node) => node.first_token_index(),
        })
    }

    /// Index of the last token covered by this node, in tree order.
    pub fn last_token_index(&self) -> Option<usize> {
        self.children.iter().rev().find_map(|child| match child {
            SyntaxUnit::Token(index) => Some(*index),
            SyntaxUnit::Node(node) => node.last_token_index(),
        })
    }

    /// Half-open token-index range covered by this node, if non-empty.
    pub fn token_span(&self) -> Option<Range<usize>> {
        match (self.first_token_index(), self.last_token_index()) {
            (Some(first), Some(last)) => Some(first..last + 1),
            _ => None,
        }
    }
}

/// Keywords that close an enclosing construct; item loops stop at them.
fn is_closing_keyword(text: &str) -> bool {
    matches!(
        text,
        "end"
            | "endmodule"
            | "endpackage"
            | "endclass"
            | "endinterface"
            | "endprogram"
            | "endfunction"
            | "endtask"
            | "endcase"
            | "endgenerate"
            | "endproperty"
            | "endsequence"
            | "join"
            | "join_any"
            | "join_none"
            | "else"
    )
}

/// Parse the significant token stream into an outline tree rooted at `SourceText`.
pub fn parse_source(
    source: &str,
    tokens: &[TokenInfo],
    line_map: &LineColumnMap,
) -> SyntaxNode {
    let mut parser = OutlineParser {
        source,
        tokens,
        line_map,
        pos: 0,
    };
    let mut root = SyntaxNode::new(NonterminalKind::SourceText);
    while !parser.at_end() {
        root.children.push(parser.parse_item());
    }
    root
}

struct OutlineParser<'a> {
    source: &'a str,
    tokens: &'a [TokenInfo],
    line_map: &'a LineColumnMap,
    pos: usize,
}

impl<'a> OutlineParser<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn peek_text(&self) -> &'a str {
        match self.tokens.get(self.pos) {
            Some(token) => token.text(self.source),
            None => "",
        }
    }

    fn line_of(&self, index: usize) -> usize {
        self.line_map.line_of_offset(self.tokens[index].range.start)
    }

    /// Consume the current token, returning its index.
    fn bump(&mut self) -> usize {
        let index = self.pos;
        self.pos += 1;
        index
    }

    fn push_token(&mut self, children: &mut Vec<SyntaxUnit>) {
        let index = self.bump();
        children.push(SyntaxUnit::Token(index));
    }

    /// Consume a balanced group starting at the current open token, pushing all
    /// tokens including the delimiters.
    fn push_balanced_group(&mut self, children: &mut Vec<SyntaxUnit>) {
        let mut depth = 0usize;
        while !self.at_end() {
            let kind = self.peek_kind().unwrap();
            if kind.is_open_group() {
                depth += 1;
            } else if kind.is_close_group() {
                depth = depth.saturating_sub(1);
                self.push_token(children);
                if depth == 0 {
                    return;
                }
                continue;
            }
            self.push_token(children);
            if depth == 0 {
                return;
            }
        }
    }

    /// Attach a `: label` pair if one follows (used after closing keywords).
    fn absorb_label(&mut self, children: &mut Vec<SyntaxUnit>) {
        if self.peek_kind() == Some(TokenKind::Colon)
            && self
                .tokens
                .get(self.pos + 1)
                .map(|t| t.kind.is_identifier_like())
                .unwrap_or(false)
        {
            self.push_token(children);
            self.push_token(children);
        }
    }

    /// Attach a line comment that sits on the same line as the last consumed token.
    fn absorb_trailing_comment(&mut self, children: &mut Vec<SyntaxUnit>) {
        if self.pos == 0 || self.at_end() {
            return;
        }
        if self.peek_kind() == Some(TokenKind::LineComment)
            && self.line_of(self.pos) == self.line_of(self.pos - 1)
        {
            self.push_token(children);
        }
    }

    fn parse_item(&mut self) -> SyntaxUnit {
        match self.peek_kind() {
            Some(TokenKind::LineComment) | Some(TokenKind::BlockComment) => {
                let mut node = SyntaxNode::new(NonterminalKind::CommentLine);
                self.push_token(&mut node.children);
                SyntaxUnit::Node(node)
            }
            Some(TokenKind::Directive) => self.parse_directive(),
            Some(TokenKind::Keyword) => {
                let text = self.peek_text();
                // A stray closing keyword means the outline lost sync; consume it as a
                // one-token statement so progress is guaranteed.
                if is_closing_keyword(text) {
                    let mut node = SyntaxNode::new(NonterminalKind::Statement);
                    self.push_token(&mut node.children);
                    SyntaxUnit::Node(node)
                } else {
                    match text {
                        "module" | "macromodule" => self.parse_module(),
                        "package" => {
                            self.parse_container(NonterminalKind::PackageDeclaration, "endpackage")
                        }
                        "class" => {
                            self.parse_container(NonterminalKind::ClassDeclaration, "endclass")
                        }
                        "interface" => {
                            self.parse_container(NonterminalKind::ClassDeclaration, "endinterface")
                        }
                        "program" => {
                            self.parse_container(NonterminalKind::ClassDeclaration, "endprogram")
                        }
                        "function" => self
                            .parse_container(NonterminalKind::FunctionDeclaration, "endfunction"),
                        "task" => self.parse_container(NonterminalKind::TaskDeclaration, "endtask"),
                        _ => self.parse_statement(),
                    }
                }
            }
            Some(_) => self.parse_statement(),
            None => unreachable!("parse_item called at end of stream"),
        }
    }

    fn parse_directive(&mut self) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::PreprocessorDirective);
        let directive_index = self.bump();
        node.children.push(SyntaxUnit::Token(directive_index));
        let directive_line = self.line_of(directive_index);
        // The rest of the directive's line belongs to it (`define bodies, `include paths).
        while !self.at_end() && self.line_of(self.pos) == directive_line {
            self.push_token(&mut node.children);
        }
        SyntaxUnit::Node(node)
    }

    /// Containers with a `<keyword> ... ;` header and an item list closed by `end_keyword`:
    /// packages, classes, functions, tasks.
    fn parse_container(&mut self, tag: NonterminalKind, end_keyword: &str) -> SyntaxUnit {
        let mut node = SyntaxNode::new(tag);
        let mut header = SyntaxNode::new(NonterminalKind::Statement);
        self.consume_header(&mut header.children);
        self.absorb_trailing_comment(&mut header.children);
        node.children.push(SyntaxUnit::Node(header));

        while !self.at_end() {
            let text = self.peek_text();
            if text == end_keyword || is_closing_keyword(text) {
                break;
            }
            node.children.push(self.parse_item());
        }
        if self.peek_text() == end_keyword {
            self.push_token(&mut node.children);
            self.absorb_label(&mut node.children);
            self.absorb_trailing_comment(&mut node.children);
        }
        SyntaxUnit::Node(node)
    }

    /// Consume header tokens through the terminating `;` (balanced across groups).
    fn consume_header(&mut self, children: &mut Vec<SyntaxUnit>) {
        let mut depth = 0usize;
        while !self.at_end() {
            let kind = self.peek_kind().unwrap();
            if depth == 0 && is_closing_keyword(self.peek_text()) {
                return;
            }
            if kind.is_open_group() {
                depth += 1;
            } else if kind.is_close_group() {
                depth = depth.saturating_sub(1);
            }
            self.push_token(children);
            if kind == TokenKind::Semicolon && depth == 0 {
                return;
            }
        }
    }

    fn parse_module(&mut self) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::ModuleDeclaration);

        // Header: `module name [#(params)] [(ports)] ;` with the port group nested.
        let mut header_tokens: Vec<SyntaxUnit> = Vec::new();
        self.consume_header(&mut header_tokens);
        let mut header = SyntaxNode::new(NonterminalKind::ModuleHeader);
        header.children = nest_port_list(self.tokens, header_tokens);
        self.absorb_trailing_comment(&mut header.children);
        node.children.push(SyntaxUnit::Node(header));

        while !self.at_end() {
            let text = self.peek_text();
            if text == "endmodule" || is_closing_keyword(text) {
                break;
            }
            node.children.push(self.parse_item());
        }
        if self.peek_text() == "endmodule" {
            self.push_token(&mut node.children);
            self.absorb_label(&mut node.children);
            self.absorb_trailing_comment(&mut node.children);
        }
        SyntaxUnit::Node(node)
    }

    fn parse_statement(&mut self) -> SyntaxUnit {
        match self.peek_text() {
            "begin" => self.parse_begin_end(),
            "fork" => self.parse_fork_join(),
            "if" => self.parse_conditional(Vec::new()),
            "case" | "casex" | "casez" => self.parse_case(Vec::new()),
            "unique" | "priority" => {
                let mut prefix = Vec::new();
                prefix.push(SyntaxUnit::Token(self.bump()));
                match self.peek_text() {
                    "if" => self.parse_conditional(prefix),
                    "case" | "casex" | "casez" => self.parse_case(prefix),
                    _ => self.parse_generic_statement(prefix),
                }
            }
            "for" | "foreach" => self.parse_loop(true),
            "while" | "repeat" => self.parse_loop(false),
            "forever" => {
                let mut node = SyntaxNode::new(NonterminalKind::Statement);
                self.push_token(&mut node.children);
                let body = self.parse_statement();
                node.children.push(body);
                SyntaxUnit::Node(node)
            }
            "do" => self.parse_do_while(),
            "generate" => self.parse_generate(),
            "initial" | "final" | "always" | "always_comb" | "always_ff" | "always_latch" => {
                self.parse_procedural()
            }
            _ => self.parse_generic_statement(Vec::new()),
        }
    }

    fn parse_begin_end(&mut self) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::BeginEndBlock);
        self.push_token(&mut node.children); // begin
        self.absorb_label(&mut node.children);
        self.absorb_trailing_comment(&mut node.children);
        while !self.at_end() {
            let text = self.peek_text();
            if text == "end" || is_closing_keyword(text) {
                break;
            }
            node.children.push(self.parse_item());
        }
        if self.peek_text() == "end" {
            self.push_token(&mut node.children);
            self.absorb_label(&mut node.children);
            self.absorb_trailing_comment(&mut node.children);
        }
        SyntaxUnit::Node(node)
    }

    fn parse_fork_join(&mut self) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::BeginEndBlock);
        self.push_token(&mut node.children); // fork
        self.absorb_label(&mut node.children);
        while !self.at_end() {
            let text = self.peek_text();
            if matches!(text, "join" | "join_any" | "join_none") || is_closing_keyword(text) {
                break;
            }
            node.children.push(self.parse_item());
        }
        if matches!(self.peek_text(), "join" | "join_any" | "join_none") {
            self.push_token(&mut node.children);
            self.absorb_label(&mut node.children);
            self.absorb_trailing_comment(&mut node.children);
        }
        SyntaxUnit::Node(node)
    }

    fn parse_conditional(&mut self, prefix: Vec<SyntaxUnit>) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::ConditionalStatement);
        node.children = prefix;
        self.push_token(&mut node.children); // if
        if self.peek_kind() == Some(TokenKind::LParen) {
            self.push_balanced_group(&mut node.children);
        }
        if !self.at_end() && !is_closing_keyword(self.peek_text()) {
            let then_branch = self.parse_statement();
            node.children.push(then_branch);
        }
        if self.peek_text() == "else" {
            self.push_token(&mut node.children);
            if self.peek_text() == "if" {
                let chained = self.parse_conditional(Vec::new());
                node.children.push(chained);
            } else if !self.at_end() && !is_closing_keyword(self.peek_text()) {
                let else_branch = self.parse_statement();
                node.children.push(else_branch);
            }
        }
        SyntaxUnit::Node(node)
    }

    fn parse_case(&mut self, prefix: Vec<SyntaxUnit>) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::CaseStatement);
        node.children = prefix;
        self.push_token(&mut node.children); // case/casex/casez
        if self.peek_kind() == Some(TokenKind::LParen) {
            self.push_balanced_group(&mut node.children);
        }
        if matches!(self.peek_text(), "inside" | "matches") {
            self.push_token(&mut node.children);
        }
        self.absorb_trailing_comment(&mut node.children);
        while !self.at_end() {
            let text = self.peek_text();
            if text == "endcase" || is_closing_keyword(text) {
                break;
            }
            if matches!(
                self.peek_kind(),
                Some(TokenKind::LineComment) | Some(TokenKind::BlockComment)
            ) {
                let mut comment = SyntaxNode::new(NonterminalKind::CommentLine);
                self.push_token(&mut comment.children);
                node.children.push(SyntaxUnit::Node(comment));
                continue;
            }
            node.children.push(self.parse_case_item());
        }
        if self.peek_text() == "endcase" {
            self.push_token(&mut node.children);
            self.absorb_trailing_comment(&mut node.children);
        }
        SyntaxUnit::Node(node)
    }

    fn parse_case_item(&mut self) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::CaseItem);
        // Label expressions through the colon, balanced across brackets.
        let mut depth = 0usize;
        while !self.at_end() {
            let kind = self.peek_kind().unwrap();
            if depth == 0 && (kind == TokenKind::Colon || is_closing_keyword(self.peek_text())) {
                break;
            }
            if kind.is_open_group() {
                depth += 1;
            } else if kind.is_close_group() {
                depth = depth.saturating_sub(1);
            }
            self.push_token(&mut node.children);
        }
        if self.peek_kind() == Some(TokenKind::Colon) {
            self.push_token(&mut node.children);
        }
        if !self.at_end() && !is_closing_keyword(self.peek_text()) {
            let body = self.parse_statement();
            node.children.push(body);
        }
        SyntaxUnit::Node(node)
    }

    fn parse_loop(&mut self, tag_header: bool) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::Statement);
        if tag_header {
            let mut header = SyntaxNode::new(NonterminalKind::ForLoopHeader);
            self.push_token(&mut header.children); // for/foreach
            if self.peek_kind() == Some(TokenKind::LParen) {
                self.push_balanced_group(&mut header.children);
            }
            node.children.push(SyntaxUnit::Node(header));
        } else {
            self.push_token(&mut node.children); // while/repeat
            if self.peek_kind() == Some(TokenKind::LParen) {
                self.push_balanced_group(&mut node.children);
            }
        }
        if !self.at_end() && !is_closing_keyword(self.peek_text()) {
            let body = self.parse_statement();
            node.children.push(body);
        }
        SyntaxUnit::Node(node)
    }

    fn parse_do_while(&mut self) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::Statement);
        self.push_token(&mut node.children); // do
        let body = self.parse_statement();
        node.children.push(body);
        if self.peek_text() == "while" {
            self.push_token(&mut node.children);
            if self.peek_kind() == Some(TokenKind::LParen) {
                self.push_balanced_group(&mut node.children);
            }
            if self.peek_kind() == Some(TokenKind::Semicolon) {
                self.push_token(&mut node.children);
            }
            self.absorb_trailing_comment(&mut node.children);
        }
        SyntaxUnit::Node(node)
    }

    fn parse_generate(&mut self) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::Statement);
        self.push_token(&mut node.children); // generate
        while !self.at_end() {
            let text = self.peek_text();
            if text == "endgenerate" || is_closing_keyword(text) {
                break;
            }
            node.children.push(self.parse_item());
        }
        if self.peek_text() == "endgenerate" {
            self.push_token(&mut node.children);
            self.absorb_trailing_comment(&mut node.children);
        }
        SyntaxUnit::Node(node)
    }

    /// `initial`/`final`/`always*` with an optional timing-control prefix, then a body.
    fn parse_procedural(&mut self) -> SyntaxUnit {
        let mut node = SyntaxNode::new(NonterminalKind::Statement);
        self.push_token(&mut node.children); // the procedural keyword
        loop {
            match self.peek_kind() {
                Some(TokenKind::At) => {
                    self.push_token(&mut node.children);
                    if self.peek_kind() == Some(TokenKind::LParen) {
                        self.push_balanced_group(&mut node.children);
                    } else if self.peek_text() == "*" {
                        self.push_token(&mut node.children);
                    }
                }
                Some(TokenKind::Hash) => {
                    self.push_token(&mut node.children);
                    if self.peek_kind() == Some(TokenKind::LParen) {
                        self.push_balanced_group(&mut node.children);
                    } else if !self.at_end() {
                        self.push_token(&mut node.children);
                    }
                }
                _ => break,
            }
        }
        if !self.at_end() && !is_closing_keyword(self.peek_text()) {
            let body = self.parse_statement();
            node.children.push(body);
        }
        SyntaxUnit::Node(node)
    }

    /// Anything else: tokens through the terminating `;`, with call argument lists nested.
    fn parse_generic_statement(&mut self, prefix: Vec<SyntaxUnit>) -> SyntaxUnit {
        let mut indices: Vec<usize> = prefix
            .iter()
            .filter_map(|unit| match unit {
                SyntaxUnit::Token(index) => Some(*index),
                SyntaxUnit::Node(_) => None,
            })
            .collect();
        let mut depth = 0usize;
        while !self.at_end() {
            let kind = self.peek_kind().unwrap();
            if depth == 0 && is_closing_keyword(self.peek_text()) {
                break;
            }
            if kind.is_open_group() {
                depth += 1;
            } else if kind.is_close_group() {
                depth = depth.saturating_sub(1);
            }
            indices.push(self.bump());
            if kind == TokenKind::Semicolon && depth == 0 {
                break;
            }
        }
        if indices.is_empty() {
            // Lost sync on a closing keyword with no open construct; take one token.
            indices.push(self.bump());
        }

        let mut node = SyntaxNode::new(NonterminalKind::Statement);
        node.children = self.nest_call_arguments(indices);
        self.absorb_trailing_comment(&mut node.children);
        SyntaxUnit::Node(node)
    }

    /// Recognize `callee ( args ) ;` statements and nest the arguments under a
    /// `CallArgumentList` node so the layout stage can pack them.
    fn nest_call_arguments(&self, indices: Vec<usize>) -> Vec<SyntaxUnit> {
        let flat = |indices: Vec<usize>| indices.into_iter().map(SyntaxUnit::Token).collect();

        if indices.len() < 5 {
            return flat(indices);
        }
        let last = indices.len() - 1;
        if self.tokens[indices[last]].kind != TokenKind::Semicolon
            || self.tokens[indices[last - 1]].kind != TokenKind::RParen
        {
            return flat(indices);
        }
        // Callee: an identifier, optionally a `.`-joined hierarchical name.
        if !matches!(
            self.tokens[indices[0]].kind,
            TokenKind::Identifier | TokenKind::SystemIdentifier
        ) {
            return flat(indices);
        }
        let mut open = 1;
        while open + 1 < last
            && self.tokens[indices[open]].kind == TokenKind::Dot
            && self.tokens[indices[open + 1]].kind.is_identifier_like()
        {
            open += 2;
        }
        if self.tokens[indices[open]].kind != TokenKind::LParen {
            return flat(indices);
        }
        // The open paren must balance exactly at the closing paren before `;`.
        let mut depth = 0usize;
        for (position, &index) in indices.iter().enumerate().skip(open) {
            let kind = self.tokens[index].kind;
            if kind.is_open_group() {
                depth += 1;
            } else if kind.is_close_group() {
                depth -= 1;
                if depth == 0 {
                    if position != last - 1 {
                        return flat(indices);
                    }
                    break;
                }
            }
        }
        if indices[open + 1..last - 1].is_empty() {
            return flat(indices);
        }

        let mut children: Vec<SyntaxUnit> = Vec::new();
        for &index in &indices[..=open] {
            children.push(SyntaxUnit::Token(index));
        }
        let mut arguments = SyntaxNode::new(NonterminalKind::CallArgumentList);
        for &index in &indices[open + 1..last - 1] {
            arguments.children.push(SyntaxUnit::Token(index));
        }
        children.push(SyntaxUnit::Node(arguments));
        children.push(SyntaxUnit::Token(indices[last - 1]));
        children.push(SyntaxUnit::Token(indices[last]));
        children
    }
}

/// Rewrite flat module-header tokens so the port group (the last top-level paren
/// group not introduced by `#`) nests its contents under `PortDeclarationList`.
fn nest_port_list(tokens: &[TokenInfo], header: Vec<SyntaxUnit>) -> Vec<SyntaxUnit> {
    let indices: Vec<usize> = header
        .iter()
        .filter_map(|unit| match unit {
            SyntaxUnit::Token(index) => Some(*index),
            SyntaxUnit::Node(_) => None,
        })
        .collect();
    if indices.len() != header.len() {
        return header;
    }

    let mut depth = 0usize;
    let mut groups: Vec<(usize, usize, bool)> = Vec::new(); // (open pos, close pos, parameter group)
    let mut open_position = 0usize;
    let mut is_parameter = false;
    for (position, &index) in indices.iter().enumerate() {
        let kind = tokens[index].kind;
        if kind == TokenKind::LParen {
            if depth == 0 {
                open_position = position;
                is_parameter = position > 0 && tokens[indices[position - 1]].kind == TokenKind::Hash;
            }
            depth += 1;
        } else if kind == TokenKind::RParen {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                groups.push((open_position, position, is_parameter));
            }
        }
    }
    let port_group = groups.iter().rev().find(|(_, _, parameter)| !parameter);
    let Some(&(open, close, _)) = port_group else {
        return header;
    };
    if close <= open + 1 {
        return header; // empty port list stays flat
    }

    let mut out: Vec<SyntaxUnit> = Vec::new();
    for &index in &indices[..=open] {
        out.push(SyntaxUnit::Token(index));
    }
    let mut ports = SyntaxNode::new(NonterminalKind::PortDeclarationList);
    for &index in &indices[open + 1..close] {
        ports.children.push(SyntaxUnit::Token(index));
    }
    out.push(SyntaxUnit::Node(ports));
    for &index in &indices[close..] {
        out.push(SyntaxUnit::Token(index));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::TextStructure;

    fn structure(source: &str) -> TextStructure {
        TextStructure::from_source(source)
    }

    /// Collect token indices of a tree in pre-order.
    fn covered_tokens(node: &SyntaxNode, out: &mut Vec<usize>) {
        for child in &node.children {
            match child {
                SyntaxUnit::Token(index) => out.push(*index),
                SyntaxUnit::Node(node) => covered_tokens(node, out),
            }
        }
    }

    fn assert_covers_all(source: &str) {
        let s = structure(source);
        let mut indices = Vec::new();
        covered_tokens(&s.syntax_tree, &mut indices);
        let expected: Vec<usize> = (0..s.tokens.len()).collect();
        assert_eq!(indices, expected, "tree must cover tokens in order: {source:?}");
    }

    #[test]
    fn test_tree_covers_all_tokens_in_order() {
        assert_covers_all("module m(input a,input b);endmodule\n");
        assert_covers_all("assign x = a+b+c ;\n");
        assert_covers_all("function f; f = 1; endfunction\n");
        assert_covers_all("always_ff @(posedge clk) begin\n q <= d;\nend\n");
        assert_covers_all("case (x) 1: a = 1; default: a = 0; endcase\n");
        assert_covers_all("for (i = 0; i < 4; i = i + 1) x = x + i;\n");
        assert_covers_all("`define WIDTH 8\nwire [`WIDTH-1:0] w;\n");
        assert_covers_all("end end endmodule\n"); // stray closers must not loop
    }

    #[test]
    fn test_module_ports_are_nested() {
        let s = structure("module m(input a, input b); endmodule\n");
        let SyntaxUnit::Node(module) = &s.syntax_tree.children[0] else {
            panic!("expected module node");
        };
        assert_eq!(module.tag, NonterminalKind::ModuleDeclaration);
        let SyntaxUnit::Node(header) = &module.children[0] else {
            panic!("expected header node");
        };
        assert_eq!(header.tag, NonterminalKind::ModuleHeader);
        assert!(header.children.iter().any(|child| matches!(
            child,
            SyntaxUnit::Node(node) if node.tag == NonterminalKind::PortDeclarationList
        )));
    }

    #[test]
    fn test_parameter_group_is_not_the_port_list() {
        let s = structure("module m #(parameter W = 4) (input a); endmodule\n");
        let SyntaxUnit::Node(module) = &s.syntax_tree.children[0] else {
            panic!("expected module node");
        };
        let SyntaxUnit::Node(header) = &module.children[0] else {
            panic!("expected header node");
        };
        let ports: Vec<_> = header
            .children
            .iter()
            .filter_map(|child| match child {
                SyntaxUnit::Node(node) if node.tag == NonterminalKind::PortDeclarationList => {
                    Some(node)
                }
                _ => None,
            })
            .collect();
        assert_eq!(ports.len(), 1);
        let span = ports[0].token_span().unwrap();
        assert_eq!(s.token_text(span.start), "input");
    }

    #[test]
    fn test_call_arguments_are_nested() {
        let s = structure("init(a, b, c);\n");
        let SyntaxUnit::Node(statement) = &s.syntax_tree.children[0] else {
            panic!("expected statement");
        };
        assert!(statement.children.iter().any(|child| matches!(
            child,
            SyntaxUnit::Node(node) if node.tag == NonterminalKind::CallArgumentList
        )));
    }

    #[test]
    fn test_for_loop_header_is_tagged() {
        let s = structure("for (i = 0; i < 4; i = i + 1) x = i;\n");
        let SyntaxUnit::Node(statement) = &s.syntax_tree.children[0] else {
            panic!("expected statement");
        };
        let SyntaxUnit::Node(header) = &statement.children[0] else {
            panic!("expected header");
        };
        assert_eq!(header.tag, NonterminalKind::ForLoopHeader);
    }

    #[test]
    fn test_trailing_comment_stays_with_statement() {
        let s = structure("a = 1; // note\nb = 2;\n");
        let SyntaxUnit::Node(first) = &s.syntax_tree.children[0] else {
            panic!("expected statement");
        };
        let span = first.token_span().unwrap();
        assert_eq!(s.tokens[span.end - 1].kind, TokenKind::LineComment);
    }
}
