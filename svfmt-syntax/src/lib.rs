//! # svfmt-syntax
//!
//! Lexical and structural views over SystemVerilog source, consumed by the
//! formatter core.
//!
//! The crate produces three coordinated views from one pass over the source:
//! a significant token stream with byte ranges, an outline syntax tree that
//! partitions that stream into the constructs the formatter's layout rules
//! care about, and a line/column map. They are bundled as [`TextStructure`].
//!
//! The outline tree is deliberately not a full parse. It is a best-effort
//! covering partition: every significant token appears exactly once, in
//! order, and unrecognized constructs degrade to plain statements. The
//! formatter's correctness guarantee (lexical round-trip) rests only on the
//! token stream; the tree affects layout quality, not correctness.

pub mod lexing;
pub mod syntax;
pub mod text;
pub mod token;

pub use lexing::{is_keyword, tokenize};
pub use syntax::{parse_source, NonterminalKind, SyntaxNode, SyntaxUnit};
pub use text::{LineColumn, LineColumnMap, TextStructure};
pub use token::{TokenInfo, TokenKind};
