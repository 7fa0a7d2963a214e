//! # svfmt-core
//!
//! The formatting engine for SystemVerilog source: given the lexical and
//! structural views from `svfmt-syntax` and a [`FormatStyle`], it decides
//! where to break lines and how deep to indent, minimizing a wrap penalty
//! under a column limit, then emits the result and verifies that the output
//! re-lexes to the same token stream as the input.
//!
//! Pipeline, in order:
//!
//! 1. [`annotate`] attaches spacing and break constraints between tokens.
//! 2. [`disabled_ranges`] resolves `verilog_format: off/on` directives,
//!    style-gated regions, and line-range selection into byte intervals whose
//!    spacing is preserved verbatim.
//! 3. [`tree_unwrapper`] partitions the token stream into a tree of unwrapped
//!    lines with per-construct layout policies.
//! 4. [`wrap_search`] solves each unwrapped line as a shortest-path problem
//!    over (position, column) states.
//! 5. [`emitter`] renders excerpts, interleaving disabled-range text.
//! 6. [`verify`] re-lexes the output; on any lexical difference the whole
//!    format fails and the caller keeps the original text.
//!
//! All state is per-invocation; there are no globals, and diagnostics go to a
//! caller-supplied stream.

pub mod annotate;
pub mod disabled_ranges;
pub mod emitter;
pub mod error;
pub mod format_token;
pub mod formatter;
pub mod partition_tree;
pub mod style;
pub mod tree_unwrapper;
pub mod unwrapped_line;
pub mod verify;
pub mod wrap_search;

pub use disabled_ranges::{ByteOffsetSet, LineNumberSet};
pub use error::FormatError;
pub use formatter::{format, format_source, ExecutionControl, DEFAULT_MAX_SEARCH_STATES};
pub use style::FormatStyle;
