//! Formatting style options
//!
//!     The knobs the engine reads. Loading these from configuration files is the
//!     `svfmt-config` crate's job; the engine only sees this plain struct.

/// Style options consumed by the formatting engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatStyle {
    /// Soft right margin the wrap search tries not to cross.
    pub column_limit: usize,
    /// Spaces added per structural nesting level (module bodies, begin/end, ...).
    pub indentation_spaces: usize,
    /// Extra spaces for continuation lines produced by wrapping within one
    /// unwrapped line, and for open port/argument groups.
    pub wrap_spaces: usize,
    /// Penalty per column beyond `column_limit`.
    pub over_column_limit_penalty: i64,
    /// Maximum number of consecutive blank lines preserved between items.
    pub max_blank_lines: usize,
    /// When false, module port declaration lists are copied verbatim.
    pub format_module_port_declarations: bool,
}

impl Default for FormatStyle {
    fn default() -> Self {
        Self {
            column_limit: 100,
            indentation_spaces: 2,
            wrap_spaces: 4,
            over_column_limit_penalty: 100,
            max_blank_lines: 2,
            format_module_port_declarations: true,
        }
    }
}
