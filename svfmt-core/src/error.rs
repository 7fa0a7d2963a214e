//! Errors surfaced by the formatting engine
//!
//!     Every failure mode a caller can act on is one variant here. `ResourceExhausted`
//!     deliberately carries the best-effort formatted text: the search budget running out
//!     is a soft failure, and callers commonly still want to show the partial result.

use std::fmt;

/// Error kinds surfaced by [`crate::format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The input failed to lex cleanly; the engine refuses to run.
    /// Carries the first few error messages.
    InvalidInput(Vec<String>),
    /// One or more unwrapped lines hit the search-state budget. The formatted
    /// text is still usable, but some lines may not be optimally wrapped.
    ResourceExhausted {
        formatted_text: String,
        detail: String,
    },
    /// The verifier found the output lexically different from the input.
    /// Always fatal; the caller must keep the original text.
    DataLoss(String),
    /// A diagnostic stop was requested, or the cancel flag was raised.
    Cancelled(String),
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::InvalidInput(messages) => {
                write!(f, "input failed to lex/parse")?;
                for message in messages.iter().take(3) {
                    write!(f, "\n  {}", message)?;
                }
                Ok(())
            }
            FormatError::ResourceExhausted { detail, .. } => {
                write!(f, "wrap search exhausted its state budget: {}", detail)
            }
            FormatError::DataLoss(detail) => {
                write!(
                    f,
                    "formatted output is lexically different from the input: {}",
                    detail
                )
            }
            FormatError::Cancelled(reason) => write!(f, "formatting cancelled: {}", reason),
        }
    }
}

impl std::error::Error for FormatError {}
