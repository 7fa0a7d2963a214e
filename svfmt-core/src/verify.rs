//! Round-trip verification
//!
//!     The emitted text is re-lexed and its whitespace-filtered token stream compared
//!     against the input's, kind and text both. Any re-lex error or difference is a
//!     data-loss failure: the caller must discard the formatted text and keep the
//!     original. This is the engine's last line of defense; everything upstream may
//!     have bugs, but a verified output never loses tokens.

use crate::error::FormatError;
use svfmt_syntax::{tokenize, TextStructure, TokenInfo};

/// Check that `formatted` is lexically equivalent to the original input.
pub fn verify_formatting(structure: &TextStructure, formatted: &str) -> Result<(), FormatError> {
    let (tokens, errors) = tokenize(formatted);
    if !errors.is_empty() {
        return Err(FormatError::DataLoss(format!(
            "formatted output failed to re-lex; first error: {}",
            errors[0]
        )));
    }
    let relexed: Vec<TokenInfo> = tokens
        .into_iter()
        .filter(|t| !t.kind.is_whitespace())
        .collect();

    let original = &structure.tokens;
    for (index, expected) in original.iter().enumerate() {
        let Some(actual) = relexed.get(index) else {
            return Err(FormatError::DataLoss(format!(
                "output is missing token {} ({:?} {:?})",
                index,
                expected.kind,
                expected.text(&structure.contents)
            )));
        };
        if actual.kind != expected.kind
            || actual.text(formatted) != expected.text(&structure.contents)
        {
            let at = structure.line_map.line_column(expected.range.start);
            return Err(FormatError::DataLoss(format!(
                "token {} differs at {}: expected {:?} {:?}, got {:?} {:?}",
                index,
                at,
                expected.kind,
                expected.text(&structure.contents),
                actual.kind,
                actual.text(formatted)
            )));
        }
    }
    if relexed.len() > original.len() {
        let extra = &relexed[original.len()];
        return Err(FormatError::DataLoss(format!(
            "output has {} extra token(s); first extra: {:?} {:?}",
            relexed.len() - original.len(),
            extra.kind,
            extra.text(formatted)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_text_passes() {
        let structure = TextStructure::from_source("assign x=a+b;\n");
        assert!(verify_formatting(&structure, "assign x = a + b;\n").is_ok());
    }

    #[test]
    fn test_dropped_token_is_data_loss() {
        let structure = TextStructure::from_source("assign x = a + b;\n");
        let result = verify_formatting(&structure, "assign x = a;\n");
        assert!(matches!(result, Err(FormatError::DataLoss(_))));
    }

    #[test]
    fn test_changed_token_text_is_data_loss() {
        let structure = TextStructure::from_source("assign x = 1;\n");
        let result = verify_formatting(&structure, "assign x = 2;\n");
        assert!(matches!(result, Err(FormatError::DataLoss(_))));
    }

    #[test]
    fn test_extra_token_is_data_loss() {
        let structure = TextStructure::from_source("assign x = 1;\n");
        let result = verify_formatting(&structure, "assign x = 1;;\n");
        assert!(matches!(result, Err(FormatError::DataLoss(_))));
    }

    #[test]
    fn test_unterminated_output_is_data_loss() {
        let structure = TextStructure::from_source("assign x = 1;\n");
        let result = verify_formatting(&structure, "assign x = 1; /* oops\n");
        assert!(matches!(result, Err(FormatError::DataLoss(_))));
    }
}
