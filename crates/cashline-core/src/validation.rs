//! # Validation Module
//!
//! Input validation for caller-supplied identifiers and text.
//!
//! Tender amount validation lives on [`crate::tender::TenderAmounts`]
//! itself (the constructor IS the validator); this module covers the
//! string inputs around it.

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of a register identifier.
pub const MAX_REGISTER_ID_LEN: usize = 64;

/// Maximum length of an operator identifier (opened_by / closed_by / resolved_by).
pub const MAX_OPERATOR_LEN: usize = 100;

/// Maximum length of resolution notes.
pub const MAX_NOTES_LEN: usize = 500;

/// Validates a register identifier.
///
/// ## Rules
/// - Must not be empty
/// - At most 64 characters
///
/// ## Returns
/// The trimmed identifier.
///
/// ## Example
/// ```rust
/// use cashline_core::validation::validate_register_id;
///
/// assert_eq!(validate_register_id(" REG-01 ").unwrap(), "REG-01");
/// assert!(validate_register_id("").is_err());
/// ```
pub fn validate_register_id(register_id: &str) -> ValidationResult<String> {
    let register_id = register_id.trim();

    if register_id.is_empty() {
        return Err(ValidationError::Required {
            field: "register_id".to_string(),
        });
    }

    if register_id.len() > MAX_REGISTER_ID_LEN {
        return Err(ValidationError::TooLong {
            field: "register_id".to_string(),
            max: MAX_REGISTER_ID_LEN,
        });
    }

    Ok(register_id.to_string())
}

/// Validates an operator identifier (whoever opened, closed, or resolved).
///
/// ## Rules
/// - Must not be empty
/// - At most 100 characters
///
/// ## Returns
/// The trimmed identifier.
pub fn validate_operator(field: &str, operator: &str) -> ValidationResult<String> {
    let operator = operator.trim();

    if operator.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if operator.len() > MAX_OPERATOR_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_OPERATOR_LEN,
        });
    }

    Ok(operator.to_string())
}

/// Validates resolution notes.
///
/// ## Rules
/// - May be empty (an approval needs no commentary)
/// - At most 500 characters
///
/// ## Returns
/// The trimmed notes.
pub fn validate_notes(notes: &str) -> ValidationResult<String> {
    let notes = notes.trim();

    if notes.len() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(notes.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_id_trims() {
        assert_eq!(validate_register_id("  REG-01  ").unwrap(), "REG-01");
    }

    #[test]
    fn test_register_id_required() {
        assert!(matches!(
            validate_register_id("   "),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_register_id_too_long() {
        let long = "R".repeat(MAX_REGISTER_ID_LEN + 1);
        assert!(matches!(
            validate_register_id(&long),
            Err(ValidationError::TooLong { .. })
        ));
    }

    #[test]
    fn test_operator_field_name_in_error() {
        let err = validate_operator("closed_by", "").unwrap_err();
        assert_eq!(err.to_string(), "closed_by is required");
    }

    #[test]
    fn test_notes_may_be_empty() {
        assert_eq!(validate_notes("").unwrap(), "");
        assert_eq!(validate_notes("  cashier shortage  ").unwrap(), "cashier shortage");
    }

    #[test]
    fn test_notes_too_long() {
        let long = "n".repeat(MAX_NOTES_LEN + 1);
        assert!(matches!(
            validate_notes(&long),
            Err(ValidationError::TooLong { .. })
        ));
    }
}
