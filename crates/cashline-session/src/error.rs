//! # Service Error Types
//!
//! What the embedding application sees: the domain taxonomy from
//! cashline-core, storage failures from cashline-db, and ledger
//! collaborator failures - composed, not flattened, so callers can match
//! on the layer that failed.
//!
//! ## Retry Semantics
//! None of the domain variants are transient. `VersionConflict` invites a
//! re-fetch and a HUMAN decision, `AlreadyOpen` means close the other
//! session first, and validation errors need corrected input. `Storage`
//! and `Ledger` are infrastructure failures: fatal to the operation that
//! hit them, handled by whatever supervises the storage/ledger, not by
//! retrying here.

use thiserror::Error;

use crate::ledger::LedgerError;
use cashline_core::{CoreError, ValidationError};
use cashline_db::DbError;

/// Errors surfaced by [`crate::SessionManager`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// A domain rule said no: state machine, exclusivity, versioning,
    /// or input validation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The session store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),

    /// The ledger collaborator failed to supply a snapshot.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Validation failures flow through the domain taxonomy.
impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::Domain(CoreError::Validation(err))
    }
}

/// Result type for session service operations.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_pass_through_transparently() {
        let err: SessionError = CoreError::SessionNotFound("abc".to_string()).into();
        assert_eq!(err.to_string(), "Session not found: abc");
    }

    #[test]
    fn test_validation_routes_into_domain() {
        let err: SessionError = ValidationError::Required {
            field: "register_id".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            SessionError::Domain(CoreError::Validation(_))
        ));
    }
}
