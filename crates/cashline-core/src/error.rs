//! # Error Types
//!
//! Domain-specific error types for cashline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cashline-core errors (this file)                                      │
//! │  ├── CoreError        - State machine and concurrency violations       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cashline-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  cashline-session errors (separate crate)                              │
//! │  └── SessionError     - What the embedding app sees (composed)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SessionError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (register, session, versions)
//! 3. Errors are enum variants, never String
//! 4. None of these are transient: every one is a decision point for the
//!    caller, not infrastructure flakiness. Nothing here is auto-retried.

use thiserror::Error;

use crate::types::{PaymentMethod, SessionStatus};

// =============================================================================
// Core Error
// =============================================================================

/// State machine and concurrency violations.
///
/// These are workflow signals, not bugs: the caller is expected to
/// re-fetch current state and decide its next action.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The register already has an open session.
    ///
    /// ## When This Occurs
    /// - Opening a till whose previous session was never closed
    /// - Losing the race between two concurrent opens on one register
    ///
    /// The caller must close or resolve the existing session first; this
    /// is never retried automatically.
    #[error("Register {register_id} already has an open session")]
    AlreadyOpen { register_id: String },

    /// The session is not open, so it cannot be closed.
    ///
    /// ## When This Occurs
    /// - Closing a session that is already in the discrepancy workflow
    #[error("Session {session_id} is {status}, expected open")]
    NotOpen {
        session_id: String,
        status: SessionStatus,
    },

    /// The session's status forbids the requested transition.
    ///
    /// ## When This Occurs
    /// - Any mutation against a terminal session (closed balanced or
    ///   resolved) - sessions are an immutable audit trail once terminal
    /// - Resolving a session that has no pending discrepancy
    #[error("Session {session_id} is {status}, cannot perform operation")]
    InvalidState {
        session_id: String,
        status: SessionStatus,
    },

    /// Another writer won the race.
    ///
    /// ## When This Occurs
    /// - Two managers act on the same session concurrently; the
    ///   compare-and-swap claims exactly one winner
    ///
    /// The current version is included so the caller can re-fetch and
    /// decide whether to retry. Retrying silently could double-process a
    /// discrepancy, so that decision is never made here.
    #[error(
        "Session {session_id} version conflict: expected {expected_version}, current {current_version}"
    )]
    VersionConflict {
        session_id: String,
        expected_version: i64,
        current_version: i64,
    },

    /// Unknown session ID.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Unrecognized resolution action.
    #[error("Unrecognized resolution action: '{action}'")]
    InvalidAction { action: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller-supplied data doesn't meet requirements.
/// Used for early validation before the state machine runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// A counted tender amount is negative.
    ///
    /// Physical drawer counts cannot be negative; ledger deltas can, but
    /// those never pass through this check.
    #[error("{tender} amount must not be negative")]
    NegativeAmount { tender: PaymentMethod },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::AlreadyOpen {
            register_id: "REG-01".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Register REG-01 already has an open session"
        );

        let err = CoreError::VersionConflict {
            session_id: "abc".to_string(),
            expected_version: 1,
            current_version: 2,
        };
        assert_eq!(
            err.to_string(),
            "Session abc version conflict: expected 1, current 2"
        );
    }

    #[test]
    fn test_status_in_message() {
        let err = CoreError::InvalidState {
            session_id: "abc".to_string(),
            status: SessionStatus::Resolved,
        };
        assert_eq!(
            err.to_string(),
            "Session abc is resolved, cannot perform operation"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "opened_by".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_negative_amount_message() {
        let err = ValidationError::NegativeAmount {
            tender: PaymentMethod::Cash,
        };
        assert_eq!(err.to_string(), "cash amount must not be negative");
    }
}
