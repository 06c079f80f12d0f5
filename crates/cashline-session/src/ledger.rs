//! # Ledger Gateway
//!
//! The port to the external transaction ledger.
//!
//! The ledger owns transaction records; this subsystem only READS
//! tender-attributed deltas scoped to a session's open-to-close window,
//! and it reads them exactly once - at close time, to freeze the expected
//! balances. Writes back to the ledger happen only through the adjustment
//! outbox, never through this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

use cashline_core::{Money, PaymentMethod, TenderDelta};

// =============================================================================
// Errors
// =============================================================================

/// Ledger collaborator failures.
///
/// Infrastructure errors, not workflow signals: the close that hit one
/// simply did not happen, and the session stays open.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger could not be reached.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger refused or could not serve the snapshot request.
    #[error("Ledger rejected snapshot request: {0}")]
    Rejected(String),
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Read-only access to tender-attributed deltas for a session.
///
/// Implementations must return a snapshot that is consistent and complete
/// as of `closed_at`: every delta for the session timestamped at or before
/// that instant, in any order. Order does not matter - the reconciliation
/// math only sums.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// All deltas for `session_id` recorded within `[opened_at, closed_at]`.
    async fn deltas_between(
        &self,
        session_id: &str,
        opened_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
    ) -> Result<Vec<TenderDelta>, LedgerError>;
}

// =============================================================================
// In-Memory Ledger
// =============================================================================

/// An in-process [`LedgerGateway`] for tests and local development.
///
/// ## Usage
/// ```rust
/// use cashline_core::{Money, PaymentMethod};
/// use cashline_session::ledger::MemoryLedger;
///
/// let ledger = MemoryLedger::new();
/// ledger.record("session-1", PaymentMethod::Cash, Money::from_cents(5000));
/// ledger.record("session-1", PaymentMethod::Cash, Money::from_cents(-1000));
/// ```
#[derive(Debug, Default)]
pub struct MemoryLedger {
    deltas: Mutex<HashMap<String, Vec<TenderDelta>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a delta for a session, timestamped now.
    pub fn record(&self, session_id: &str, tender: PaymentMethod, amount: Money) {
        self.record_delta(session_id, TenderDelta::new(tender, amount, Utc::now()));
    }

    /// Records a pre-built delta (lets tests control `recorded_at`).
    pub fn record_delta(&self, session_id: &str, delta: TenderDelta) {
        let mut deltas = self.deltas.lock().expect("ledger mutex poisoned");
        deltas.entry(session_id.to_string()).or_default().push(delta);
    }
}

#[async_trait]
impl LedgerGateway for MemoryLedger {
    async fn deltas_between(
        &self,
        session_id: &str,
        opened_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
    ) -> Result<Vec<TenderDelta>, LedgerError> {
        let deltas = self.deltas.lock().expect("ledger mutex poisoned");
        Ok(deltas
            .get(session_id)
            .map(|session_deltas| {
                session_deltas
                    .iter()
                    .filter(|d| d.recorded_at >= opened_at && d.recorded_at <= closed_at)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_memory_ledger_scopes_by_session_and_window() {
        let ledger = MemoryLedger::new();
        ledger.record_delta(
            "s1",
            TenderDelta::new(
                PaymentMethod::Cash,
                Money::from_cents(5000),
                ts("2026-08-06T10:00:00Z"),
            ),
        );
        ledger.record_delta(
            "s1",
            TenderDelta::new(
                PaymentMethod::Cash,
                Money::from_cents(999),
                ts("2026-08-06T20:00:00Z"), // after close
            ),
        );
        ledger.record_delta(
            "s2",
            TenderDelta::new(
                PaymentMethod::Card,
                Money::from_cents(100),
                ts("2026-08-06T10:00:00Z"),
            ),
        );

        let snapshot = ledger
            .deltas_between("s1", ts("2026-08-06T09:00:00Z"), ts("2026-08-06T17:00:00Z"))
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].amount.cents(), 5000);

        let empty = ledger
            .deltas_between("s3", ts("2026-08-06T09:00:00Z"), ts("2026-08-06T17:00:00Z"))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }
}
