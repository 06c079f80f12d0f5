//! # Session Manager
//!
//! The open/close/resolve state machine over the session store, plus the
//! close-time reconciliation drive.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Every Mutation Follows One Shape                        │
//! │                                                                         │
//! │  validate inputs (pure, cashline-core)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load current session row                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  status + version preconditions  ──── violation ──► domain error       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute (reconcile / build resolution)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compare-and-swap UPDATE  ──── lost race ──► VersionConflict with      │
//! │       │                                      the CURRENT version        │
//! │       ▼                                                                 │
//! │  re-read and return the stored session                                  │
//! │                                                                         │
//! │  The precondition check is a fast path for good error messages; the    │
//! │  CAS is what actually decides races. Both report the same taxonomy.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};
use crate::ledger::LedgerGateway;
use cashline_core::validation::{validate_notes, validate_operator, validate_register_id};
use cashline_core::{
    reconcile, AdjustmentOutboxEntry, AdjustmentRequested, CoreError, Money, PaymentMethod,
    RegisterSession, Resolution, ResolutionAction, SessionStatus, TenderAmounts,
};
use cashline_db::{Database, DbError};

// =============================================================================
// Session Manager
// =============================================================================

/// The service facade for register session lifecycle and reconciliation.
///
/// Synchronous request/response: no background threads, no timers. Safe to
/// clone and call concurrently - races are decided by the store's unique
/// index and compare-and-swap updates, never by in-process locks.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    ledger: Arc<dyn LedgerGateway>,
}

impl SessionManager {
    /// Creates a manager over an initialized database and a ledger port.
    pub fn new(db: Database, ledger: Arc<dyn LedgerGateway>) -> Self {
        SessionManager { db, ledger }
    }

    // -------------------------------------------------------------------------
    // Open
    // -------------------------------------------------------------------------

    /// Opens a till: creates a new session with status `Open`, version 1.
    ///
    /// ## Rules
    /// - `opening_counts` must be non-negative; missing tenders default to
    ///   zero
    /// - At most one open session per register: a racing or leftover open
    ///   session yields [`CoreError::AlreadyOpen`], and the caller must
    ///   close or resolve it first - never retried automatically
    pub async fn open(
        &self,
        register_id: &str,
        opened_by: &str,
        opening_counts: BTreeMap<PaymentMethod, Money>,
    ) -> SessionResult<RegisterSession> {
        let register_id = validate_register_id(register_id)?;
        let opened_by = validate_operator("opened_by", opened_by)?;
        let opening_balances = TenderAmounts::from_counts(opening_counts)?;

        let now = Utc::now();
        let session = RegisterSession {
            id: Uuid::new_v4().to_string(),
            register_id: register_id.clone(),
            status: SessionStatus::Open,
            opened_by,
            opened_at: now,
            closed_by: None,
            closed_at: None,
            opening_balances,
            closing_balances: None,
            expected_balances: None,
            discrepancies: None,
            resolution: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        debug!(register_id = %register_id, session_id = %session.id, "Opening register session");

        match self.db.sessions().insert_open(&session).await {
            Ok(()) => {
                info!(
                    session_id = %session.id,
                    register_id = %register_id,
                    opened_by = %session.opened_by,
                    opening_total = %session.opening_balances.total(),
                    "Register session opened"
                );
                Ok(session)
            }
            // The partial unique index is the atomic check-and-create;
            // translate its violation into the domain signal.
            Err(DbError::UniqueViolation { .. }) => {
                warn!(register_id = %register_id, "Open rejected: register already has an open session");
                Err(CoreError::AlreadyOpen { register_id }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    // -------------------------------------------------------------------------
    // Close
    // -------------------------------------------------------------------------

    /// Closes a till against physically counted balances.
    ///
    /// Pulls the ledger snapshot for the session's open window, freezes
    /// expected balances and per-tender discrepancies, and transitions to
    /// `ClosedBalanced` (every tender exactly zero) or
    /// `DiscrepancyPending` (any tender off by any amount - the net sum is
    /// never consulted).
    pub async fn close(
        &self,
        session_id: &str,
        expected_version: i64,
        closed_by: &str,
        closing_counts: BTreeMap<PaymentMethod, Money>,
    ) -> SessionResult<RegisterSession> {
        let closed_by = validate_operator("closed_by", closed_by)?;
        let closing_balances = TenderAmounts::from_counts(closing_counts)?;

        let session = self.fetch(session_id).await?;

        if session.is_terminal() {
            return Err(CoreError::InvalidState {
                session_id: session.id,
                status: session.status,
            }
            .into());
        }
        if !session.is_open() {
            return Err(CoreError::NotOpen {
                session_id: session.id,
                status: session.status,
            }
            .into());
        }
        if session.version != expected_version {
            return Err(CoreError::VersionConflict {
                session_id: session.id,
                expected_version,
                current_version: session.version,
            }
            .into());
        }

        let closed_at = Utc::now();

        // One bounded read of the collaborator; its failure aborts the
        // close and leaves the session open.
        let deltas = self
            .ledger
            .deltas_between(&session.id, session.opened_at, closed_at)
            .await?;

        debug!(
            session_id = %session.id,
            delta_count = deltas.len(),
            "Ledger snapshot fetched for close"
        );

        let outcome = reconcile(&session.opening_balances, &deltas, &closing_balances);
        let new_status = if outcome.is_balanced() {
            SessionStatus::ClosedBalanced
        } else {
            SessionStatus::DiscrepancyPending
        };

        let claimed = self
            .db
            .sessions()
            .close_session(
                &session.id,
                expected_version,
                &closed_by,
                closed_at,
                new_status,
                &closing_balances,
                &outcome.expected,
                &outcome.discrepancies,
            )
            .await?;

        if !claimed {
            return Err(self.lost_race(&session.id, expected_version).await?);
        }

        info!(
            session_id = %session.id,
            status = %new_status,
            total_discrepancy = %outcome.total_discrepancy(),
            "Register session closed"
        );

        self.fetch(&session.id).await
    }

    // -------------------------------------------------------------------------
    // Resolve
    // -------------------------------------------------------------------------

    /// Resolves a discrepancy-pending session.
    ///
    /// All three actions finalize the session (it becomes immutable);
    /// `WriteOff` additionally queues one [`AdjustmentRequested`] per
    /// nonzero tender discrepancy, in the same transaction as the status
    /// update, instructing the external ledger to post correcting entries.
    pub async fn resolve(
        &self,
        session_id: &str,
        expected_version: i64,
        resolved_by: &str,
        action: ResolutionAction,
        notes: &str,
    ) -> SessionResult<RegisterSession> {
        let resolved_by = validate_operator("resolved_by", resolved_by)?;
        let notes = validate_notes(notes)?;

        let session = self.fetch(session_id).await?;

        if session.status != SessionStatus::DiscrepancyPending {
            return Err(CoreError::InvalidState {
                session_id: session.id,
                status: session.status,
            }
            .into());
        }
        if session.version != expected_version {
            return Err(CoreError::VersionConflict {
                session_id: session.id,
                expected_version,
                current_version: session.version,
            }
            .into());
        }

        let resolution = Resolution {
            action,
            notes,
            resolved_by,
            resolved_at: Utc::now(),
        };

        // Write-off: one correcting entry per tender that is actually off.
        let adjustments: Vec<AdjustmentRequested> = match (action, &session.discrepancies) {
            (ResolutionAction::WriteOff, Some(discrepancies)) => discrepancies
                .nonzero()
                .map(|(tender, amount)| AdjustmentRequested {
                    session_id: session.id.clone(),
                    tender,
                    amount,
                })
                .collect(),
            _ => Vec::new(),
        };

        let claimed = self
            .db
            .sessions()
            .resolve_session(&session.id, expected_version, &resolution, &adjustments)
            .await?;

        if !claimed {
            return Err(self.lost_race(&session.id, expected_version).await?);
        }

        info!(
            session_id = %session.id,
            action = %action,
            resolved_by = %resolution.resolved_by,
            adjustments = adjustments.len(),
            "Register session resolved"
        );

        self.fetch(&session.id).await
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Fetches a session by ID.
    ///
    /// Callers use this to refresh `version` after a
    /// [`CoreError::VersionConflict`] before deciding whether to retry.
    pub async fn get_session(&self, session_id: &str) -> SessionResult<RegisterSession> {
        self.fetch(session_id).await
    }

    /// The register's currently open session, if any.
    pub async fn open_session_for_register(
        &self,
        register_id: &str,
    ) -> SessionResult<Option<RegisterSession>> {
        let register_id = validate_register_id(register_id)?;
        Ok(self
            .db
            .sessions()
            .find_open_by_register(&register_id)
            .await?)
    }

    /// Recent sessions for a register, newest first (the audit trail).
    pub async fn sessions_for_register(
        &self,
        register_id: &str,
        limit: u32,
    ) -> SessionResult<Vec<RegisterSession>> {
        let register_id = validate_register_id(register_id)?;
        Ok(self.db.sessions().list_by_register(&register_id, limit).await?)
    }

    // -------------------------------------------------------------------------
    // Adjustment Outbox
    // -------------------------------------------------------------------------

    /// Adjustment requests not yet handed to the ledger, oldest first.
    pub async fn pending_adjustments(
        &self,
        limit: u32,
    ) -> SessionResult<Vec<AdjustmentOutboxEntry>> {
        Ok(self.db.adjustments().pending(limit).await?)
    }

    /// Marks an adjustment as dispatched to the ledger.
    pub async fn mark_adjustment_dispatched(&self, adjustment_id: &str) -> SessionResult<()> {
        Ok(self.db.adjustments().mark_dispatched(adjustment_id).await?)
    }

    /// Records a failed dispatch attempt; the entry stays pending.
    pub async fn record_adjustment_failure(
        &self,
        adjustment_id: &str,
        error: &str,
    ) -> SessionResult<()> {
        Ok(self
            .db
            .adjustments()
            .record_failure(adjustment_id, error)
            .await?)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    async fn fetch(&self, session_id: &str) -> SessionResult<RegisterSession> {
        self.db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()).into())
    }

    /// Builds the error for a lost compare-and-swap: re-reads the row so
    /// the conflict carries the CURRENT version for the caller's re-fetch
    /// decision.
    async fn lost_race(
        &self,
        session_id: &str,
        expected_version: i64,
    ) -> SessionResult<SessionError> {
        let current = self.fetch(session_id).await?;
        warn!(
            session_id = %session_id,
            expected_version,
            current_version = current.version,
            "Lost compare-and-swap race"
        );
        Ok(CoreError::VersionConflict {
            session_id: session_id.to_string(),
            expected_version,
            current_version: current.version,
        }
        .into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
