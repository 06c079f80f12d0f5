//! # Adjustment Outbox Repository
//!
//! Manages the queue of correcting-entry requests produced by write-off
//! resolutions.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Outbox Pattern Implementation                          │
//! │                                                                         │
//! │  RESOLVE WITH WRITE-OFF                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE register_sessions SET status = 'resolved' ...       │   │
//! │  │                                                                 │   │
//! │  │  2. INSERT INTO adjustment_outbox (session_id, tender, amount) │   │
//! │  │     one row per nonzero tender discrepancy                     │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail (atomicity guaranteed)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DISPATCH WORKER (embedding application)                               │
//! │    1. pending(n)                                                       │
//! │    2. hand each AdjustmentRequested to the external ledger             │
//! │    3. mark_dispatched() on success, record_failure() on error          │
//! │                                                                         │
//! │  KEY GUARANTEE: a resolved write-off can never lose its correcting     │
//! │  entries, and correcting entries can never exist for an unresolved     │
//! │  session.                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cashline_core::{AdjustmentOutboxEntry, AdjustmentRequested};

/// Queues one adjustment inside an already-open transaction.
///
/// Called by `SessionRepository::resolve_session` so the outbox rows and
/// the resolving status update commit together.
pub(crate) async fn queue_adjustment(
    tx: &mut Transaction<'_, Sqlite>,
    adjustment: &AdjustmentRequested,
    created_at: DateTime<Utc>,
) -> DbResult<()> {
    let id = Uuid::new_v4().to_string();

    debug!(
        session_id = %adjustment.session_id,
        tender = %adjustment.tender,
        amount = %adjustment.amount,
        "Queuing adjustment request"
    );

    sqlx::query(
        r#"
        INSERT INTO adjustment_outbox (
            id, session_id, tender, amount_cents,
            attempts, last_error, created_at, dispatched_at
        ) VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, NULL)
        "#,
    )
    .bind(id)
    .bind(&adjustment.session_id)
    .bind(adjustment.tender)
    .bind(adjustment.amount.cents())
    .bind(created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Repository for adjustment outbox operations.
#[derive(Debug, Clone)]
pub struct AdjustmentOutboxRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: String,
    session_id: String,
    tender: cashline_core::PaymentMethod,
    amount_cents: i64,
    attempts: i64,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    dispatched_at: Option<DateTime<Utc>>,
}

impl From<OutboxRow> for AdjustmentOutboxEntry {
    fn from(row: OutboxRow) -> Self {
        AdjustmentOutboxEntry {
            id: row.id,
            session_id: row.session_id,
            tender: row.tender,
            amount_cents: row.amount_cents,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            dispatched_at: row.dispatched_at,
        }
    }
}

impl AdjustmentOutboxRepository {
    /// Creates a new AdjustmentOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdjustmentOutboxRepository { pool }
    }

    /// Gets entries that still need dispatching.
    ///
    /// ## Returns
    /// Entries where `dispatched_at IS NULL`, oldest first.
    pub async fn pending(&self, limit: u32) -> DbResult<Vec<AdjustmentOutboxEntry>> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, tender, amount_cents,
                   attempts, last_error, created_at, dispatched_at
            FROM adjustment_outbox
            WHERE dispatched_at IS NULL
            ORDER BY created_at ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// All adjustments ever requested for a session, oldest first.
    pub async fn for_session(&self, session_id: &str) -> DbResult<Vec<AdjustmentOutboxEntry>> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT id, session_id, tender, amount_cents,
                   attempts, last_error, created_at, dispatched_at
            FROM adjustment_outbox
            WHERE session_id = ?1
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Marks an entry as successfully handed to the ledger.
    pub async fn mark_dispatched(&self, id: &str) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE adjustment_outbox
            SET dispatched_at = ?2, attempts = attempts + 1
            WHERE id = ?1 AND dispatched_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Adjustment (pending)", id));
        }

        Ok(())
    }

    /// Records a failed dispatch attempt.
    ///
    /// The entry stays pending; the worker will pick it up again.
    pub async fn record_failure(&self, id: &str, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE adjustment_outbox
            SET attempts = attempts + 1, last_error = ?2
            WHERE id = ?1 AND dispatched_at IS NULL
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Adjustment (pending)", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cashline_core::{
        Money, PaymentMethod, RegisterSession, Resolution, ResolutionAction, SessionStatus,
        TenderAmounts,
    };
    use std::collections::BTreeMap;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    /// Seeds one resolved session with two queued adjustments.
    async fn seed(db: &Database) -> String {
        let opened_at = ts("2026-08-06T09:00:00Z");
        let session = RegisterSession {
            id: Uuid::new_v4().to_string(),
            register_id: "REG-01".to_string(),
            status: SessionStatus::Open,
            opened_by: "alice".to_string(),
            opened_at,
            closed_by: None,
            closed_at: None,
            opening_balances: TenderAmounts::zeroed(),
            closing_balances: None,
            expected_balances: None,
            discrepancies: None,
            resolution: None,
            version: 1,
            created_at: opened_at,
            updated_at: opened_at,
        };
        let repo = db.sessions();
        repo.insert_open(&session).await.unwrap();

        let mut disc = BTreeMap::new();
        disc.insert(PaymentMethod::Cash, Money::from_cents(500));
        disc.insert(PaymentMethod::Card, Money::from_cents(-500));
        let discrepancies = TenderAmounts::filled(disc);

        repo.close_session(
            &session.id,
            1,
            "bob",
            ts("2026-08-06T17:00:00Z"),
            SessionStatus::DiscrepancyPending,
            &discrepancies,
            &TenderAmounts::zeroed(),
            &discrepancies,
        )
        .await
        .unwrap();

        let resolution = Resolution {
            action: ResolutionAction::WriteOff,
            notes: String::new(),
            resolved_by: "carol".to_string(),
            resolved_at: ts("2026-08-06T18:00:00Z"),
        };
        let adjustments = vec![
            AdjustmentRequested {
                session_id: session.id.clone(),
                tender: PaymentMethod::Cash,
                amount: Money::from_cents(500),
            },
            AdjustmentRequested {
                session_id: session.id.clone(),
                tender: PaymentMethod::Card,
                amount: Money::from_cents(-500),
            },
        ];
        repo.resolve_session(&session.id, 2, &resolution, &adjustments)
            .await
            .unwrap();

        session.id
    }

    #[tokio::test]
    async fn test_pending_lifecycle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session_id = seed(&db).await;
        let outbox = db.adjustments();

        let pending = outbox.pending(10).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|e| e.session_id == session_id));
        assert!(pending.iter().all(|e| e.dispatched_at.is_none()));

        outbox.mark_dispatched(&pending[0].id).await.unwrap();
        let rest = outbox.pending(10).await.unwrap();
        assert_eq!(rest.len(), 1);

        // Already dispatched: not pending any more.
        let err = outbox.mark_dispatched(&pending[0].id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // Full history still visible per session.
        let all = outbox.for_session(&session_id).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_record_failure_keeps_entry_pending() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed(&db).await;
        let outbox = db.adjustments();

        let pending = outbox.pending(10).await.unwrap();
        outbox
            .record_failure(&pending[0].id, "ledger unreachable")
            .await
            .unwrap();

        let still_pending = outbox.pending(10).await.unwrap();
        assert_eq!(still_pending.len(), 2);
        let failed = still_pending
            .iter()
            .find(|e| e.id == pending[0].id)
            .unwrap();
        assert_eq!(failed.attempts, 1);
        assert_eq!(failed.last_error.as_deref(), Some("ledger unreachable"));
    }
}
