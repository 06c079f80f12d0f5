//! # Session Repository
//!
//! Database operations for register sessions.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Register Session Lifecycle                           │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── insert_open() → row { status: open, version: 1 }               │
//! │         The partial unique index rejects a second open row for the     │
//! │         same register: check-and-create is one atomic INSERT.          │
//! │                                                                         │
//! │  2. CLOSE                                                              │
//! │     └── close_session() → UPDATE ... WHERE id = ? AND version = ?      │
//! │                                      AND status = 'open'               │
//! │         Writes counted/expected/discrepancy maps, bumps version.       │
//! │         rows_affected = 0 means another writer won the race.           │
//! │                                                                         │
//! │  3. (IF PENDING) RESOLVE                                               │
//! │     └── resolve_session() → same CAS shape, status guard               │
//! │         'discrepancy_pending', plus adjustment outbox rows in the      │
//! │         SAME transaction for write-offs.                               │
//! │                                                                         │
//! │  Terminal rows are never updated or deleted: the WHERE status guard    │
//! │  makes them unreachable by any mutation in this file.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::outbox;
use cashline_core::{
    AdjustmentRequested, RegisterSession, Resolution, ResolutionAction, SessionStatus,
    TenderAmounts,
};

/// Repository for register session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

/// Raw row shape; tender maps arrive as JSON TEXT and are decoded in
/// [`row_to_session`].
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    register_id: String,
    status: SessionStatus,
    opened_by: String,
    opened_at: DateTime<Utc>,
    closed_by: Option<String>,
    closed_at: Option<DateTime<Utc>>,
    opening_balances: String,
    closing_balances: Option<String>,
    expected_balances: Option<String>,
    discrepancies: Option<String>,
    resolution_action: Option<ResolutionAction>,
    resolution_notes: Option<String>,
    resolved_by: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

const SELECT_COLUMNS: &str = r#"
    id,
    register_id,
    status,
    opened_by,
    opened_at,
    closed_by,
    closed_at,
    opening_balances,
    closing_balances,
    expected_balances,
    discrepancies,
    resolution_action,
    resolution_notes,
    resolved_by,
    resolved_at,
    version,
    created_at,
    updated_at
"#;

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Inserts a freshly opened session.
    ///
    /// The partial unique index over `(register_id) WHERE status = 'open'`
    /// makes this the atomic check-and-create for register exclusivity:
    /// a racing second open surfaces as [`DbError::UniqueViolation`].
    pub async fn insert_open(&self, session: &RegisterSession) -> DbResult<()> {
        debug!(id = %session.id, register_id = %session.register_id, "Inserting open session");

        let opening = encode_amounts(&session.opening_balances)?;

        sqlx::query(
            r#"
            INSERT INTO register_sessions (
                id, register_id, status,
                opened_by, opened_at,
                opening_balances,
                version, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&session.id)
        .bind(&session.register_id)
        .bind(session.status)
        .bind(&session.opened_by)
        .bind(session.opened_at)
        .bind(opening)
        .bind(session.version)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a session by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<RegisterSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM register_sessions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_session).transpose()
    }

    /// Gets the open session for a register, if one exists.
    ///
    /// At most one row can match thanks to the partial unique index.
    pub async fn find_open_by_register(
        &self,
        register_id: &str,
    ) -> DbResult<Option<RegisterSession>> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM register_sessions \
             WHERE register_id = ?1 AND status = 'open'"
        ))
        .bind(register_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_session).transpose()
    }

    /// Recent sessions for a register, newest first.
    ///
    /// Sessions are never deleted, so this is the register's audit trail.
    pub async fn list_by_register(
        &self,
        register_id: &str,
        limit: u32,
    ) -> DbResult<Vec<RegisterSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM register_sessions \
             WHERE register_id = ?1 ORDER BY opened_at DESC LIMIT ?2"
        ))
        .bind(register_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_session).collect()
    }

    /// Closes a session: compare-and-swap on `(id, version, status)`.
    ///
    /// Writes the counted closing balances and the frozen reconciliation
    /// output, transitions the status, and bumps `version`.
    ///
    /// ## Returns
    /// `true` if this call claimed the row; `false` if the guard did not
    /// match (stale version, or another writer already moved the session
    /// out of `open`). The caller decides what `false` means - this layer
    /// only reports the lost race.
    #[allow(clippy::too_many_arguments)]
    pub async fn close_session(
        &self,
        session_id: &str,
        expected_version: i64,
        closed_by: &str,
        closed_at: DateTime<Utc>,
        new_status: SessionStatus,
        closing: &TenderAmounts,
        expected: &TenderAmounts,
        discrepancies: &TenderAmounts,
    ) -> DbResult<bool> {
        let closing_json = encode_amounts(closing)?;
        let expected_json = encode_amounts(expected)?;
        let discrepancies_json = encode_amounts(discrepancies)?;

        let result = sqlx::query(
            r#"
            UPDATE register_sessions SET
                status = ?1,
                closed_by = ?2,
                closed_at = ?3,
                closing_balances = ?4,
                expected_balances = ?5,
                discrepancies = ?6,
                version = version + 1,
                updated_at = ?7
            WHERE id = ?8 AND version = ?9 AND status = 'open'
            "#,
        )
        .bind(new_status)
        .bind(closed_by)
        .bind(closed_at)
        .bind(closing_json)
        .bind(expected_json)
        .bind(discrepancies_json)
        .bind(closed_at)
        .bind(session_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Resolves a discrepancy-pending session: compare-and-swap plus
    /// adjustment outbox rows in one transaction.
    ///
    /// For write-offs the caller supplies one [`AdjustmentRequested`] per
    /// nonzero tender discrepancy; both the status update and the outbox
    /// rows commit together or not at all.
    ///
    /// ## Returns
    /// `true` if this call claimed the row (and queued the adjustments);
    /// `false` if the guard did not match.
    pub async fn resolve_session(
        &self,
        session_id: &str,
        expected_version: i64,
        resolution: &Resolution,
        adjustments: &[AdjustmentRequested],
    ) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE register_sessions SET
                status = ?1,
                resolution_action = ?2,
                resolution_notes = ?3,
                resolved_by = ?4,
                resolved_at = ?5,
                version = version + 1,
                updated_at = ?6
            WHERE id = ?7 AND version = ?8 AND status = 'discrepancy_pending'
            "#,
        )
        .bind(SessionStatus::Resolved)
        .bind(resolution.action)
        .bind(&resolution.notes)
        .bind(&resolution.resolved_by)
        .bind(resolution.resolved_at)
        .bind(resolution.resolved_at)
        .bind(session_id)
        .bind(expected_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for adjustment in adjustments {
            outbox::queue_adjustment(&mut tx, adjustment, resolution.resolved_at).await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

// =============================================================================
// Row Conversion
// =============================================================================

fn encode_amounts(amounts: &TenderAmounts) -> DbResult<String> {
    serde_json::to_string(amounts)
        .map_err(|e| DbError::Internal(format!("tender map encode: {e}")))
}

fn decode_amounts(json: &str) -> DbResult<TenderAmounts> {
    serde_json::from_str(json).map_err(|e| DbError::Internal(format!("tender map decode: {e}")))
}

fn row_to_session(row: SessionRow) -> DbResult<RegisterSession> {
    let resolution = match (row.resolution_action, row.resolved_by, row.resolved_at) {
        (Some(action), Some(resolved_by), Some(resolved_at)) => Some(Resolution {
            action,
            notes: row.resolution_notes.unwrap_or_default(),
            resolved_by,
            resolved_at,
        }),
        _ => None,
    };

    Ok(RegisterSession {
        id: row.id,
        register_id: row.register_id,
        status: row.status,
        opened_by: row.opened_by,
        opened_at: row.opened_at,
        closed_by: row.closed_by,
        closed_at: row.closed_at,
        opening_balances: decode_amounts(&row.opening_balances)?,
        closing_balances: row.closing_balances.as_deref().map(decode_amounts).transpose()?,
        expected_balances: row.expected_balances.as_deref().map(decode_amounts).transpose()?,
        discrepancies: row.discrepancies.as_deref().map(decode_amounts).transpose()?,
        resolution,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use cashline_core::{Money, PaymentMethod};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn amounts(pairs: &[(PaymentMethod, i64)]) -> TenderAmounts {
        let mut map = BTreeMap::new();
        for (tender, cents) in pairs {
            map.insert(*tender, Money::from_cents(*cents));
        }
        TenderAmounts::filled(map)
    }

    fn open_session(register_id: &str) -> RegisterSession {
        let opened_at = ts("2026-08-06T09:00:00Z");
        RegisterSession {
            id: Uuid::new_v4().to_string(),
            register_id: register_id.to_string(),
            status: SessionStatus::Open,
            opened_by: "alice".to_string(),
            opened_at,
            closed_by: None,
            closed_at: None,
            opening_balances: amounts(&[(PaymentMethod::Cash, 10000)]),
            closing_balances: None,
            expected_balances: None,
            discrepancies: None,
            resolution: None,
            version: 1,
            created_at: opened_at,
            updated_at: opened_at,
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get_round_trip() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = open_session("REG-01");
        repo.insert_open(&session).await.unwrap();

        let loaded = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.register_id, "REG-01");
        assert_eq!(loaded.status, SessionStatus::Open);
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.opened_at, session.opened_at);
        assert_eq!(
            loaded.opening_balances.get(PaymentMethod::Cash).cents(),
            10000
        );
        assert_eq!(loaded.opening_balances.get(PaymentMethod::Card).cents(), 0);
        assert!(loaded.closing_balances.is_none());
        assert!(loaded.resolution.is_none());
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_none() {
        let db = test_db().await;
        assert!(db.sessions().get_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_open_for_register_violates_unique_index() {
        let db = test_db().await;
        let repo = db.sessions();

        repo.insert_open(&open_session("REG-01")).await.unwrap();
        let err = repo.insert_open(&open_session("REG-01")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // A different register is unaffected.
        repo.insert_open(&open_session("REG-02")).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_cas_claims_row_once() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = open_session("REG-01");
        repo.insert_open(&session).await.unwrap();

        let closed_at = ts("2026-08-06T17:00:00Z");
        let closing = amounts(&[(PaymentMethod::Cash, 13500)]);
        let expected = amounts(&[(PaymentMethod::Cash, 14000)]);
        let discrepancies = amounts(&[(PaymentMethod::Cash, -500)]);

        let claimed = repo
            .close_session(
                &session.id,
                1,
                "bob",
                closed_at,
                SessionStatus::DiscrepancyPending,
                &closing,
                &expected,
                &discrepancies,
            )
            .await
            .unwrap();
        assert!(claimed);

        // Same expected version again: the guard no longer matches.
        let claimed_again = repo
            .close_session(
                &session.id,
                1,
                "bob",
                closed_at,
                SessionStatus::DiscrepancyPending,
                &closing,
                &expected,
                &discrepancies,
            )
            .await
            .unwrap();
        assert!(!claimed_again);

        let loaded = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::DiscrepancyPending);
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.closed_by.as_deref(), Some("bob"));
        assert_eq!(loaded.closed_at, Some(closed_at));
        assert_eq!(
            loaded
                .discrepancies
                .unwrap()
                .get(PaymentMethod::Cash)
                .cents(),
            -500
        );
    }

    #[tokio::test]
    async fn test_resolve_cas_and_outbox_commit_together() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = open_session("REG-01");
        repo.insert_open(&session).await.unwrap();

        let closed_at = ts("2026-08-06T17:00:00Z");
        repo.close_session(
            &session.id,
            1,
            "bob",
            closed_at,
            SessionStatus::DiscrepancyPending,
            &amounts(&[(PaymentMethod::Cash, 13500)]),
            &amounts(&[(PaymentMethod::Cash, 14000)]),
            &amounts(&[(PaymentMethod::Cash, -500)]),
        )
        .await
        .unwrap();

        let resolution = Resolution {
            action: ResolutionAction::WriteOff,
            notes: "shortage written off".to_string(),
            resolved_by: "carol".to_string(),
            resolved_at: ts("2026-08-06T18:00:00Z"),
        };
        let adjustments = vec![AdjustmentRequested {
            session_id: session.id.clone(),
            tender: PaymentMethod::Cash,
            amount: Money::from_cents(-500),
        }];

        let claimed = repo
            .resolve_session(&session.id, 2, &resolution, &adjustments)
            .await
            .unwrap();
        assert!(claimed);

        let loaded = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Resolved);
        assert_eq!(loaded.version, 3);
        let stored = loaded.resolution.unwrap();
        assert_eq!(stored.action, ResolutionAction::WriteOff);
        assert_eq!(stored.resolved_by, "carol");

        let pending = db.adjustments().pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].session_id, session.id);
        assert_eq!(pending[0].amount_cents, -500);
    }

    #[tokio::test]
    async fn test_resolve_lost_race_queues_nothing() {
        let db = test_db().await;
        let repo = db.sessions();

        let session = open_session("REG-01");
        repo.insert_open(&session).await.unwrap();
        repo.close_session(
            &session.id,
            1,
            "bob",
            ts("2026-08-06T17:00:00Z"),
            SessionStatus::DiscrepancyPending,
            &amounts(&[(PaymentMethod::Cash, 13500)]),
            &amounts(&[(PaymentMethod::Cash, 14000)]),
            &amounts(&[(PaymentMethod::Cash, -500)]),
        )
        .await
        .unwrap();

        let resolution = Resolution {
            action: ResolutionAction::WriteOff,
            notes: String::new(),
            resolved_by: "carol".to_string(),
            resolved_at: ts("2026-08-06T18:00:00Z"),
        };
        let adjustments = vec![AdjustmentRequested {
            session_id: session.id.clone(),
            tender: PaymentMethod::Cash,
            amount: Money::from_cents(-500),
        }];

        // Stale version: guard does not match, nothing is queued.
        let claimed = repo
            .resolve_session(&session.id, 1, &resolution, &adjustments)
            .await
            .unwrap();
        assert!(!claimed);
        assert!(db.adjustments().pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_open_and_list_by_register() {
        let db = test_db().await;
        let repo = db.sessions();

        let mut first = open_session("REG-01");
        first.opened_at = ts("2026-08-05T09:00:00Z");
        first.created_at = first.opened_at;
        first.updated_at = first.opened_at;
        repo.insert_open(&first).await.unwrap();
        repo.close_session(
            &first.id,
            1,
            "bob",
            ts("2026-08-05T17:00:00Z"),
            SessionStatus::ClosedBalanced,
            &first.opening_balances,
            &first.opening_balances,
            &TenderAmounts::zeroed(),
        )
        .await
        .unwrap();

        let second = open_session("REG-01");
        repo.insert_open(&second).await.unwrap();

        let open = repo.find_open_by_register("REG-01").await.unwrap().unwrap();
        assert_eq!(open.id, second.id);
        assert!(repo.find_open_by_register("REG-99").await.unwrap().is_none());

        let history = repo.list_by_register("REG-01", 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id); // newest first
        assert_eq!(history[1].id, first.id);
    }
}
