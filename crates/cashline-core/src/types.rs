//! # Domain Types
//!
//! Core domain types for register session lifecycle and reconciliation.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │ RegisterSession  │   │   TenderDelta    │   │   Resolution     │    │
//! │  │  ──────────────  │   │  ──────────────  │   │  ──────────────  │    │
//! │  │  id (UUID)       │   │  tender          │   │  action          │    │
//! │  │  register_id     │   │  amount          │   │  notes           │    │
//! │  │  status          │   │  recorded_at     │   │  resolved_by     │    │
//! │  │  version         │   └──────────────────┘   │  resolved_at     │    │
//! │  │  tender maps ×4  │                          └──────────────────┘    │
//! │  └──────────────────┘                                                  │
//! │                                                                         │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────────┐    │
//! │  │  SessionStatus   │   │  PaymentMethod   │   │ ResolutionAction │    │
//! │  │  ──────────────  │   │  ──────────────  │   │  ──────────────  │    │
//! │  │  Open            │   │  Cash            │   │  Approve         │    │
//! │  │  ClosedBalanced  │   │  Card            │   │  Investigate     │    │
//! │  │  DiscrepancyPend │   │  Bank / Mobile   │   │  WriteOff        │    │
//! │  │  Resolved        │   │  Wave / NotSpec  │   └──────────────────┘    │
//! │  └──────────────────┘   └──────────────────┘                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session State Machine
//! ```text
//!               close (all tenders match)
//!        ┌──────────────────────────────────► CLOSED_BALANCED  (terminal)
//!        │
//!   OPEN ┤
//!        │       close (any tender off)              resolve
//!        └──────────────────────────────► DISCREPANCY_PENDING ────► RESOLVED
//!                                                                  (terminal)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::money::Money;
use crate::tender::TenderAmounts;

// =============================================================================
// Payment Method
// =============================================================================

/// A tender kind accepted at the register.
///
/// This is a CLOSED set: extending it is a schema change, not a runtime
/// decision. Every tender map in the system carries an entry for every
/// variant listed here, which is what makes per-tender reconciliation total.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash in the drawer.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Bank transfer.
    Bank,
    /// Mobile money.
    Mobile,
    /// Wave mobile money.
    Wave,
    /// Transactions recorded without a tender attribution.
    NotSpecified,
}

impl PaymentMethod {
    /// Every tender kind, in canonical order.
    ///
    /// Iterating this array is how tender maps guarantee completeness.
    pub const ALL: [PaymentMethod; 6] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Bank,
        PaymentMethod::Mobile,
        PaymentMethod::Wave,
        PaymentMethod::NotSpecified,
    ];

    /// The wire/database name of this tender.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Bank => "bank",
            PaymentMethod::Mobile => "mobile",
            PaymentMethod::Wave => "wave",
            PaymentMethod::NotSpecified => "not_specified",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// The lifecycle status of a register session.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Till is open and accumulating ledger deltas.
    Open,
    /// Closed with every tender reconciling to exactly zero.
    ClosedBalanced,
    /// Closed with at least one nonzero tender discrepancy; awaiting resolution.
    DiscrepancyPending,
    /// Discrepancy acknowledged via a resolution action.
    Resolved,
}

impl SessionStatus {
    /// Terminal statuses admit no further mutation, ever.
    ///
    /// Sessions are an immutable audit trail once they reach one of these.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::ClosedBalanced | SessionStatus::Resolved
        )
    }

    /// The wire/database name of this status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::ClosedBalanced => "closed_balanced",
            SessionStatus::DiscrepancyPending => "discrepancy_pending",
            SessionStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// How a manager disposed of a pending discrepancy.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    /// Accept the discrepancy as final; no further correction.
    Approve,
    /// Accept and flag for follow-up in external case management.
    /// The session itself still becomes immutable.
    Investigate,
    /// Accept and request a correcting ledger entry per nonzero tender.
    WriteOff,
}

impl ResolutionAction {
    /// The wire/database name of this action.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResolutionAction::Approve => "approve",
            ResolutionAction::Investigate => "investigate",
            ResolutionAction::WriteOff => "write_off",
        }
    }
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a caller-supplied action string.
///
/// Unrecognized input is a validation failure surfaced to the caller,
/// never a default.
impl FromStr for ResolutionAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "approve" => Ok(ResolutionAction::Approve),
            "investigate" => Ok(ResolutionAction::Investigate),
            "write_off" => Ok(ResolutionAction::WriteOff),
            other => Err(CoreError::InvalidAction {
                action: other.to_string(),
            }),
        }
    }
}

/// The recorded disposition of a discrepancy-pending session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: ResolutionAction,
    pub notes: String,
    pub resolved_by: String,
    pub resolved_at: DateTime<Utc>,
}

// =============================================================================
// Tender Delta
// =============================================================================

/// A tender-attributed monetary movement reported by the external ledger.
///
/// Positive deltas are sales and cash-ins; negative deltas are refunds,
/// cash-outs, and till payouts. The reconciliation math only ever sums
/// these, so the order they arrive in is irrelevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderDelta {
    pub tender: PaymentMethod,
    pub amount: Money,
    pub recorded_at: DateTime<Utc>,
}

impl TenderDelta {
    pub fn new(tender: PaymentMethod, amount: Money, recorded_at: DateTime<Utc>) -> Self {
        TenderDelta {
            tender,
            amount,
            recorded_at,
        }
    }
}

// =============================================================================
// Register Session
// =============================================================================

/// One open-to-close cycle of a physical till. The aggregate root.
///
/// ## Invariants
/// - At most one session with status `Open` exists per `register_id`
///   (enforced by the storage layer's partial unique index).
/// - Every tender map carries an entry for every [`PaymentMethod`]
///   (enforced by [`TenderAmounts`]).
/// - `expected_balances` and `discrepancies` are computed exactly once, at
///   close time, and never change afterwards - later-arriving ledger events
///   must not silently rewrite an already-reconciled shift.
/// - `version` increments on every state change and gates every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSession {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// The physical till this session owns while open.
    pub register_id: String,

    /// Lifecycle status.
    pub status: SessionStatus,

    /// Cashier who opened the till.
    pub opened_by: String,
    pub opened_at: DateTime<Utc>,

    /// Manager/cashier who closed the till. Set at close.
    pub closed_by: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,

    /// Counted starting balance per tender.
    pub opening_balances: TenderAmounts,

    /// Physically counted closing balance per tender. Set at close.
    pub closing_balances: Option<TenderAmounts>,

    /// Opening balance plus ledger deltas per tender. Frozen at close.
    pub expected_balances: Option<TenderAmounts>,

    /// `closing - expected` per tender. Frozen at close.
    pub discrepancies: Option<TenderAmounts>,

    /// Disposition of a pending discrepancy. Set at resolve.
    pub resolution: Option<Resolution>,

    /// Optimistic concurrency counter; starts at 1, bumps on every mutation.
    pub version: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegisterSession {
    /// Whether the session is still accumulating ledger deltas.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Whether the session has reached an immutable terminal status.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Net discrepancy across all tenders, for display.
    ///
    /// This figure NEVER decides whether the session needs resolution:
    /// offsetting per-tender discrepancies that net to zero still leave
    /// the session in `DiscrepancyPending`.
    pub fn total_discrepancy(&self) -> Option<Money> {
        self.discrepancies.as_ref().map(TenderAmounts::total)
    }

    /// Discrepancy on a single tender, if the session has been closed.
    pub fn discrepancy_for(&self, tender: PaymentMethod) -> Option<Money> {
        self.discrepancies.as_ref().map(|d| d.get(tender))
    }
}

// =============================================================================
// Adjustment Events
// =============================================================================

/// Output event emitted by a write-off resolution.
///
/// Instructs the external ledger to post a correcting entry equal to the
/// tender's discrepancy. This core never posts the entry itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequested {
    pub session_id: String,
    pub tender: PaymentMethod,
    pub amount: Money,
}

/// A persisted, not-yet-dispatched adjustment request.
///
/// Rows are written in the same transaction as the resolving status update
/// (outbox pattern) and drained by the embedding application's dispatch
/// worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentOutboxEntry {
    pub id: String,
    pub session_id: String,
    pub tender: PaymentMethod,
    /// Discrepancy amount in cents the ledger should correct for.
    pub amount_cents: i64,
    /// Number of dispatch attempts.
    pub attempts: i64,
    /// Last dispatch error, if any.
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    /// When successfully handed to the ledger collaborator.
    pub dispatched_at: Option<DateTime<Utc>>,
}

impl AdjustmentOutboxEntry {
    /// Returns the adjustment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
