//! # cashline-session: Register Session Lifecycle & Reconciliation
//!
//! The service surface of Cashline: opening a till with starting balances
//! per tender, closing it against physically counted amounts, detecting
//! per-tender discrepancies, and routing them through the resolution
//! workflow - all under optimistic concurrency control.
//!
//! ## The Shift, End to End
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  MORNING                                                               │
//! │    open("REG-01", "alice", {cash: $100.00})                            │
//! │        → session { status: open, version: 1 }                          │
//! │                                                                         │
//! │  DURING THE SHIFT                                                      │
//! │    the external ledger accumulates tender-attributed deltas            │
//! │    (+$50.00 cash sale, +$30.00 card sale, -$10.00 cash refund, ...)   │
//! │    this subsystem does not see them until close                        │
//! │                                                                         │
//! │  EVENING                                                               │
//! │    close(session, v1, "bob", counted: {cash: $135.00, card: $30.00})   │
//! │        → snapshot ledger deltas for the open window                    │
//! │        → expected = opening + Σ deltas  (per tender, frozen)           │
//! │        → discrepancy = counted - expected  (per tender, frozen)        │
//! │        → cash is $5.00 short → status: discrepancy_pending, v2         │
//! │                                                                         │
//! │  BACK OFFICE                                                           │
//! │    resolve(session, v2, "carol", write_off, "shift shortage")          │
//! │        → status: resolved, v3 (immutable from here on)                 │
//! │        → adjustment_outbox += { cash, -$5.00 } for the ledger          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Contract
//!
//! - One open session per register: racing opens are decided by the
//!   store's partial unique index; exactly one caller wins, the other gets
//!   `AlreadyOpen`.
//! - Every mutation carries the version the caller last observed; the
//!   store update is a compare-and-swap, and the loser of any race gets
//!   `VersionConflict` with the current version. Retrying is ALWAYS a
//!   caller decision - a second resolution of an already-resolved session
//!   is a business question, not a transient failure.
//!
//! ## Modules
//!
//! - [`manager`] - [`SessionManager`]: open, close, resolve, reads
//! - [`ledger`] - [`LedgerGateway`] port + [`MemoryLedger`] test double
//! - [`error`] - [`SessionError`] composing domain/storage/ledger failures

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod manager;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{SessionError, SessionResult};
pub use ledger::{LedgerError, LedgerGateway, MemoryLedger};
pub use manager::SessionManager;

// The embedding application needs these to call us; re-export so a single
// dependency on cashline-session suffices for typical use.
pub use cashline_core::{
    AdjustmentOutboxEntry, AdjustmentRequested, Money, PaymentMethod, RegisterSession,
    Resolution, ResolutionAction, SessionStatus, TenderAmounts, TenderDelta,
};
pub use cashline_db::{Database, DbConfig};
