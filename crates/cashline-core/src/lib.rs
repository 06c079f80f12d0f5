//! # cashline-core: Pure Business Logic for Cashline
//!
//! This crate is the **heart** of the register-session subsystem. It
//! contains the reconciliation math and the session state rules as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cashline Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Embedding POS Application                       │   │
//! │  │     Open Till UI ──► Shift ──► Close/Count UI ──► Resolution    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 cashline-session (SessionManager)               │   │
//! │  │       open, close, resolve, get_session + LedgerGateway        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cashline-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  tender   │  │ reconcile │  │   │
//! │  │   │  Session  │  │   Money   │  │ Tender    │  │ expected  │  │   │
//! │  │   │  Status   │  │  (cents)  │  │ Amounts   │  │ discrep.  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  cashline-db (Database Layer)                   │   │
//! │  │        SQLite session store, CAS updates, adjustment outbox     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (RegisterSession, PaymentMethod, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`tender`] - The invariant-enforcing per-tender money map
//! - [`reconcile`] - Expected-balance and discrepancy math
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: reconciliation is deterministic - same opening
//!    balances, deltas, and counts always produce the same discrepancies
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64)
//! 4. **Total tender maps**: a map missing a tender cannot be constructed
//!
//! ## Example Usage
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use chrono::Utc;
//! use cashline_core::money::Money;
//! use cashline_core::reconcile::reconcile;
//! use cashline_core::tender::TenderAmounts;
//! use cashline_core::types::{PaymentMethod, TenderDelta};
//!
//! let mut counts = BTreeMap::new();
//! counts.insert(PaymentMethod::Cash, Money::from_cents(10000));
//! let opening = TenderAmounts::from_counts(counts).unwrap();
//!
//! let deltas = vec![
//!     TenderDelta::new(PaymentMethod::Cash, Money::from_cents(5000), Utc::now()),
//!     TenderDelta::new(PaymentMethod::Card, Money::from_cents(3000), Utc::now()),
//!     TenderDelta::new(PaymentMethod::Cash, Money::from_cents(-1000), Utc::now()),
//! ];
//!
//! let mut counted = BTreeMap::new();
//! counted.insert(PaymentMethod::Cash, Money::from_cents(14000));
//! counted.insert(PaymentMethod::Card, Money::from_cents(3000));
//! let closing = TenderAmounts::from_counts(counted).unwrap();
//!
//! let result = reconcile(&opening, &deltas, &closing);
//! assert!(result.is_balanced());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod reconcile;
pub mod tender;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use cashline_core::Money` instead of
// `use cashline_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use reconcile::{compute_discrepancies, compute_expected, reconcile, Reconciliation};
pub use tender::TenderAmounts;
pub use types::*;
