//! # cashline-db: Database Layer for Cashline
//!
//! This crate provides SQLite storage for register sessions using sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Cashline Data Flow                                │
//! │                                                                         │
//! │  SessionManager (cashline-session)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    cashline-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌────────────────┐   ┌───────────────┐  │   │
//! │  │   │   Database    │   │  Repositories  │   │  Migrations   │  │   │
//! │  │   │   (pool.rs)   │   │ (session.rs)   │   │  (embedded)   │  │   │
//! │  │   │               │   │ (outbox.rs)    │   │               │  │   │
//! │  │   │ SqlitePool    │◄──│ CAS updates    │   │ 001_register_ │  │   │
//! │  │   │ WAL mode      │   │ unique index   │   │ sessions.sql  │  │   │
//! │  │   └───────────────┘   └────────────────┘   └───────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (or :memory: in tests)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Lives Here, and What Doesn't
//!
//! This crate knows HOW session rows are stored and raced over (the
//! partial unique index, the version-guarded UPDATEs, the transactional
//! outbox). It does NOT know WHEN a transition is legal - the status and
//! version preconditions that produce domain errors live in
//! cashline-session, which interprets this crate's `bool` claim results.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (session, outbox)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cashline_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/cashline.db")).await?;
//! let open = db.sessions().find_open_by_register("REG-01").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::outbox::AdjustmentOutboxRepository;
pub use repository::session::SessionRepository;
