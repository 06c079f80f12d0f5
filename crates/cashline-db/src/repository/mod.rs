//! # Repository Implementations
//!
//! - [`session`] - Register session storage (exclusivity + CAS updates)
//! - [`outbox`] - Adjustment outbox for write-off correcting entries

pub mod outbox;
pub mod session;
