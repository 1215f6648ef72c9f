//! Database access layer
//!
//! Runtime sqlx queries against PostgreSQL. Shared mutable state (order
//! status, product stock, restaurant flags) is only ever mutated through
//! conditional updates verified by affected-row counts, or inside the
//! serializable order-creation transaction — no in-process locks.

pub mod catalog;
pub mod fees;
pub mod notifications;
pub mod orders;
pub mod platform;
pub mod reports;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
