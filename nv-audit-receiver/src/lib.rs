//! Audit receiver: the idempotent sink the WAL's replay and flush paths
//! deliver batches to once an audit service comes back up.

pub mod controller;
pub mod error;
pub mod handlers;
pub mod state;
pub mod store;

pub use controller::AuditReceiverController;
pub use state::AuditReceiverState;
pub use store::{AuditStore, InMemoryAuditStore};
