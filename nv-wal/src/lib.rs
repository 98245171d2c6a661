//! Durable write-ahead log for audit events.
//!
//! Every audit blob passes through a file-backed [`journal::Journal`] before
//! it is ever visible to a downstream writer, so a crash between "the
//! gateway accepted the request" and "the audit receiver persisted it"
//! never silently loses the record. [`engine::Wal`] is the public surface:
//! `append`/`append_batch` write through to disk and enqueue in memory,
//! `flush` drains the in-memory queue into the configured
//! [`writer::AuditWriter`], and `replay` rebuilds the queue from disk at
//! boot before the service accepts live traffic.

pub mod engine;
pub mod error;
pub mod journal;
pub mod writer;

pub use engine::{FlushReport, Wal};
pub use error::{classify, ErrorClass, WalError};
pub use journal::{Journal, WalLine};
pub use writer::{AuditWriter, ItemOutcome, WriteReport};
