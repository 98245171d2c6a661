use std::future::Future;
use std::pin::Pin;

use crate::journal::WalLine;

/// Outcome of trying to persist one item to the downstream writer.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Accepted,
    /// Permanently rejected: `(code, message)`. The engine quarantines
    /// (drops) the item rather than retrying it.
    Rejected(String, String),
}

/// Result of a batch write attempt.
#[derive(Debug, Clone)]
pub struct WriteReport {
    /// One outcome per item, in the same order as the batch that was sent.
    pub outcomes: Vec<ItemOutcome>,
}

impl WriteReport {
    pub fn all_accepted(n: usize) -> Self {
        Self {
            outcomes: vec![ItemOutcome::Accepted; n],
        }
    }
}

impl Clone for ItemOutcome {
    fn clone(&self) -> Self {
        match self {
            ItemOutcome::Accepted => ItemOutcome::Accepted,
            ItemOutcome::Rejected(c, m) => ItemOutcome::Rejected(c.clone(), m.clone()),
        }
    }
}

/// Downstream sink the WAL drains into — in production the audit receiver's
/// `/entries` endpoint, in tests an in-memory recorder. Object-safe so the
/// engine can swap it at runtime via `Wal::set_writer`.
pub trait AuditWriter: Send + Sync + 'static {
    /// Attempt to write an entire batch in one call. A wholesale failure
    /// (e.g. the endpoint is unreachable) should return `Err`; a batch that
    /// was reached but partially rejected should return `Ok` with per-item
    /// outcomes instead.
    fn write_batch<'a>(
        &'a self,
        batch: &'a [WalLine],
    ) -> Pin<Box<dyn Future<Output = Result<WriteReport, (String, String)>> + Send + 'a>>;
}
