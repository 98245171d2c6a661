use std::fmt;

/// How a write failure should be treated by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient — the item stays queued and is retried on the next flush.
    Retryable,
    /// Permanent — the item is dropped from the queue (quarantined) and
    /// never retried.
    NonRetryable,
    /// Couldn't classify the failure; treated as retryable so nothing is
    /// silently lost, but logged distinctly so operators can tell the
    /// difference between a known transient failure and an unmapped one.
    Unknown,
}

/// Classify a downstream writer error code. Exact matches against a known
/// list first; falls back to substring heuristics on the message; anything
/// left over is `Unknown` (and therefore retried, not dropped).
pub fn classify(code: &str, message: &str) -> ErrorClass {
    const NON_RETRYABLE: &[&str] = &[
        "AUDIT_BLOB_INVALID",
        "BLOB_INVALID_HTTP_CODE",
        "contract_id_mismatch",
        "INVALID_STATUS",
        "VALIDATION_ERROR",
    ];
    const RETRYABLE: &[&str] = &[
        "WAL_PERSIST_FAILED",
        "connection_refused",
        "timeout",
        "unavailable",
        "WAL_NOT_READY",
    ];

    if NON_RETRYABLE.contains(&code) {
        return ErrorClass::NonRetryable;
    }
    if RETRYABLE.contains(&code) {
        return ErrorClass::Retryable;
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") || lower.contains("connection")
        || lower.contains("unavailable") || lower.contains("temporarily")
    {
        return ErrorClass::Retryable;
    }
    if lower.contains("invalid") || lower.contains("malformed") || lower.contains("schema") {
        return ErrorClass::NonRetryable;
    }
    ErrorClass::Unknown
}

/// Failure reported by the journal (filesystem layer).
#[derive(Debug, Clone)]
pub enum WalError {
    Io(String),
    WriterUnavailable,
    FlushInProgress,
}

impl fmt::Display for WalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalError::Io(msg) => write!(f, "wal io error: {msg}"),
            WalError::WriterUnavailable => write!(f, "no audit writer configured"),
            WalError::FlushInProgress => write!(f, "a flush is already in progress"),
        }
    }
}

impl std::error::Error for WalError {}
