use std::fmt;

/// Component-internal error for the S2S client.
#[derive(Debug, Clone)]
pub enum S2sError {
    /// No route in the Mirror for the requested `slug@version`.
    UnknownTarget(String),
    /// Target exists but fails the authorization preflight.
    TargetRejected(&'static str, String),
    SignFailed(String),
    /// Every retry attempt was exhausted.
    Unreachable(String),
    Timeout,
    /// A non-2xx response from a `call` (not `callRaw`, which never errors on status).
    UpstreamStatus(u16, String),
}

impl fmt::Display for S2sError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            S2sError::UnknownTarget(key) => write!(f, "no mirror entry for '{key}'"),
            S2sError::TargetRejected(code, detail) => write!(f, "{code}: {detail}"),
            S2sError::SignFailed(msg) => write!(f, "failed to sign s2s token: {msg}"),
            S2sError::Unreachable(msg) => write!(f, "upstream unreachable after retries: {msg}"),
            S2sError::Timeout => write!(f, "s2s call timed out"),
            S2sError::UpstreamStatus(status, detail) => write!(f, "upstream returned {status}: {detail}"),
        }
    }
}

impl std::error::Error for S2sError {}
