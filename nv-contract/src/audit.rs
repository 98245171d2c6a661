use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ContractError;

/// The point in a request's life an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Begin,
    End,
}

/// Why an END entry was finalized. `Timeout` and `ClientAbort` are
/// distinguished by which side closed the connection first: `Timeout` is
/// the server-side deadline elapsing, `ClientAbort` is the client socket
/// closing before either the deadline or a normal response (see the
/// gateway's timeout middleware for the call site that picks between them).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalizeReason {
    Finish,
    Error,
    Timeout,
    ShutdownReplay,
    ClientAbort,
}

/// Wire unit appended to the WAL; opaque to the WAL itself, validated only
/// at ingestion (contract core) and at the receiver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTarget {
    pub slug: String,
    pub version: u32,
    pub route: String,
    pub method: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditMeta {
    pub service: String,
    pub ts: i64,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditBlob {
    pub meta: AuditMeta,
    pub blob: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<AuditTarget>,
}

/// Refines [`AuditBlob`] with an explicit phase, HTTP status bucket, and
/// optional error detail — this is the shape the audit receiver validates
/// against the `audit/entries@v1` contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub meta: AuditMeta,
    pub blob: Value,
    pub phase: Phase,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<AuditTarget>,
}

pub const AUDIT_ENTRIES_CONTRACT_ID: &str = "audit/entries@v1";

/// `{ entries: AuditEntry[] (>=1) }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditBatch {
    pub entries: Vec<AuditEntry>,
}

impl AuditBatch {
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.entries.is_empty() {
            return Err(ContractError::new(
                "AUDIT_BLOB_INVALID",
                "entries",
                "batch must contain at least one entry",
            ));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if let Some(code) = entry.http_code {
                if !(100..=599).contains(&code) {
                    return Err(ContractError::new(
                        "BLOB_INVALID_HTTP_CODE",
                        format!("entries[{i}].httpCode"),
                        format!("{code} is outside [100,599]"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Persisted record derived from a matched BEGIN/END pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub event_id: String,
    pub request_id: String,
    pub duration_ms: i64,
    pub finalize_reason: FinalizeReason,
    pub billable_units: u32,
    pub method: String,
    pub path: String,
    pub slug: String,
    pub status: u16,
    pub ts: i64,
}

impl AuditRecord {
    pub fn event_id_for(request_id: &str, end_ts: i64) -> String {
        format!("evt-{request_id}-{end_ts}")
    }

    pub fn from_begin_end(
        request_id: &str,
        begin_ts: i64,
        end_ts: i64,
        finalize_reason: FinalizeReason,
        method: String,
        path: String,
        slug: String,
        status: u16,
    ) -> Self {
        let duration_ms = (end_ts - begin_ts).max(0);
        let billable = matches!(finalize_reason, FinalizeReason::Finish) && (200..400).contains(&status);
        Self {
            event_id: Self::event_id_for(request_id, end_ts),
            request_id: request_id.to_string(),
            duration_ms,
            finalize_reason,
            billable_units: if billable { 1 } else { 0 },
            method,
            path,
            slug,
            status,
            ts: end_ts,
        }
    }
}
