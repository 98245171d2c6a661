//! Builds the BEGIN/END [`AuditEntry`] pair the gateway appends to the WAL
//! around every non-health proxied request.

use nv_contract::{AuditEntry, AuditMeta, AuditTarget, Phase};

pub const GATEWAY_SERVICE: &str = "gateway";

pub fn begin_entry(request_id: &str, ts: i64, target: &AuditTarget) -> AuditEntry {
    AuditEntry {
        meta: AuditMeta { service: GATEWAY_SERVICE.to_string(), ts, request_id: request_id.to_string() },
        blob: serde_json::json!({ "method": target.method, "path": target.route }),
        phase: Phase::Begin,
        status: "pending".to_string(),
        http_code: None,
        err: None,
        target: Some(target.clone()),
    }
}

pub fn end_entry(request_id: &str, ts: i64, target: &AuditTarget, http_code: u16, err: Option<String>) -> AuditEntry {
    let status = if (200..400).contains(&http_code) && err.is_none() { "ok" } else { "error" };
    AuditEntry {
        meta: AuditMeta { service: GATEWAY_SERVICE.to_string(), ts, request_id: request_id.to_string() },
        blob: serde_json::json!({ "method": target.method, "path": target.route }),
        phase: Phase::End,
        status: status.to_string(),
        http_code: Some(http_code),
        err,
        target: Some(target.clone()),
    }
}
