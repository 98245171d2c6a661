use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;

use nv_app::error::AppError;
use nv_contract::{
    verify_header, AuditBatch, AuditEntry, AuditRecord, Envelope, FinalizeReason, Phase,
    AUDIT_ENTRIES_CONTRACT_ID, CONTRACT_HEADER,
};

use crate::error::{contract_error_to_app_error, writer_not_ready};
use crate::state::{AuditReceiverState, PendingBegin};

const SERVICE_NAME: &str = "audit-receiver";

/// `POST /entries` — verify the contract header, validate the batch shape,
/// pair each BEGIN with its END by request id, then persist the resulting
/// [`AuditRecord`] idempotently keyed by its derived event id.
pub async fn post_entries(
    State(state): State<AuditReceiverState>,
    headers: HeaderMap,
    Json(batch): Json<AuditBatch>,
) -> Result<Json<Value>, AppError> {
    let received = headers.get(CONTRACT_HEADER).and_then(|v| v.to_str().ok());
    verify_header(AUDIT_ENTRIES_CONTRACT_ID, received).map_err(contract_error_to_app_error)?;

    batch.validate().map_err(contract_error_to_app_error)?;

    let store = state.store.as_ref().ok_or_else(writer_not_ready)?;

    let mut accepted = 0;
    for entry in &batch.entries {
        match entry.phase {
            Phase::Begin => {
                let (method, path, slug) = target_fields(entry);
                state.pending_begins.insert(
                    entry.meta.request_id.clone(),
                    PendingBegin { ts: entry.meta.ts, method, path, slug },
                );
            }
            Phase::End => {
                let record = build_record(&state, entry);
                store.persist(record).await;
            }
        }
        accepted += 1;
    }

    let envelope = Envelope::make_ok(SERVICE_NAME, 200, serde_json::json!({ "accepted": accepted }))
        .map_err(contract_error_to_app_error)?;
    Ok(Json(serde_json::to_value(envelope).expect("envelope always serializes")))
}

fn target_fields(entry: &AuditEntry) -> (String, String, String) {
    match &entry.target {
        Some(target) => (target.method.clone(), target.route.clone(), target.slug.clone()),
        None => (String::new(), String::new(), String::new()),
    }
}

/// Fold a matched BEGIN/END pair into an [`AuditRecord`]. If no BEGIN was
/// ever seen for this request id (e.g. it arrived in an earlier batch this
/// receiver never got, or the gateway's own BEGIN append failed) the END
/// entry's own fields stand in as a single-point-in-time record instead of
/// dropping the entry on the floor.
fn build_record(state: &AuditReceiverState, entry: &AuditEntry) -> AuditRecord {
    let (begin_ts, method, path, slug) = match state.pending_begins.remove(&entry.meta.request_id) {
        Some((_, pending)) => (pending.ts, pending.method, pending.path, pending.slug),
        None => {
            tracing::warn!(
                target: "audit-receiver",
                request_id = %entry.meta.request_id,
                "END entry with no matching BEGIN, recording a zero-duration record"
            );
            let (method, path, slug) = target_fields(entry);
            (entry.meta.ts, method, path, slug)
        }
    };
    let finalize_reason = finalize_reason_for(entry);
    let status = entry.http_code.unwrap_or(0);
    AuditRecord::from_begin_end(&entry.meta.request_id, begin_ts, entry.meta.ts, finalize_reason, method, path, slug, status)
}

fn finalize_reason_for(entry: &AuditEntry) -> FinalizeReason {
    match entry.err.as_deref() {
        Some("gateway_timeout") => FinalizeReason::Timeout,
        Some(_) => FinalizeReason::Error,
        None if entry.status == "ok" => FinalizeReason::Finish,
        None => FinalizeReason::Error,
    }
}
