use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use nv_app::prelude::*;
use nv_audit_receiver::{AuditReceiverController, AuditReceiverState, InMemoryAuditStore};
use nv_contract::{AuditEntry, AuditMeta, AuditTarget, Phase, AUDIT_ENTRIES_CONTRACT_ID, CONTRACT_HEADER};

fn app_with(state: AuditReceiverState) -> axum::Router {
    AppBuilder::new()
        .with_state(state)
        .with(ErrorHandling)
        .register_controller::<AuditReceiverController>()
        .build()
}

fn entry(request_id: &str) -> AuditEntry {
    AuditEntry {
        meta: AuditMeta { service: "gateway".into(), ts: 1700000000, request_id: request_id.into() },
        blob: serde_json::json!({ "method": "GET", "path": "/users/1" }),
        phase: Phase::End,
        status: "ok".into(),
        http_code: Some(200),
        err: None,
        target: None,
    }
}

#[tokio::test]
async fn missing_contract_header_is_400() {
    let app = app_with(AuditReceiverState::new(Some(Arc::new(InMemoryAuditStore::new()))));
    let body = serde_json::json!({ "entries": [entry("r1")] });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/entries")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_contract_id_is_400() {
    let app = app_with(AuditReceiverState::new(Some(Arc::new(InMemoryAuditStore::new()))));
    let body = serde_json::json!({ "entries": [entry("r1")] });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/entries")
                .header(CONTRACT_HEADER, "audit/entries@v2")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let problem: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(problem["title"], "contract_id_mismatch");
}

#[tokio::test]
async fn writer_not_ready_is_503() {
    let app = app_with(AuditReceiverState::new(None));
    let body = serde_json::json!({ "entries": [entry("r1")] });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/entries")
                .header(CONTRACT_HEADER, AUDIT_ENTRIES_CONTRACT_ID)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let problem: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(problem["title"], "WAL_NOT_READY");
}

#[tokio::test]
async fn valid_batch_is_accepted() {
    let app = app_with(AuditReceiverState::new(Some(Arc::new(InMemoryAuditStore::new()))));
    let body = serde_json::json!({ "entries": [entry("r1"), entry("r2")] });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/entries")
                .header(CONTRACT_HEADER, AUDIT_ENTRIES_CONTRACT_ID)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload["data"]["body"]["accepted"], 2);
}

#[tokio::test]
async fn duplicate_submission_is_idempotent() {
    let store = Arc::new(InMemoryAuditStore::new());
    let app = app_with(AuditReceiverState::new(Some(store.clone())));
    let body = serde_json::json!({ "entries": [entry("r1")] });

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/entries")
                    .header(CONTRACT_HEADER, AUDIT_ENTRIES_CONTRACT_ID)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn empty_entries_is_400() {
    let app = app_with(AuditReceiverState::new(Some(Arc::new(InMemoryAuditStore::new()))));
    let body = serde_json::json!({ "entries": [] });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/entries")
                .header(CONTRACT_HEADER, AUDIT_ENTRIES_CONTRACT_ID)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let problem: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(problem["title"], "contract_id_mismatch");
}

#[tokio::test]
async fn begin_and_end_fold_into_one_record_with_real_duration() {
    let store = Arc::new(InMemoryAuditStore::new());
    let app = app_with(AuditReceiverState::new(Some(store.clone())));
    let target = AuditTarget { slug: "user".into(), version: 1, route: "/users/1".into(), method: "GET".into() };
    let begin = AuditEntry {
        meta: AuditMeta { service: "gateway".into(), ts: 1_000, request_id: "r9".into() },
        blob: serde_json::json!({ "method": "GET", "path": "/users/1" }),
        phase: Phase::Begin,
        status: "pending".into(),
        http_code: None,
        err: None,
        target: Some(target.clone()),
    };
    let end = AuditEntry {
        meta: AuditMeta { service: "gateway".into(), ts: 1_500, request_id: "r9".into() },
        blob: serde_json::json!({ "method": "GET", "path": "/users/1" }),
        phase: Phase::End,
        status: "ok".into(),
        http_code: Some(200),
        err: None,
        target: Some(target),
    };
    let body = serde_json::json!({ "entries": [begin, end] });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/entries")
                .header(CONTRACT_HEADER, AUDIT_ENTRIES_CONTRACT_ID)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = store.get("evt-r9-1500").expect("record persisted under the end-ts event id");
    assert_eq!(record.duration_ms, 500);
    assert_eq!(record.billable_units, 1);
    assert_eq!(record.slug, "user");
    assert_eq!(record.path, "/users/1");
}
