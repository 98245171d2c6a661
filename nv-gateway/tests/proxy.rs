use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

use nv_app::prelude::*;
use nv_contract::{Environment, ServiceConfigRecord};
use nv_gateway::{GatewayController, GatewayState, RateLimiter};
use nv_mirror::{MirrorDbLoader, MirrorError, MirrorStore};
use nv_s2s::{HmacSigner, Resolver, RetryPolicy, S2sClient, TokenMinter};
use nv_wal::Wal;

struct SeedLoader(Vec<ServiceConfigRecord>);

impl MirrorDbLoader for SeedLoader {
    fn load_active<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceConfigRecord>, MirrorError>> + Send + 'a>> {
        let records = self.0.clone();
        Box::pin(async move { Ok(records) })
    }
}

fn sample(slug: &str, base_url: &str, allow_proxy: bool) -> ServiceConfigRecord {
    ServiceConfigRecord {
        slug: slug.into(),
        version: 1,
        base_url: base_url.into(),
        outbound_api_prefix: "/api".into(),
        port: 4001,
        enabled: true,
        allow_proxy,
        internal_only: false,
        expose_health: true,
        config_revision: 1,
        etag: "abc".into(),
        updated_at: "2026-01-01T00:00:00Z".into(),
        updated_by: "test".into(),
    }
}

/// Answers exactly one HTTP/1.1 request with a fixed 200 response, then
/// exits. Enough to exercise the proxy path without pulling in a full HTTP
/// server dependency just for tests.
async fn spawn_stub_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let body = b"{\"ok\":true}";
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.write_all(body).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

async fn state_with(records: Vec<ServiceConfigRecord>, wal_dir: &std::path::Path) -> GatewayState {
    let mirror = Arc::new(MirrorStore::new(Arc::new(SeedLoader(records)), wal_dir.join("lkg.json"), Duration::from_secs(60), Environment::NonProduction));
    let _ = mirror.get_with_ttl().await;

    let resolver = Resolver::new(mirror.clone(), Duration::from_secs(60), "facilitator", "http://127.0.0.1:1");
    let signer = Arc::new(HmacSigner::new("test-secret"));
    let minter = TokenMinter::new(signer, "gateway", "mesh", 60);
    let s2s = Arc::new(S2sClient::new(reqwest::Client::new(), resolver, mirror.clone(), minter, RetryPolicy { max_attempts: 1, base_delay_ms: 1 }));

    let wal = Arc::new(Wal::new(wal_dir.join("wal"), 50, 1000));

    GatewayState {
        mirror,
        s2s,
        wal,
        rate_limiter: RateLimiter::new(100, Duration::from_secs(60)),
        http: reqwest::Client::new(),
        facilitator_base_url: "http://127.0.0.1:1".to_string(),
        request_timeout_ms: 2_000,
    }
}

fn app_with(state: GatewayState) -> axum::Router {
    AppBuilder::new()
        .with_state(state)
        .with(ErrorHandling)
        .register_controller::<GatewayController>()
        .build()
}

#[tokio::test]
async fn happy_path_proxies_to_upstream() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = spawn_stub_upstream().await;
    let state = state_with(vec![sample("orders", &upstream, true)], dir.path()).await;
    let app = app_with(state);

    let response = app
        .oneshot(Request::builder().uri("/api/orders/v1/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn missing_mirror_entry_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(vec![], dir.path()).await;
    let app = app_with(state);

    let response = app
        .oneshot(Request::builder().uri("/api/ghost/v1/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn allow_proxy_false_is_404() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(vec![sample("orders", "http://127.0.0.1:1", false)], dir.path()).await;
    let app = app_with(state);

    let response = app
        .oneshot(Request::builder().uri("/api/orders/v1/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unroutable_upstream_host_is_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(vec![sample("orders", "http://0.0.0.0:4001", true)], dir.path()).await;
    let app = app_with(state);

    let response = app
        .oneshot(Request::builder().uri("/api/orders/v1/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn malformed_path_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(vec![], dir.path()).await;
    let app = app_with(state);

    let response = app
        .oneshot(Request::builder().uri("/api/Bad_Slug/v1/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gateway_namespace_is_not_proxied() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(vec![], dir.path()).await;
    let app = app_with(state);

    let response = app
        .oneshot(Request::builder().uri("/api/gateway/v1/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rate_limit_rejects_after_budget_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = spawn_stub_upstream().await;
    let mut state = state_with(vec![sample("orders", &upstream, true)], dir.path()).await;
    state.rate_limiter = RateLimiter::new(1, Duration::from_secs(60));
    let app = app_with(state);

    let first = app
        .clone()
        .oneshot(Request::builder().uri("/api/orders/v1/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(Request::builder().uri("/api/orders/v1/list").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn health_subpath_miss_falls_back_to_facilitator_and_fails_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with(vec![], dir.path()).await;
    let app = app_with(state);

    let response = app
        .oneshot(Request::builder().uri("/api/secret/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
