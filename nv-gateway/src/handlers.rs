use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use nv_app::error::AppError;
use nv_app::request_id::RequestId;
use nv_contract::AuditTarget;
use nv_s2s::RawResponse;

use crate::audit::{begin_entry, end_entry};
use crate::error::{audit_begin_hard_stop, bad_gateway, bad_request, gateway_timeout, not_found};
use crate::path::{is_health_subpath, parse_api_path, ApiTarget};
use crate::state::GatewayState;

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| uuid_v4_fallback())
}

fn uuid_v4_fallback() -> String {
    // RequestIdPlugin always runs ahead of this handler in the registered
    // pipeline; this only fires if a caller wires the controller without it.
    format!("req-{}", now_ms())
}

fn is_unroutable_host(host: &str) -> bool {
    host == "0.0.0.0" || host == "::"
}

/// Health checks carry no meaningful body; this just bounds a misbehaving
/// caller rather than modeling a real payload budget.
const HEALTH_BODY_LIMIT: usize = 64 * 1024;
/// Size-limit DoS guard for proxied requests, enforced inline while buffering
/// rather than through a Tower layer, since health and proxy share one route.
const PROXY_BODY_LIMIT: usize = 10 * 1024 * 1024;

fn safe_response_headers(headers: &[(String, String)]) -> HeaderMap {
    let mut out = HeaderMap::new();
    for (name, value) in headers {
        let keep = name.eq_ignore_ascii_case("content-type") || name.to_ascii_lowercase().starts_with("x-");
        if !keep {
            continue;
        }
        if let (Ok(name), Ok(value)) = (axum::http::HeaderName::try_from(name.as_str()), axum::http::HeaderValue::from_str(value)) {
            out.insert(name, value);
        }
    }
    out
}

fn raw_response_into_response(raw: RawResponse, filter_headers: bool) -> Response {
    let status = StatusCode::from_u16(raw.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, raw.body_text).into_response();
    let headers = if filter_headers {
        safe_response_headers(&raw.headers)
    } else {
        let mut all = HeaderMap::new();
        for (name, value) in &raw.headers {
            if let (Ok(name), Ok(value)) = (axum::http::HeaderName::try_from(name.as_str()), axum::http::HeaderValue::from_str(value)) {
                all.insert(name, value);
            }
        }
        all
    };
    response.headers_mut().extend(headers);
    response
}

/// Single entry point for everything under `/api/...`. Parses the target,
/// then dispatches to the health fast path (bypasses logging/guards/audit)
/// or the full proxy pipeline.
pub async fn entry(State(state): State<GatewayState>, req: Request) -> Response {
    let full_path = match req.uri().path_and_query() {
        Some(pq) => pq.as_str().to_string(),
        None => req.uri().path().to_string(),
    };
    let path_only = req.uri().path().to_string();

    let target = match parse_api_path(&path_only) {
        Some(target) => target,
        None => return bad_request("malformed /api/<slug>/v<version>/... path").into_response(),
    };
    if target.slug == "gateway" {
        return not_found("the gateway's own namespace is not proxied").into_response();
    }

    if is_health_subpath(&target.subpath) {
        return health_fast_path(state, target, full_path, req).await.into_response();
    }

    proxy_pipeline(state, target, full_path, req).await.into_response()
}

async fn buffer_body(body: Body, limit: usize) -> Result<bytes::Bytes, AppError> {
    to_bytes(body, limit)
        .await
        .map_err(|_| AppError::Custom { status: StatusCode::PAYLOAD_TOO_LARGE, title: "payload_too_large", detail: format!("body exceeds {limit} bytes") })
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| *name != axum::http::header::HOST)
        .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
        .collect()
}

/// Step 1: versioned health, served outside the logging/DoS-guard/audit
/// pipeline. Tries the gateway's own Mirror first; on miss, only here, an
/// on-demand facilitator resolve is allowed to stand in for it.
async fn health_fast_path(state: GatewayState, target: ApiTarget, full_path: String, req: Request) -> Result<Response, AppError> {
    let request_id = request_id_of(&req);
    let method = req.method().clone();
    let headers = header_pairs(req.headers());
    let body = buffer_body(req.into_body(), HEALTH_BODY_LIMIT).await?;

    if let Some(record) = state.mirror.get(&target.slug, target.version).await {
        if !record.expose_health {
            return Err(not_found(format!("{}@{} does not expose health", target.slug, target.version)));
        }
        if is_unroutable_host(url_host(&record.base_url).as_deref().unwrap_or_default()) {
            return Err(bad_gateway("upstream host is unroutable"));
        }
        let raw = state
            .s2s
            .call_raw(&target.slug, target.version, &full_path, method, headers, Some(body), state.request_timeout_ms, Some(&request_id), true)
            .await
            .map_err(|e| bad_gateway(e.to_string()))?;
        return Ok(raw_response_into_response(raw, true));
    }

    match facilitator_on_demand_health_proxy(&state, &target, &full_path, method, headers, body, &request_id).await {
        Some(response) => Ok(response),
        None => Err(bad_gateway(format!("{}@{} is not mirrored and the facilitator fallback failed", target.slug, target.version))),
    }
}

fn url_host(base_url: &str) -> Option<String> {
    reqwest::Url::parse(base_url).ok().and_then(|u| u.host_str().map(str::to_string))
}

/// Resolves `slug@version` against the facilitator directly (bypassing the
/// gateway's own Mirror) and proxies a single request to it. Used only for
/// health-subpath requests on a service the gateway hasn't mirrored; any
/// failure here is swallowed by returning `None` so the caller can fall back
/// to a plain error response rather than ever panicking the request.
async fn facilitator_on_demand_health_proxy(
    state: &GatewayState,
    target: &ApiTarget,
    full_path: &str,
    method: Method,
    mut headers: Vec<(String, String)>,
    body: bytes::Bytes,
    request_id: &str,
) -> Option<Response> {
    let resolve_url = format!(
        "{}/resolve?key={}@{}",
        state.facilitator_base_url.trim_end_matches('/'),
        target.slug,
        target.version
    );
    let resolved: serde_json::Value = state.http.get(&resolve_url).send().await.ok()?.json().await.ok()?;
    let service_config = resolved.get("serviceConfig")?;
    let base_url = service_config.get("baseUrl")?.as_str()?;
    let outbound_prefix = service_config.get("outboundApiPrefix")?.as_str()?;
    let composed_base = format!("{}{}/{}/v{}", base_url.trim_end_matches('/'), outbound_prefix, target.slug, target.version);

    if is_unroutable_host(url_host(base_url).as_deref().unwrap_or_default()) {
        return None;
    }

    let origin = reqwest::Url::parse(&composed_base).ok()?;
    let url = format!("{}://{}{}", origin.scheme(), origin.authority(), full_path);

    headers.retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
    headers.push(("x-request-id".to_string(), request_id.to_string()));
    headers.push(("x-service-name".to_string(), target.slug.clone()));
    headers.push(("x-api-version".to_string(), target.version.to_string()));

    let mut request = state.http.request(method, &url);
    for (name, value) in &headers {
        request = request.header(name, value);
    }
    if !body.is_empty() {
        request = request.body(body);
    }
    let response = request.timeout(Duration::from_millis(state.request_timeout_ms)).send().await.ok()?;
    let status = response.status();
    let response_headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
        .collect();
    let body_text = response.text().await.unwrap_or_default();
    Some(raw_response_into_response(RawResponse { status: status.as_u16(), headers: response_headers, body_text }, true))
}

/// Steps 2-7: edge logging, DoS guards, audit BEGIN, Mirror resolve, proxy,
/// audit END.
async fn proxy_pipeline(state: GatewayState, target: ApiTarget, full_path: String, req: Request) -> Result<Response, AppError> {
    let request_id = request_id_of(&req);
    let method = req.method().clone();

    tracing::event!(
        target: "edge",
        tracing::Level::INFO,
        slug = %target.slug,
        version = target.version,
        method = %method,
        url = %full_path,
        request_id = %request_id,
        "EDGE"
    );

    if !state.rate_limiter.try_acquire(&target.slug) {
        return Err(AppError::Custom { status: StatusCode::TOO_MANY_REQUESTS, title: "rate_limited", detail: format!("{} is over its request budget", target.slug) });
    }

    let headers = header_pairs(req.headers());
    let body = buffer_body(req.into_body(), PROXY_BODY_LIMIT).await?;

    let timeout = Duration::from_millis(state.request_timeout_ms);
    match tokio::time::timeout(timeout, run_audited_proxy(&state, &target, &full_path, method, headers, body, &request_id)).await {
        Ok(result) => result,
        Err(_) => {
            let audit_target = AuditTarget { slug: target.slug.clone(), version: target.version, route: target.subpath.clone(), method: "unknown".to_string() };
            append_end_best_effort(&state, &request_id, &audit_target, 504, Some("gateway_timeout".to_string())).await;
            Err(gateway_timeout("upstream did not respond within the configured budget"))
        }
    }
}

async fn run_audited_proxy(
    state: &GatewayState,
    target: &ApiTarget,
    full_path: &str,
    method: Method,
    headers: Vec<(String, String)>,
    body: bytes::Bytes,
    request_id: &str,
) -> Result<Response, AppError> {
    let audit_target = AuditTarget { slug: target.slug.clone(), version: target.version, route: target.subpath.clone(), method: method.to_string() };

    let begin = begin_entry(request_id, now_ms(), &audit_target);
    let begin_value = serde_json::to_value(&begin).map_err(|e| audit_begin_hard_stop(e.to_string()))?;
    state.wal.append(begin_value).await.map_err(|e| audit_begin_hard_stop(e.to_string()))?;

    let outcome = resolve_and_proxy(state, target, full_path, method, headers, body, request_id).await;

    let (http_code, err) = match &outcome {
        Ok(response) => (response.status().as_u16(), None),
        Err(app_err) => (app_err_status(app_err), Some(app_err.to_string())),
    };
    append_end_best_effort(state, request_id, &audit_target, http_code, err).await;

    outcome
}

fn app_err_status(err: &AppError) -> u16 {
    err.status().as_u16()
}

async fn append_end_best_effort(state: &GatewayState, request_id: &str, target: &AuditTarget, http_code: u16, err: Option<String>) {
    let end = end_entry(request_id, now_ms(), target, http_code, err);
    match serde_json::to_value(&end) {
        Ok(value) => {
            if let Err(e) = state.wal.append(value).await {
                tracing::warn!(target: "gateway", error = %e, "audit END append failed, best-effort only");
            }
        }
        Err(e) => tracing::warn!(target: "gateway", error = %e, "failed to serialize audit END entry"),
    }
    if let Err(e) = state.wal.flush().await {
        tracing::debug!(target: "gateway", error = %e, "post-request flush did not complete");
    }
}

async fn resolve_and_proxy(
    state: &GatewayState,
    target: &ApiTarget,
    full_path: &str,
    method: Method,
    headers: Vec<(String, String)>,
    body: bytes::Bytes,
    request_id: &str,
) -> Result<Response, AppError> {
    let record = state
        .mirror
        .get(&target.slug, target.version)
        .await
        .ok_or_else(|| not_found(format!("{}@{} is not routable", target.slug, target.version)))?;

    if !record.allow_proxy {
        return Err(not_found(format!("{}@{} does not allow proxying", target.slug, target.version)));
    }
    if is_unroutable_host(url_host(&record.base_url).as_deref().unwrap_or_default()) {
        return Err(bad_gateway("upstream host is unroutable"));
    }

    let raw = state
        .s2s
        .call_raw(&target.slug, target.version, full_path, method, headers, Some(body), state.request_timeout_ms, Some(request_id), false)
        .await
        .map_err(|e| bad_gateway(e.to_string()))?;

    Ok(raw_response_into_response(raw, false))
}
