use std::sync::Arc;
use std::time::Duration;

use nv_contract::ServiceConfigRecord;
use nv_mirror::MirrorStore;
use rand::Rng;
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use crate::error::S2sError;
use crate::resolver::Resolver;
use crate::token::TokenMinter;

/// Headers that are connection-scoped per RFC 7230 §6.1 and must never be
/// forwarded across a hop.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// CRUD-suffix operation for the typed DTO call path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtoOp {
    Create,
    Update,
    Read,
    Delete,
    List,
}

impl DtoOp {
    fn method(self) -> Method {
        match self {
            DtoOp::Create => Method::PUT,
            DtoOp::Update => Method::PATCH,
            DtoOp::Read => Method::GET,
            DtoOp::Delete => Method::DELETE,
            DtoOp::List => Method::GET,
        }
    }

    fn suffix(self, dto_type: &str, id: Option<&str>) -> String {
        match self {
            DtoOp::Create => format!("{dto_type}/create"),
            DtoOp::Update => format!("{dto_type}/update/{}", id.unwrap_or_default()),
            DtoOp::Read => format!("{dto_type}/read/{}", id.unwrap_or_default()),
            DtoOp::Delete => format!("{dto_type}/delete/{}", id.unwrap_or_default()),
            DtoOp::List => format!("{dto_type}/list"),
        }
    }

    fn carries_body(self) -> bool {
        matches!(self, DtoOp::Create | DtoOp::Update)
    }
}

/// Raw passthrough response — status and headers/body are opaque to the
/// client, which never interprets or errors on status for this path.
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body_text: String,
}

pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 250 }
    }
}

/// Type-disciplined DTO calls and raw proxy passthrough, both resolved
/// through the Mirror and signed with a freshly minted S2S token on every
/// call. Never forwards an inbound `Authorization` header.
pub struct S2sClient {
    http: reqwest::Client,
    resolver: Resolver,
    mirror: Arc<MirrorStore>,
    minter: TokenMinter,
    retry: RetryPolicy,
}

impl S2sClient {
    pub fn new(http: reqwest::Client, resolver: Resolver, mirror: Arc<MirrorStore>, minter: TokenMinter, retry: RetryPolicy) -> Self {
        Self { http, resolver, mirror, minter, retry }
    }

    async fn preflight(&self, slug: &str, version: u32, allow_internal_bypass: bool) -> Result<ServiceConfigRecord, S2sError> {
        let record = self
            .mirror
            .get(slug, version)
            .await
            .ok_or_else(|| S2sError::UnknownTarget(format!("{slug}@{version}")))?;
        if !record.enabled {
            return Err(S2sError::TargetRejected("service_disabled", format!("{slug}@{version} is disabled")));
        }
        if record.internal_only && !allow_internal_bypass {
            return Err(S2sError::TargetRejected("internal_only", format!("{slug}@{version} is internal-only")));
        }
        Ok(record)
    }

    fn propagate_request_id(inbound: Option<&str>) -> String {
        inbound.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
        timeout_ms: u64,
    ) -> Result<reqwest::Response, S2sError> {
        let mut last_err = String::new();
        for attempt in 0..self.retry.max_attempts {
            let request = build().timeout(Duration::from_millis(timeout_ms));
            match tokio::time::timeout(Duration::from_millis(timeout_ms), request.send()).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => last_err = e.to_string(),
                Err(_) => last_err = "deadline elapsed".to_string(),
            }
            if attempt + 1 < self.retry.max_attempts {
                let backoff = self.retry.base_delay_ms * 2u64.pow(attempt);
                let jitter = rand::thread_rng().gen_range(0..self.retry.base_delay_ms.max(1));
                tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
            }
        }
        Err(S2sError::Unreachable(last_err))
    }

    /// Typed DTO call: builds the CRUD-suffix path, signs a token scoped to
    /// `slug`, and parses the response as the canonical envelope on 2xx.
    pub async fn call(
        &self,
        slug: &str,
        version: u32,
        dto_type: &str,
        op: DtoOp,
        id: Option<&str>,
        body: Option<Value>,
        timeout_ms: u64,
        request_id: Option<&str>,
    ) -> Result<Value, S2sError> {
        self.preflight(slug, version, false).await?;
        let base = self.resolver.resolve(slug, version).await?;
        let url = format!("{base}/{}", op.suffix(dto_type, id));
        let token = self.minter.mint(slug, Some(slug), None).map_err(|e| S2sError::SignFailed(e.to_string()))?;
        let request_id = Self::propagate_request_id(request_id);

        let response = self
            .send_with_retry(
                || {
                    let mut request = self.http.request(op.method(), &url).bearer_auth(&token).header("x-request-id", &request_id);
                    if op.carries_body() {
                        request = request.json(&serde_json::json!({ "items": [body.clone().unwrap_or(Value::Null)] }));
                    }
                    request
                },
                timeout_ms,
            )
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(|e| S2sError::Unreachable(e.to_string()))?;
        if !status.is_success() {
            return Err(S2sError::UpstreamStatus(status.as_u16(), text));
        }
        serde_json::from_str(&text).map_err(|e| S2sError::UpstreamStatus(status.as_u16(), format!("invalid envelope: {e}")))
    }

    /// Raw passthrough: `full_path` must include `/api` and any query
    /// string. Only the host/port change (via Mirror resolution); body and
    /// headers are forwarded opaquely. Never errors on response status.
    pub async fn call_raw(
        &self,
        slug: &str,
        version: u32,
        full_path: &str,
        method: Method,
        mut headers: Vec<(String, String)>,
        body: Option<bytes::Bytes>,
        timeout_ms: u64,
        request_id: Option<&str>,
        allow_internal_bypass: bool,
    ) -> Result<RawResponse, S2sError> {
        self.preflight(slug, version, allow_internal_bypass).await?;
        let base = self.resolver.resolve(slug, version).await?;
        // base already carries <slug>/v<version>; full_path carries the
        // original /api/<slug>/v<version>/<rest> — only host/port differ,
        // so splice just the origin.
        let origin = {
            let parsed = reqwest::Url::parse(&base).map_err(|e| S2sError::Unreachable(e.to_string()))?;
            format!("{}://{}", parsed.scheme(), parsed.authority())
        };
        let url = format!("{origin}{full_path}");
        let token = self.minter.mint(slug, Some(slug), None).map_err(|e| S2sError::SignFailed(e.to_string()))?;
        let request_id = Self::propagate_request_id(request_id);

        headers.retain(|(name, _)| !is_hop_by_hop(name) && !name.eq_ignore_ascii_case("authorization"));
        headers.push(("x-request-id".to_string(), request_id));
        headers.push(("x-service-name".to_string(), slug.to_string()));
        headers.push(("x-api-version".to_string(), version.to_string()));

        let response = self
            .send_with_retry(
                || {
                    let mut request = self.http.request(method.clone(), &url).bearer_auth(&token);
                    for (name, value) in &headers {
                        request = request.header(name, value);
                    }
                    if let Some(body) = &body {
                        request = request.body(body.clone());
                    }
                    request
                },
                timeout_ms,
            )
            .await?;

        let status = response.status();
        let response_headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .map(|(name, value)| (name.to_string(), value.to_str().unwrap_or_default().to_string()))
            .collect();
        let body_text = response.text().await.unwrap_or_default();
        Ok(RawResponse { status: status.as_u16(), headers: response_headers, body_text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dto_op_builds_spec_suffixes() {
        assert_eq!(DtoOp::Create.suffix("user", None), "user/create");
        assert_eq!(DtoOp::Update.suffix("user", Some("u1")), "user/update/u1");
        assert_eq!(DtoOp::Read.suffix("user", Some("u1")), "user/read/u1");
        assert_eq!(DtoOp::Delete.suffix("user", Some("u1")), "user/delete/u1");
        assert_eq!(DtoOp::List.suffix("user", None), "user/list");
    }

    #[test]
    fn hop_by_hop_headers_are_recognized_case_insensitively() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("TRANSFER-ENCODING"));
        assert!(!is_hop_by_hop("content-type"));
    }

    #[test]
    fn request_id_is_propagated_or_minted() {
        let propagated = S2sClient::propagate_request_id(Some("req-1"));
        assert_eq!(propagated, "req-1");
        let minted = S2sClient::propagate_request_id(None);
        assert!(!minted.is_empty());
    }

    #[test]
    fn proxy_headers_carry_service_identity() {
        let mut headers: Vec<(String, String)> = vec![("authorization".to_string(), "Bearer inbound".to_string())];
        headers.retain(|(name, _)| !is_hop_by_hop(name) && !name.eq_ignore_ascii_case("authorization"));
        headers.push(("x-request-id".to_string(), "req-1".to_string()));
        headers.push(("x-service-name".to_string(), "user".to_string()));
        headers.push(("x-api-version".to_string(), 2.to_string()));

        assert!(!headers.iter().any(|(n, _)| n.eq_ignore_ascii_case("authorization")));
        assert!(headers.iter().any(|(n, v)| n == "x-service-name" && v == "user"));
        assert!(headers.iter().any(|(n, v)| n == "x-api-version" && v == "2"));
    }
}
