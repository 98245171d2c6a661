use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use nv_app::error::AppError;
use nv_contract::ServiceConfigRecord;

use crate::error::mirror_error_to_app_error;
use crate::state::FacilitatorState;

/// `GET /mirror` — always a `getWithTtl()` call, so the read path itself
/// triggers refreshes. 503 only on cold-start failure; anything else
/// unexpected surfaces as 500.
pub async fn get_mirror(State(state): State<FacilitatorState>) -> Result<Json<Value>, AppError> {
    let mirror = state.mirror.get_with_ttl().await.map_err(mirror_error_to_app_error)?;
    Ok(Json(json!({
        "mirror": mirror.to_object(),
        "meta": {
            "source": mirror.source,
            "fetchedAt": mirror.fetched_at,
            "count": mirror.size(),
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct PushBody {
    pub services: Vec<ServiceConfigRecord>,
}

/// `POST /mirror` — trusted push. Adopts in memory unconditionally; an LKG
/// write failure is reported in the response but never fails the request,
/// since the in-memory adoption already succeeded.
pub async fn post_mirror(State(state): State<FacilitatorState>, Json(body): Json<PushBody>) -> Result<Json<Value>, AppError> {
    let (mirror, lkg_error) = state
        .mirror
        .replace_with_push(body.services)
        .await
        .map_err(mirror_error_to_app_error)?;
    Ok(Json(json!({
        "ok": true,
        "accepted": true,
        "services": mirror.size(),
        "source": mirror.source,
        "lkgSaved": lkg_error.is_none(),
        "fetchedAt": mirror.fetched_at,
        "lkgError": lkg_error,
    })))
}

fn parse_key(key: &str) -> Result<(String, u32), AppError> {
    let (slug, version) = key
        .split_once('@')
        .ok_or_else(|| AppError::BadRequest("key must be 'slug@version'".to_string()))?;
    let version: u32 = version
        .parse()
        .map_err(|_| AppError::BadRequest("version must be a positive integer".to_string()))?;
    Ok((slug.to_string(), version))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub key: Option<String>,
}

/// `GET /resolve?key=slug@version`.
pub async fn resolve_by_query(
    State(state): State<FacilitatorState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<Value>, AppError> {
    let key = query.key.ok_or_else(|| AppError::BadRequest("missing 'key' query parameter".to_string()))?;
    let (slug, version) = parse_key(&key)?;
    resolve(state, &slug, version).await
}

/// `GET /resolve/:slug/v:version`.
pub async fn resolve_by_path(
    State(state): State<FacilitatorState>,
    Path((slug, version_token)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let version_str = version_token
        .strip_prefix('v')
        .ok_or_else(|| AppError::BadRequest("version segment must look like 'v<number>'".to_string()))?;
    let version: u32 = version_str
        .parse()
        .map_err(|_| AppError::BadRequest("version must be a positive integer".to_string()))?;
    resolve(state, &slug, version).await
}

async fn resolve(state: FacilitatorState, slug: &str, version: u32) -> Result<Json<Value>, AppError> {
    let record = match state.mirror.get(slug, version).await {
        Some(record) => record,
        None => {
            if let Some(disabled) = state.mirror.raw_get(slug, version).await {
                if !disabled.enabled {
                    return Err(AppError::Custom {
                        status: StatusCode::NOT_FOUND,
                        title: "service_disabled",
                        detail: format!("{slug}@{version} is configured but disabled"),
                    });
                }
            }
            return Err(AppError::NotFound(format!("{slug}@{version} not in mirror")));
        }
    };

    let expected_key = format!("{slug}@{version}");
    if record.key() != expected_key {
        return Err(AppError::Custom {
            status: StatusCode::CONFLICT,
            title: "key_mismatch",
            detail: format!("record key '{}' does not match requested '{expected_key}'", record.key()),
        });
    }

    let (edge, s2s) = state.policies.for_service(&record.slug, version).await;
    Ok(Json(json!({
        "serviceConfig": record,
        "policies": { "edge": edge, "s2s": s2s },
    })))
}
