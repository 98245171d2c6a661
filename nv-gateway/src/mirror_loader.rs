//! The gateway has no database of its own; its Mirror is refreshed from the
//! facilitator's `GET /mirror` snapshot instead of a DB connection.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use nv_contract::ServiceConfigRecord;
use nv_mirror::{MirrorDbLoader, MirrorError};

pub struct FacilitatorMirrorLoader {
    http: reqwest::Client,
    base_url: String,
}

impl FacilitatorMirrorLoader {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into() }
    }
}

impl MirrorDbLoader for FacilitatorMirrorLoader {
    fn load_active<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceConfigRecord>, MirrorError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/mirror", self.base_url.trim_end_matches('/'));
            let response = self
                .http
                .get(&url)
                .send()
                .await
                .map_err(|e| MirrorError::DbUnavailable(e.to_string()))?;
            if !response.status().is_success() {
                return Err(MirrorError::DbUnavailable(format!("facilitator responded {}", response.status())));
            }
            let body: serde_json::Value = response.json().await.map_err(|e| MirrorError::DbUnavailable(e.to_string()))?;
            let mirror: HashMap<String, ServiceConfigRecord> = serde_json::from_value(body["mirror"].clone())
                .map_err(|e| MirrorError::DbUnavailable(format!("malformed mirror snapshot: {e}")))?;
            Ok(mirror.into_values().collect())
        })
    }
}
