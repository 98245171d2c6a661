use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use nv_contract::{Environment, Mirror, MirrorSource, ServiceConfigRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::MirrorError;

const LKG_SCHEMA: &str = "mirror@v2";

#[derive(Debug, Serialize, Deserialize)]
struct LkgDoc {
    schema: String,
    updated_at: String,
    payload: HashMap<String, ServiceConfigRecord>,
}

/// Atomic filesystem persistence for the last-known-good mirror snapshot.
pub struct LkgStore {
    path: PathBuf,
}

impl LkgStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the payload to `<path>.tmp.<epoch>` then rename over `path`,
    /// so readers never observe a partially-written file.
    pub async fn write(&self, payload: &HashMap<String, ServiceConfigRecord>) -> Result<(), MirrorError> {
        let doc = LkgDoc {
            schema: LKG_SCHEMA.to_string(),
            updated_at: chrono::Utc::now().to_rfc3339(),
            payload: payload.clone(),
        };
        let body = serde_json::to_vec_pretty(&doc).map_err(|e| MirrorError::Io(e.to_string()))?;

        let epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
        let tmp_path = {
            let mut p = self.path.clone().into_os_string();
            p.push(format!(".tmp.{epoch}"));
            PathBuf::from(p)
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| MirrorError::Io(e.to_string()))?;
        }
        tokio::fs::write(&tmp_path, &body).await.map_err(|e| MirrorError::Io(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &self.path).await.map_err(|e| MirrorError::Io(e.to_string()))?;
        Ok(())
    }

    /// Read and validate the LKG file, accepting either the wrapped
    /// `{schema, updatedAt, payload}` doc or a bare `slug@version -> record`
    /// map (using the file's mtime as `updatedAt` in that case).
    pub async fn read(&self, env: Environment) -> Result<Mirror, MirrorError> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| MirrorError::LkgInvalid(e.to_string()))?;

        let (payload, updated_at) = match serde_json::from_slice::<LkgDoc>(&raw) {
            Ok(doc) => (doc.payload, doc.updated_at),
            Err(_) => {
                let bare: HashMap<String, ServiceConfigRecord> =
                    serde_json::from_slice(&raw).map_err(|e| MirrorError::LkgInvalid(e.to_string()))?;
                let mtime = tokio::fs::metadata(&self.path)
                    .await
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs().to_string())
                    .unwrap_or_default();
                (bare, mtime)
            }
        };

        let records: Vec<ServiceConfigRecord> = payload.into_values().collect();
        Mirror::from_records(records, MirrorSource::Lkg, updated_at, env)
            .map_err(|e| MirrorError::LkgInvalid(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(slug: &str) -> ServiceConfigRecord {
        ServiceConfigRecord {
            slug: slug.into(),
            version: 1,
            base_url: "http://worker:4001".into(),
            outbound_api_prefix: "/api".into(),
            port: 4001,
            enabled: true,
            allow_proxy: true,
            internal_only: false,
            expose_health: true,
            config_revision: 1,
            etag: "abc".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
            updated_by: "test".into(),
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LkgStore::new(dir.path().join("mirror.json"));
        let mut payload = HashMap::new();
        let record = sample("user");
        payload.insert(record.key(), record);
        store.write(&payload).await.unwrap();

        let mirror = store.read(Environment::NonProduction).await.unwrap();
        assert_eq!(mirror.size(), 1);
        assert!(mirror.get("user", 1).is_some());
    }

    #[tokio::test]
    async fn bare_map_file_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.json");
        let record = sample("user");
        let mut payload = HashMap::new();
        payload.insert(record.key(), record);
        tokio::fs::write(&path, serde_json::to_vec(&payload).unwrap()).await.unwrap();

        let store = LkgStore::new(&path);
        let mirror = store.read(Environment::NonProduction).await.unwrap();
        assert_eq!(mirror.size(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = LkgStore::new(dir.path().join("missing.json"));
        assert!(store.read(Environment::NonProduction).await.is_err());
    }
}
