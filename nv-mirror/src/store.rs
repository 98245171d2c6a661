use std::sync::Arc;
use std::time::{Duration, Instant};

use nv_contract::{Environment, Mirror, MirrorSource, ServiceConfigRecord};
use tokio::sync::RwLock;

use crate::error::MirrorError;
use crate::lkg::LkgStore;
use crate::loader::MirrorDbLoader;

struct Cached {
    mirror: Arc<Mirror>,
    refreshed_at: Instant,
    /// The records as fetched, before `Mirror::from_records` silently drops
    /// disabled ones. Kept alongside the filtered mirror so a caller that
    /// needs to tell "disabled" apart from "never configured" (the
    /// facilitator's `/resolve`) has somewhere to look; routing reads
    /// (`get`, `keys`, `size`) all stay on the filtered `mirror` so a
    /// disabled service remains invisible to every other consumer.
    raw: Vec<ServiceConfigRecord>,
}

/// TTL-refreshed in-memory mirror of service-configuration records.
///
/// `getWithTtl` is the only read path that triggers a refresh; `get`/`keys`/
/// `size`/`to_object` are cheap peeks at whatever snapshot is currently
/// cached. The whole map is replaced atomically on every successful
/// refresh or push — readers always see either the old snapshot or the new
/// one, never a partially-updated one.
pub struct MirrorStore {
    db: Arc<dyn MirrorDbLoader>,
    lkg: LkgStore,
    ttl: Duration,
    env: Environment,
    cached: RwLock<Option<Cached>>,
}

impl MirrorStore {
    pub fn new(db: Arc<dyn MirrorDbLoader>, lkg_path: impl Into<std::path::PathBuf>, ttl: Duration, env: Environment) -> Self {
        Self {
            db,
            lkg: LkgStore::new(lkg_path),
            ttl,
            env,
            cached: RwLock::new(None),
        }
    }

    /// Read-through with TTL: serve the cached snapshot if still fresh,
    /// otherwise try DB, then filesystem LKG, then fail cold-start.
    pub async fn get_with_ttl(&self) -> Result<Arc<Mirror>, MirrorError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.refreshed_at.elapsed() < self.ttl {
                return Ok(cached.mirror.clone());
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<Arc<Mirror>, MirrorError> {
        match self.db.load_active().await {
            Ok(records) if records.iter().any(|r| r.enabled) => {
                let raw = records.clone();
                let fetched_at = chrono::Utc::now().to_rfc3339();
                let mirror = Mirror::from_records(records, MirrorSource::Db, fetched_at, self.env)?;
                let payload = mirror.to_object();
                if let Err(e) = self.lkg.write(&payload).await {
                    tracing::warn!(target: "mirror", error = %e, "failed to persist lkg after db refresh");
                }
                self.adopt(mirror, raw).await
            }
            Ok(_) | Err(_) => match self.lkg.read(self.env).await {
                Ok(mirror) => {
                    let raw = mirror.to_object().into_values().collect();
                    self.adopt(mirror, raw).await
                }
                Err(e) => {
                    tracing::error!(target: "mirror", error = %e, "cold start with no db and no valid lkg");
                    Err(MirrorError::ColdStartNoDbNoLkg)
                }
            },
        }
    }

    async fn adopt(&self, mirror: Mirror, raw: Vec<ServiceConfigRecord>) -> Result<Arc<Mirror>, MirrorError> {
        let mirror = Arc::new(mirror);
        let mut cached = self.cached.write().await;
        *cached = Some(Cached { mirror: mirror.clone(), refreshed_at: Instant::now(), raw });
        Ok(mirror)
    }

    /// Accept a trusted push replacement: adopt `records` as the new `db`
    /// snapshot unconditionally (no emptiness check — the caller already
    /// decided this is authoritative), then best-effort persist LKG.
    pub async fn replace_with_push(&self, records: Vec<ServiceConfigRecord>) -> Result<(Arc<Mirror>, Option<String>), MirrorError> {
        let raw = records.clone();
        let fetched_at = chrono::Utc::now().to_rfc3339();
        let mirror = Mirror::from_records(records, MirrorSource::Db, fetched_at, self.env)?;
        let payload = mirror.to_object();
        let lkg_error = match self.lkg.write(&payload).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(target: "mirror", error = %e, "lkg write failed after push, in-memory adoption still succeeded");
                Some(e.to_string())
            }
        };
        let mirror = self.adopt(mirror, raw).await?;
        Ok((mirror, lkg_error))
    }

    /// Peek the currently cached record for `slug@version` without
    /// triggering a refresh. Returns `None` if nothing has been loaded yet
    /// or the key isn't present.
    pub async fn get(&self, slug: &str, version: u32) -> Option<ServiceConfigRecord> {
        let cached = self.cached.read().await;
        cached.as_ref()?.mirror.get(slug, version).cloned()
    }

    /// Peek the last-fetched record for `slug@version` before the
    /// enabled-only filter `Mirror::from_records` applies, including
    /// disabled ones. Used by the facilitator's `/resolve` to distinguish a
    /// disabled service from one that was never configured at all — every
    /// other consumer should keep using `get`, which hides disabled records
    /// the same way it hides absent ones.
    pub async fn raw_get(&self, slug: &str, version: u32) -> Option<ServiceConfigRecord> {
        let cached = self.cached.read().await;
        cached.as_ref()?.raw.iter().find(|r| r.slug == slug && r.version == version).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        match self.cached.read().await.as_ref() {
            Some(c) => c.mirror.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub async fn size(&self) -> usize {
        self.cached.read().await.as_ref().map(|c| c.mirror.size()).unwrap_or(0)
    }

    pub async fn snapshot(&self) -> Option<Arc<Mirror>> {
        self.cached.read().await.as_ref().map(|c| c.mirror.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirrorError;
    use crate::loader::MirrorDbLoader;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    struct StubLoader {
        records: Vec<ServiceConfigRecord>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MirrorDbLoader for StubLoader {
        fn load_active<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceConfigRecord>, MirrorError>> + Send + 'a>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = if self.fail {
                Err(MirrorError::DbUnavailable("refused".into()))
            } else {
                Ok(self.records.clone())
            };
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn db_success_adopts_db_source() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(StubLoader { records: vec![sample("user")], fail: false, calls: AtomicUsize::new(0) });
        let store = MirrorStore::new(loader, dir.path().join("mirror.json"), Duration::from_secs(60), Environment::NonProduction);
        let mirror = store.get_with_ttl().await.unwrap();
        assert_eq!(mirror.source, nv_contract::MirrorSource::Db);
        assert_eq!(mirror.size(), 1);
    }

    #[tokio::test]
    async fn db_failure_falls_back_to_lkg() {
        let dir = tempfile::tempdir().unwrap();
        let lkg_path = dir.path().join("mirror.json");
        let seed = MirrorStore::new(
            Arc::new(StubLoader { records: vec![sample("user")], fail: false, calls: AtomicUsize::new(0) }),
            &lkg_path,
            Duration::from_secs(60),
            Environment::NonProduction,
        );
        seed.get_with_ttl().await.unwrap();

        let store = MirrorStore::new(
            Arc::new(StubLoader { records: vec![], fail: true, calls: AtomicUsize::new(0) }),
            &lkg_path,
            Duration::from_secs(60),
            Environment::NonProduction,
        );
        let mirror = store.get_with_ttl().await.unwrap();
        assert_eq!(mirror.source, nv_contract::MirrorSource::Lkg);
    }

    #[tokio::test]
    async fn cold_start_with_no_db_and_no_lkg_fails() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(StubLoader { records: vec![], fail: true, calls: AtomicUsize::new(0) });
        let store = MirrorStore::new(loader, dir.path().join("missing.json"), Duration::from_secs(60), Environment::NonProduction);
        assert!(matches!(store.get_with_ttl().await, Err(MirrorError::ColdStartNoDbNoLkg)));
    }

    #[tokio::test]
    async fn cached_snapshot_is_served_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(StubLoader { records: vec![sample("user")], fail: false, calls: AtomicUsize::new(0) });
        let store = MirrorStore::new(loader.clone(), dir.path().join("mirror.json"), Duration::from_secs(60), Environment::NonProduction);
        store.get_with_ttl().await.unwrap();
        store.get_with_ttl().await.unwrap();
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn replace_with_push_adopts_even_without_db_call() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Arc::new(StubLoader { records: vec![], fail: true, calls: AtomicUsize::new(0) });
        let store = MirrorStore::new(loader, dir.path().join("mirror.json"), Duration::from_secs(60), Environment::NonProduction);
        let (mirror, lkg_err) = store.replace_with_push(vec![sample("user")]).await.unwrap();
        assert_eq!(mirror.size(), 1);
        assert!(lkg_err.is_none());
        assert_eq!(store.get("user", 1).await.unwrap().slug, "user");
    }
}
