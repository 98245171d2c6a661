use std::sync::Arc;
use std::time::Duration;

use nv_cache::TtlCache;
use nv_mirror::MirrorStore;

use crate::error::S2sError;

/// Resolves `slug@version` to a composed outbound base URL, backed by the
/// Mirror and cached with its own TTL so repeated calls to the same target
/// don't re-walk the mirror on every request.
///
/// The facilitator is special-cased: its base comes from explicit
/// configuration rather than the Mirror, to avoid the bootstrap
/// circularity of needing the facilitator to resolve the facilitator.
pub struct Resolver {
    mirror: Arc<MirrorStore>,
    cache: TtlCache<String, String>,
    facilitator_slug: String,
    facilitator_base_url: String,
}

impl Resolver {
    pub fn new(mirror: Arc<MirrorStore>, ttl: Duration, facilitator_slug: impl Into<String>, facilitator_base_url: impl Into<String>) -> Self {
        Self {
            mirror,
            cache: TtlCache::new(ttl),
            facilitator_slug: facilitator_slug.into(),
            facilitator_base_url: facilitator_base_url.into(),
        }
    }

    pub async fn resolve(&self, slug: &str, version: u32) -> Result<String, S2sError> {
        if slug == self.facilitator_slug {
            return Ok(self.facilitator_base_url.trim_end_matches('/').to_string());
        }

        let key = format!("{slug}@{version}");
        if let Some(base) = self.cache.get(&key) {
            return Ok(base);
        }

        let record = self
            .mirror
            .get(slug, version)
            .await
            .ok_or_else(|| S2sError::UnknownTarget(key.clone()))?;
        let base = record.composed_base();
        self.cache.insert(key, base.clone());
        Ok(base)
    }

    pub fn invalidate(&self, slug: &str, version: u32) {
        self.cache.remove(&format!("{slug}@{version}"));
    }
}
