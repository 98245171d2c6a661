use tokio::sync::RwLock;

use nv_contract::{PolicyKind, RoutePolicy};

/// In-memory store of route policies, keyed implicitly by
/// `(svcconfig_id, version)` on lookup. Owned by the facilitator alongside
/// the Mirror; replaced wholesale on every DB reload.
pub struct PolicyStore {
    entries: RwLock<Vec<(PolicyKind, RoutePolicy)>>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self { entries: RwLock::new(Vec::new()) }
    }

    pub async fn replace_all(&self, policies: Vec<(PolicyKind, RoutePolicy)>) {
        *self.entries.write().await = policies;
    }

    /// Policies for one `svcconfig_id@version`, split into edge-facing and
    /// S2S-facing lists with disabled entries dropped.
    pub async fn for_service(&self, svcconfig_id: &str, version: u32) -> (Vec<RoutePolicy>, Vec<RoutePolicy>) {
        let entries = self.entries.read().await;
        let matching = entries
            .iter()
            .filter(|(_, p)| p.svcconfig_id == svcconfig_id && p.version == version)
            .cloned();
        nv_contract::partition_enabled(matching)
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(kind: PolicyKind, method: &str, enabled: bool) -> (PolicyKind, RoutePolicy) {
        (
            kind,
            RoutePolicy {
                svcconfig_id: "user".into(),
                version: 1,
                method: method.into(),
                path: "/users".into(),
                min_access_level: 0,
                enabled,
            },
        )
    }

    #[tokio::test]
    async fn for_service_filters_by_key_and_splits_by_kind() {
        let store = PolicyStore::new();
        store
            .replace_all(vec![
                policy(PolicyKind::Edge, "GET", true),
                policy(PolicyKind::S2s, "POST", true),
                policy(PolicyKind::Edge, "DELETE", false),
            ])
            .await;
        let (edge, s2s) = store.for_service("user", 1).await;
        assert_eq!(edge.len(), 1);
        assert_eq!(s2s.len(), 1);
    }
}
