use std::future::Future;
use std::pin::Pin;

use dashmap::DashMap;

use nv_contract::AuditRecord;

/// Idempotent persistence target for audit entries. A production backend
/// would be a database; the in-memory implementation here is sufficient for
/// this workspace's scope (persistence backend internals are out of
/// bounds — see the mesh's non-goals).
pub trait AuditStore: Send + Sync + 'static {
    /// Persist one record keyed by `record.event_id`. Returns `true` if this
    /// call actually stored a new record, `false` if the event id was
    /// already present (a harmless re-delivery, e.g. a replayed WAL batch).
    fn persist<'a>(&'a self, record: AuditRecord) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

#[derive(Default)]
pub struct InMemoryAuditStore {
    records: DashMap<String, AuditRecord>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, event_id: &str) -> Option<AuditRecord> {
        self.records.get(event_id).map(|r| r.clone())
    }
}

impl AuditStore for InMemoryAuditStore {
    fn persist<'a>(&'a self, record: AuditRecord) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        let event_id = record.event_id.clone();
        let is_new = !self.records.contains_key(&event_id);
        self.records.insert(event_id, record);
        Box::pin(async move { is_new })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nv_contract::FinalizeReason;

    fn record(event_id: &str) -> AuditRecord {
        let mut record = AuditRecord::from_begin_end(
            "r1",
            1000,
            1500,
            FinalizeReason::Finish,
            "GET".into(),
            "/users/1".into(),
            "user".into(),
            200,
        );
        record.event_id = event_id.to_string();
        record
    }

    #[tokio::test]
    async fn duplicate_event_id_persists_once() {
        let store = InMemoryAuditStore::new();
        assert!(store.persist(record("evt-1")).await);
        assert!(!store.persist(record("evt-1")).await);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn replaying_the_same_record_twice_keeps_fields_identical() {
        let store = InMemoryAuditStore::new();
        store.persist(record("evt-1")).await;
        store.persist(record("evt-1")).await;
        let stored = store.get("evt-1").unwrap();
        assert_eq!(stored.duration_ms, 500);
        assert_eq!(stored.billable_units, 1);
    }
}
