use std::sync::Arc;

use dashmap::DashMap;

use crate::store::AuditStore;

/// A BEGIN entry's fields, held until the matching END entry arrives so the
/// pair can be folded into one [`nv_contract::AuditRecord`].
#[derive(Clone)]
pub struct PendingBegin {
    pub ts: i64,
    pub method: String,
    pub path: String,
    pub slug: String,
}

#[derive(Clone)]
pub struct AuditReceiverState {
    /// `None` until the backing store has finished initializing (e.g. a
    /// real backend still connecting at boot); handlers return
    /// `WAL_NOT_READY` while this is unset.
    pub store: Option<Arc<dyn AuditStore>>,
    /// BEGIN entries awaiting their END, keyed by request id. A BEGIN that
    /// never gets an END (client abort, crash before the END append) is
    /// simply left here — it costs one map entry, never a correctness bug.
    pub pending_begins: Arc<DashMap<String, PendingBegin>>,
}

impl AuditReceiverState {
    pub fn new(store: Option<Arc<dyn AuditStore>>) -> Self {
        Self { store, pending_begins: Arc::new(DashMap::new()) }
    }
}
