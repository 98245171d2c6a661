use std::future::Future;
use std::pin::Pin;

use nv_contract::ServiceConfigRecord;

use crate::error::MirrorError;

/// Source of truth for service-configuration records. In production this
/// queries the facilitator's database; in tests it can be a fixed list or a
/// closure-backed stub.
pub trait MirrorDbLoader: Send + Sync + 'static {
    /// Load every record currently known to the DB (enabled or not — the
    /// mirror itself filters to enabled). An `Err` means the DB could not
    /// be reached at all, not that it returned zero rows.
    fn load_active<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceConfigRecord>, MirrorError>> + Send + 'a>>;
}
