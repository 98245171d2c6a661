use std::sync::Arc;

use nv_mirror::MirrorStore;
use nv_s2s::S2sClient;
use nv_wal::Wal;

use crate::ratelimit::RateLimiter;

#[derive(Clone)]
pub struct GatewayState {
    pub mirror: Arc<MirrorStore>,
    pub s2s: Arc<S2sClient>,
    pub wal: Arc<Wal>,
    pub rate_limiter: RateLimiter,
    pub http: reqwest::Client,
    pub facilitator_base_url: String,
    /// Hard ceiling on the in-flight request lifetime, enforced around the
    /// whole pipeline (not just the upstream call) so a slow Mirror refresh
    /// or WAL append can't hang a request past the DoS guard's budget.
    pub request_timeout_ms: u64,
}
