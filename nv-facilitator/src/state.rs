use std::sync::Arc;

use nv_mirror::MirrorStore;

use crate::policy_store::PolicyStore;

#[derive(Clone)]
pub struct FacilitatorState {
    pub mirror: Arc<MirrorStore>,
    pub policies: Arc<PolicyStore>,
}
