use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use nv_app::config::NvConfig;
use nv_app::prelude::*;
use nv_contract::{Environment, ServiceConfigRecord};
use nv_facilitator::{FacilitatorController, FacilitatorState, PolicyStore};
use nv_mirror::{MirrorDbLoader, MirrorError, MirrorStore};

/// Database integration is out of scope for this workspace (see the
/// persistence non-goal); this loader always reports the DB as
/// unreachable so the Mirror's fallback chain exercises its LKG path on
/// every boot, the way it would if a real backend were down.
struct NullDbLoader;

impl MirrorDbLoader for NullDbLoader {
    fn load_active<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<ServiceConfigRecord>, MirrorError>> + Send + 'a>> {
        Box::pin(async { Err(MirrorError::DbUnavailable("no database backend configured".to_string())) })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    nv_app::layers::init_tracing();

    let config = NvConfig::load("default")?;
    config.require(&["svcfacilitator.bind.addr", "svcfacilitator.lkg.path"])?;

    let bind_addr: String = config.get("svcfacilitator.bind.addr")?;
    let lkg_path: String = config.get("svcfacilitator.lkg.path")?;
    let ttl_secs: i64 = config.get_or("mirror.ttl.secs", 30);

    let mirror = Arc::new(MirrorStore::new(
        Arc::new(NullDbLoader),
        lkg_path,
        Duration::from_secs(ttl_secs.max(0) as u64),
        Environment::NonProduction,
    ));
    let policies = Arc::new(PolicyStore::new());
    let state = FacilitatorState { mirror, policies };

    AppBuilder::new()
        .with_state(state)
        .with_config(config)
        .with(Health)
        .with(Cors::permissive())
        .with(Tracing)
        .with(ErrorHandling)
        .register_controller::<FacilitatorController>()
        .serve(&bind_addr)
        .await
}
