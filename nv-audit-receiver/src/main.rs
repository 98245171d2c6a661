use std::sync::Arc;

use nv_app::config::NvConfig;
use nv_app::prelude::*;
use nv_audit_receiver::{AuditReceiverController, AuditReceiverState, InMemoryAuditStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    nv_app::layers::init_tracing();

    let config = NvConfig::load("default")?;
    config.require(&["svcauditreceiver.bind.addr"])?;

    let bind_addr: String = config.get("svcauditreceiver.bind.addr")?;

    // No external persistence backend is in scope for this workspace, so the
    // store is ready from the first request rather than modeling an
    // async-initializing connection.
    let state = AuditReceiverState::new(Some(Arc::new(InMemoryAuditStore::new())));

    AppBuilder::new()
        .with_state(state)
        .with_config(config)
        .with(Health)
        .with(Cors::permissive())
        .with(Tracing)
        .with(ErrorHandling)
        .register_controller::<AuditReceiverController>()
        .serve(&bind_addr)
        .await
}
