use std::sync::Arc;
use std::time::Duration;

use nv_app::config::NvConfig;
use nv_app::prelude::*;
use nv_contract::Environment;
use nv_gateway::{FacilitatorMirrorLoader, GatewayController, GatewayState, HttpAuditWriter, RateLimiter};
use nv_mirror::MirrorStore;
use nv_s2s::{HmacSigner, Resolver, RetryPolicy, S2sClient, TokenMinter};
use nv_wal::Wal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    nv_app::layers::init_tracing();

    let config = NvConfig::load("default")?;
    config.require(&[
        "svcgateway.bind.addr",
        "svcgateway.wal.dir",
        "svcgateway.lkg.path",
        "svcfacilitator.base.url",
        "svcauditreceiver.base.url",
        "s2s.hmac.secret",
    ])?;

    let bind_addr: String = config.get("svcgateway.bind.addr")?;
    let wal_dir: String = config.get("svcgateway.wal.dir")?;
    let lkg_path: String = config.get("svcgateway.lkg.path")?;
    let facilitator_base_url: String = config.get("svcfacilitator.base.url")?;
    let audit_receiver_base_url: String = config.get("svcauditreceiver.base.url")?;
    let hmac_secret: String = config.get("s2s.hmac.secret")?;

    let mirror_ttl_secs: i64 = config.get_or("mirror.ttl.secs", 30);
    let resolver_ttl_secs: i64 = config.get_or("resolver.cache.ttl.secs", 30);
    let fsync_interval_ms: i64 = config.get_or("wal.fsync.interval.ms", 200);
    let wal_capacity: i64 = config.get_or("wal.capacity", 10_000);
    let wal_replay_max_attempts: i64 = config.get_or("wal.replay.max.attempts", 5);
    let rate_limit_max: i64 = config.get_or("gateway.ratelimit.max.tokens", 100);
    let rate_limit_window_secs: i64 = config.get_or("gateway.ratelimit.window.secs", 1);
    let request_timeout_ms: i64 = config.get_or("gateway.request.timeout.ms", 10_000);
    let token_ttl_secs: i64 = config.get_or("s2s.token.ttl.secs", 60);

    let http = reqwest::Client::new();

    let db_loader = Arc::new(FacilitatorMirrorLoader::new(http.clone(), facilitator_base_url.clone()));
    let mirror = Arc::new(MirrorStore::new(
        db_loader,
        lkg_path,
        Duration::from_secs(mirror_ttl_secs.max(0) as u64),
        Environment::NonProduction,
    ));
    // Prime the cache before accepting traffic so the first request doesn't
    // race an empty Mirror.
    let _ = mirror.get_with_ttl().await;

    let resolver = Resolver::new(
        mirror.clone(),
        Duration::from_secs(resolver_ttl_secs.max(0) as u64),
        "facilitator",
        facilitator_base_url.clone(),
    );
    let signer = Arc::new(HmacSigner::new(&hmac_secret));
    let minter = TokenMinter::new(signer, "gateway", "mesh", token_ttl_secs.max(0) as u64);
    let s2s = Arc::new(S2sClient::new(http.clone(), resolver, mirror.clone(), minter, RetryPolicy::default()));

    let wal = Arc::new(Wal::new(wal_dir, fsync_interval_ms.max(0) as u64, wal_capacity.max(0) as usize));
    wal.set_writer(Arc::new(HttpAuditWriter::new(http.clone(), audit_receiver_base_url))).await;
    // Replay must complete before the gateway accepts live traffic, so any
    // audit entries stranded by a prior crash reach the receiver first.
    let _ = wal.replay(wal_replay_max_attempts.max(1) as u32).await;

    let rate_limiter = RateLimiter::new(rate_limit_max.max(0) as u64, Duration::from_secs(rate_limit_window_secs.max(1) as u64));

    let state = GatewayState {
        mirror,
        s2s,
        wal,
        rate_limiter,
        http,
        facilitator_base_url,
        request_timeout_ms: request_timeout_ms.max(0) as u64,
    };

    AppBuilder::new()
        .with_state(state)
        .with_config(config)
        .with(Health)
        .with(Cors::permissive())
        .with(Tracing)
        .with(ErrorHandling)
        .with(RequestIdPlugin)
        .register_controller::<GatewayController>()
        .serve(&bind_addr)
        .await
}
