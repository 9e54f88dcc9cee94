//! rtbridged - device inventory to Request Tracker bridge daemon.

use anyhow::{bail, Context, Result};
use rtbridged::config::{BridgeConfig, CONFIG_PATH};
use rtbridged::coordinator::Coordinator;
use rtbridged::gateway::Gateway;
use rtbridged::inventory::DeviceRegistry;
use rtbridged::rt_client::RtClient;
use rtbridged::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("rtbridged v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_PATH));
    let config = BridgeConfig::load(&config_path)?;

    let client = Arc::new(RtClient::new(&config.url, &config.token)?);

    // Validate the connection once at setup. A bad credential is fatal;
    // an unreachable RT is not, the next trigger will retry anyway.
    match client.test_connection().await {
        Ok(()) => info!("RT connection verified at {}", config.url),
        Err(err) if err.is_fatal_at_setup() => bail!("RT rejected credentials: {err}"),
        Err(err) => warn!("RT not reachable at startup: {err}"),
    }

    let registry = Arc::new(
        DeviceRegistry::with_persistence(&config.registry_path)
            .context("failed to open device registry")?,
    );

    let coordinator = Arc::new(Coordinator::new(
        client,
        Arc::clone(&registry) as _,
        config.context(),
    ));

    let _event_loop = coordinator.spawn_event_loop(registry.subscribe());
    let _scheduler = coordinator.spawn_scheduled_sync(config.sync_interval_hours);

    let state = Arc::new(AppState {
        coordinator,
        registry,
    });
    let router = server::build_router(state);
    server::run(&config.listen, router).await?;

    info!("rtbridged stopped");
    Ok(())
}
