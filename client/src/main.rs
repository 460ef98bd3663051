//! skul-syncd - background sync agent.
//!
//! Watches API reachability and replays writes queued in the cache
//! directory whenever the API comes back.

use skul_sync_client::{
    spawn_probe, Config, CoordinatorOptions, Credentials, FileStorage, HttpRemoteClient,
    ReachabilityMonitor, SyncCoordinator,
};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skul_sync_client=debug,skul_syncd=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(
        api = %config.api_base_url,
        cache_dir = %config.cache_dir.display(),
        "Starting skul-syncd"
    );

    let storage = FileStorage::open(&config.cache_dir, config.cache_quota_bytes)?;
    let remote = Arc::new(HttpRemoteClient::from_config(
        &config,
        Credentials::new(config.api_token.clone()),
    )?);

    // Start offline; the first probe decides.
    let monitor = ReachabilityMonitor::new(false);
    let coordinator = SyncCoordinator::with_options(
        remote.clone(),
        storage,
        monitor.clone(),
        CoordinatorOptions {
            request_timeout: config.request_timeout,
        },
    );

    let mut events = coordinator.subscribe();
    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(change) => {
                    tracing::info!(
                        scope = %change.scope_key,
                        state = %change.state,
                        stale = change.state.is_stale(),
                        busy = change.state.is_busy(),
                        "Scope state"
                    )
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "State log fell behind")
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let probe = spawn_probe(
        monitor,
        remote,
        config.probe_path.clone(),
        config.probe_interval,
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    probe.abort();
    coordinator.shutdown();
    logger.abort();

    Ok(())
}
