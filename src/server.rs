//! Service runtime setup.
//!
//! Opens the configured store, starts the shortener service and keeps it alive
//! until a termination signal arrives, then drains the deletion queue.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::application::services::ShortenerService;
use crate::config::Config;
use crate::infrastructure::persistence::open_store;

/// Upper bound on the final deletion flush.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the service described by `config`.
///
/// Initializes:
/// - The link store selected by [`Config::storage`]
/// - The deletion queue and its flush loop
///
/// # Errors
///
/// Returns an error if the store cannot be opened or does not answer a ping.
pub async fn build_service(config: &Config) -> Result<Arc<ShortenerService>> {
    let store = open_store(config)
        .await
        .with_context(|| format!("Failed to open {} store", config.storage.kind()))?;
    store.ping().await.context("Link store is not reachable")?;

    Ok(Arc::new(ShortenerService::from_config(store, config)))
}

/// Runs the service until Ctrl+C.
///
/// # Errors
///
/// Returns an error if startup fails. A shutdown that exceeds
/// [`SHUTDOWN_TIMEOUT`] is logged, not returned.
pub async fn run(config: Config) -> Result<()> {
    let service = build_service(&config).await?;
    tracing::info!(
        backend = service.backend_name(),
        "Shortener service started"
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received, flushing pending deletions"),
        Err(e) => tracing::warn!(
            "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
            e
        ),
    }

    if timeout(SHUTDOWN_TIMEOUT, service.shutdown()).await.is_err() {
        tracing::error!(
            "Deletion queue did not drain within {} seconds",
            SHUTDOWN_TIMEOUT.as_secs()
        );
    }

    tracing::info!("Shortener service stopped");
    Ok(())
}
