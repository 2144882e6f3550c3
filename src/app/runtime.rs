//! Runtime initialization and setup
//!
//! Builds the single store handle and everything that shares it.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::{config::AppConfig, logging::init_logging};
use crate::modes::Services;
use crate::seed;
use crate::server::AppState;
use crate::storage::StorageFactory;

/// Initialize logging, then build the application state
pub async fn initialize_app(config: &AppConfig) -> Result<AppState> {
    init_logging(config);
    build_state(config).await
}

/// Construct the store from configuration and wire the services onto it
pub async fn build_state(config: &AppConfig) -> Result<AppState> {
    let store = StorageFactory::from_config(&config.storage)
        .context("Failed to create document store")?;

    // an unreachable store is reported per request, not at startup
    match store.health_check().await {
        Ok(health) if health.healthy => {
            info!("{} store healthy ({} ms)", health.backend_type, health.latency_ms)
        }
        Ok(health) => warn!(
            "{} store unhealthy: {}",
            health.backend_type,
            health.errors.join("; ")
        ),
        Err(e) => warn!("Store health check failed: {}", e),
    }

    let dataset = seed::load(config.seed_file.as_deref()).context("Failed to load seed data")?;

    Ok(AppState {
        services: Services::new(
            Arc::clone(&store),
            &config.collections,
            &config.query,
            &config.merge,
        ),
        store,
        dataset: Arc::new(dataset),
        cities: config.query.clone(),
    })
}
