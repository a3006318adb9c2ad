//! # Durable Functions Monitor Server
//!
//! Loads configuration, connects the storage backends and serves the
//! monitoring API until the process is stopped.

use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};

use durable_monitor::config::{ConfigManager, ConfigurationError};
use durable_monitor::logging::init_structured_logging;
use durable_monitor::storage::{PostgresStorage, StorageConnections};
use durable_monitor::web::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();

    let manager = ConfigManager::load().context("failed to load monitor configuration")?;
    let config = Arc::new(manager.config().clone());
    config.validate().context("invalid monitor configuration")?;

    info!(
        environment = %manager.environment(),
        config_directory = %manager.config_directory().display(),
        "Configuration loaded"
    );

    let database_url = config
        .storage
        .database_url
        .as_deref()
        .ok_or_else(|| ConfigurationError::missing_required_field("storage.database_url"))?;
    let default_storage =
        PostgresStorage::connect(database_url, config.storage.max_connections).await?;
    if !default_storage.health_check().await? {
        anyhow::bail!("default storage failed its health check");
    }
    let mut connections = StorageConnections::new(Arc::new(default_storage));

    for (name, url) in &config.storage.alternative_connections {
        let storage = PostgresStorage::connect(url, config.storage.max_connections)
            .await
            .with_context(|| format!("failed to connect alternative storage '{name}'"))?;
        connections = connections.with_alternative(name.clone(), Arc::new(storage));
        info!(connection = %name, "Alternative storage connected");
    }

    let state = AppState::new(config, connections);
    if let Err(e) = web::serve(state).await {
        error!(error = %e, "Monitor server stopped with an error");
        return Err(e);
    }
    Ok(())
}
