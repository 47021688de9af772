//! Report commands.
//!
//! Every command builds one store against the configured backend, mounts it
//! and logs the view it was asked for.

pub mod evolution;
pub mod report;

use chrono::Utc;
use tarimas_core::{DateWindow, Granularity};
use tarimas_inventory::{
    ConfigError, EventBus, InventoryApiClient, InventoryConfig, InventoryStore, SourceError,
    StoreSettings,
};
use thiserror::Error;

/// Errors that can occur while running a report.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Backend request failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Report could not be serialized.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Connect to the backend and mount a store.
///
/// `window` overrides the default evolution window of
/// `TARIMAS_EVOLUTION_DAYS` days ending today. `granularity` is the series
/// fetched on mount.
pub async fn open_store(
    window: Option<DateWindow>,
    granularity: Granularity,
) -> Result<InventoryStore<InventoryApiClient>, CommandError> {
    let config = InventoryConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    let client = InventoryApiClient::new(&config)?;
    let settings = StoreSettings {
        origin: None,
        evolution_window: window.unwrap_or_else(|| {
            DateWindow::last_days(Utc::now().date_naive(), config.evolution_days)
        }),
        evolution_granularity: granularity,
    };

    tracing::info!(backend = %client.base_url(), "Loading inventory...");
    let store = InventoryStore::with_settings(client, EventBus::new(), settings);
    store.mount().await?;
    Ok(store)
}
