use crate::api::{ApiServer, ApiState};
use crate::config::Config;
use crate::migration::Migrator;
use crate::session::SessionStore;
use crate::storage::StorageChoice;
use crate::webex::WebexClient;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub async fn run_service() -> Result<()> {
    info!("Starting recording migrator service");

    let config = Config::load_with_env()?;
    config
        .webex
        .validate()
        .context("Webex integration is not configured")?;

    let migrator = build_migrator(&config).await?;
    let sessions = SessionStore::with_ttl_minutes(config.server.session_ttl_minutes);

    info!(
        "{} mode, destination {} ({})",
        migrator.policy().action_label(),
        migrator.destination(),
        migrator.store().location_link()
    );

    let api_server = ApiServer::new(
        &config.server,
        ApiState {
            migrator,
            sessions,
            webex: config.webex.clone(),
        },
    );

    info!("Recording migrator is ready!");
    info!(
        "Open http://{}:{}/ (interactive) or /bulk in a browser to start",
        config.server.bind, config.server.port
    );

    api_server.start().await
}

/// Resolves the storage backend and wires it to a Webex client.
pub async fn build_migrator(config: &Config) -> Result<Arc<Migrator>> {
    let choice = StorageChoice::from_config(&config.storage)
        .context("No usable storage backend configured")?;
    let store = choice.build().await?;
    let provider = Arc::new(WebexClient::new(&config.webex));

    Ok(Arc::new(Migrator::new(
        provider,
        store,
        config.behavior.transfer_policy(),
    )))
}
