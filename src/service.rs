use anyhow::{Context, Result};
use roster_store::{DataStore, SqliteDataStore};
use tracing::info;

use crate::cli::CliConfig;

/// Open the datastore, create the tables, then serve until asked to stop.
pub async fn run_service(cfg: CliConfig) -> Result<()> {
    let store = SqliteDataStore::connect(&cfg.app.db)
        .await
        .context("failed to open the datastore")?;
    store.create_tables().await.context("failed to create datastore tables")?;
    info!(db = %store.location().display(), "duty roster ready, press Ctrl+C to exit");

    shutdown_signal().await?;
    info!("shutting down");
    store.close().await;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
