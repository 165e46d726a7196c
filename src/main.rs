mod cli;
mod logging;
mod service;

use crate::{cli::CliConfig, service::run_service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = CliConfig::parse()?;
    logging::init_tracing(&cfg.app.logging)?;
    tracing::info!(config = %cfg.config_path.display(), "configuration loaded");

    run_service(cfg).await
}
