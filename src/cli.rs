use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use roster_types::config::AppConfig;

#[derive(Debug, Parser)]
#[command(
    name = "duty-roster",
    about = "Organizational directory backend: org hierarchy, user accounts and roles"
)]
struct RawArgs {
    /// Application JSON configuration file
    #[arg(short = 'c', long = "cfgfile", value_name = "FILE")]
    cfgfile: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub config_path: PathBuf,
    pub app: AppConfig,
}

impl CliConfig {
    pub fn parse() -> Result<Self> {
        Self::from_args(RawArgs::parse())
    }

    fn from_args(args: RawArgs) -> Result<Self> {
        let config_path = std::path::absolute(&args.cfgfile)
            .with_context(|| format!("cannot resolve config path {}", args.cfgfile.display()))?;
        let app = AppConfig::load(&config_path)?;
        Ok(Self { config_path, app })
    }
}
