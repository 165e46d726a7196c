//! Database location resolution and pool setup.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use roster_types::config::DbConfig;
use sqlx::{
    SqlitePool, sqlite::{SqliteConnectOptions, SqlitePoolOptions}
};
use tracing::{info, warn};

use crate::{DbError, DbResult};

const MEMORY_TARGET: &str = ":memory:";
const SUPPORTED_DRIVERS: [&str; 3] = ["sqlite", "sqlite3", "sqllite3"];
const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// Where the SQLite database lives, resolved from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DbLocation {
    Memory,
    File { path: PathBuf, freshly_created: bool },
}

impl DbLocation {
    pub fn display(&self) -> String {
        match self {
            DbLocation::Memory => MEMORY_TARGET.to_string(),
            DbLocation::File { path, .. } => path.display().to_string(),
        }
    }
}

/// Check driver, target and credentials before anything is opened.
pub fn validate_config(config: &DbConfig) -> DbResult<()> {
    let driver = config.driver.trim();
    if driver.is_empty() || config.target().is_empty() {
        return Err(DbError::NullDbConfig);
    }
    if !is_supported_driver(driver) {
        return Err(DbError::InvalidDriver(driver.to_string()));
    }
    if let Some(creds) = config.credentials()
        && (creds.user.is_empty() || creds.password.is_empty())
    {
        return Err(DbError::InvalidCredentials);
    }
    Ok(())
}

pub fn is_supported_driver(driver: &str) -> bool {
    SUPPORTED_DRIVERS.iter().any(|d| d.eq_ignore_ascii_case(driver.trim()))
}

pub async fn resolve_location(config: &DbConfig) -> DbResult<DbLocation> {
    let target = config.target();
    if target == MEMORY_TARGET || target == "sqlite::memory:" {
        return Ok(DbLocation::Memory);
    }
    let path = PathBuf::from(target.strip_prefix("sqlite://").unwrap_or(target));
    let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(DbLocation::File {
        path,
        freshly_created: !existed,
    })
}

/// Open the shared pool for a resolved location.
///
/// An in-memory database exists per connection, so it is pinned to a single
/// connection that is never recycled.
pub async fn open_pool(location: &DbLocation) -> DbResult<SqlitePool> {
    let (options, pool_options) = match location {
        DbLocation::Memory => (
            SqliteConnectOptions::from_str("sqlite::memory:")?,
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None),
        ),
        DbLocation::File { path, .. } => (
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true)
                .busy_timeout(Duration::from_secs(5)),
            SqlitePoolOptions::new().max_connections(max_connections()),
        ),
    };

    let pool = pool_options
        .connect_with(options.foreign_keys(true))
        .await
        .map_err(|source| DbError::ConnectionFailed {
            target: location.display(),
            source,
        })?;

    if let DbLocation::File { path, freshly_created } = location {
        if *freshly_created {
            info!(db = %path.display(), "created new database file");
        }
        match restrict_to_owner(path).await {
            Ok(true) => warn!(db = %path.display(), "database file was readable by others, mode reset to 0600"),
            Ok(false) => {}
            Err(err) => warn!(db = %path.display(), error = %err, "could not check database file permissions"),
        }
    }
    Ok(pool)
}

fn max_connections() -> u32 {
    std::env::var("ROSTER_DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_MAX_CONNECTIONS)
}

/// Restrict a database file to its owner. Returns whether the mode changed.
#[cfg(unix)]
async fn restrict_to_owner(path: &Path) -> DbResult<bool> {
    use std::{fs::Permissions, os::unix::fs::PermissionsExt};

    const OWNER_ONLY: u32 = 0o600;
    let mode = tokio::fs::metadata(path).await?.permissions().mode() & 0o777;
    if mode == OWNER_ONLY {
        return Ok(false);
    }
    tokio::fs::set_permissions(path, Permissions::from_mode(OWNER_ONLY)).await?;
    Ok(true)
}

#[cfg(not(unix))]
async fn restrict_to_owner(_path: &Path) -> DbResult<bool> {
    Ok(false)
}
