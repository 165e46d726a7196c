//! Application configuration loaded from a JSON file.
//!
//! The file layout is:
//!
//! ```json
//! {
//!   "logging": { "loglevel": "info", "filepath": "/var/log/roster.log" },
//!   "db": { "driver": "sqlite", "dbpath": "/var/lib/roster/roster.db" }
//! }
//! ```
//!
//! Every field is optional in the file; validation of database parameters is
//! left to the datastore that consumes them.

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overrides `db.dbpath` when set.
pub const DB_PATH_ENV: &str = "ROSTER_DB_PATH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to open config file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub db: DbConfig,
}

impl AppConfig {
    /// Read and parse a JSON config file, then apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: AppConfig = serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(DB_PATH_ENV)
            && !value.trim().is_empty()
        {
            self.db.dbpath = value;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace, debug, info, warn, error.
    #[serde(rename = "loglevel")]
    pub level: String,
    /// Log file; `None` logs to stdout only.
    #[serde(rename = "filepath", deserialize_with = "empty_path_as_none")]
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
        }
    }
}

/// Connection parameters for the datastore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Driver name, e.g. `sqlite`.
    pub driver: String,
    /// Connection target: a database file path, or `:memory:`.
    pub dbpath: String,
    /// Host of a networked database server.
    pub ipaddr: String,
    pub port: String,
    pub uname: String,
    pub pwd: String,
    /// Transport protocol to reach a networked server, `tcp` or `udp`.
    pub transport: String,
}

/// User/password pair from [`DbConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub user: &'a str,
    pub password: &'a str,
}

impl DbConfig {
    pub fn target(&self) -> &str {
        self.dbpath.trim()
    }

    /// Credentials, if any part of them was supplied.
    pub fn credentials(&self) -> Option<Credentials<'_>> {
        if self.uname.is_empty() && self.pwd.is_empty() {
            return None;
        }
        Some(Credentials {
            user: &self.uname,
            password: &self.pwd,
        })
    }

    pub fn transport(&self) -> Option<&str> {
        let transport = self.transport.trim();
        (!transport.is_empty()).then_some(transport)
    }
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
}
