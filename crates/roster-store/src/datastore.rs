//! The datastore capability surface used at startup.

use async_trait::async_trait;
use roster_types::{UserAccount, config::DbConfig};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{
    DbError, DbResult, db::{DbLocation, is_supported_driver, open_pool, resolve_location, validate_config}, schema, users
};

/// What process bootstrap needs from a backend: schema setup and user accounts.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn create_tables(&self) -> DbResult<()>;

    /// Create an account. Creating an existing user id is a no-op.
    async fn create_user_account(&self, user: &mut UserAccount) -> DbResult<()>;

    /// Authenticate-style lookup: both id and credential hash must match.
    async fn get_user_account(&self, user_id: &str, credential_hash: &str) -> DbResult<UserAccount>;

    async fn update_user_account(&self, user: &UserAccount) -> DbResult<()>;

    async fn delete_user_account(&self, user_id: &str) -> DbResult<()>;
}

/// SQLite backend. Owns the process-wide pool.
#[derive(Clone, Debug)]
pub struct SqliteDataStore {
    pool: SqlitePool,
    location: DbLocation,
}

impl SqliteDataStore {
    /// Validate the configuration and open the database it names.
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        validate_config(config)?;
        if config.transport().is_some() {
            debug!(transport = ?config.transport(), "transport setting ignored by the sqlite backend");
        }
        let location = resolve_location(config).await?;
        let pool = open_pool(&location).await?;
        info!(db = %location.display(), "datastore connected");
        Ok(Self { pool, location })
    }

    /// The shared pool, for org and role operations or caller-managed transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn location(&self) -> &DbLocation {
        &self.location
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!(db = %self.location.display(), "datastore closed");
    }
}

#[async_trait]
impl DataStore for SqliteDataStore {
    async fn create_tables(&self) -> DbResult<()> {
        let mut pool = self.pool.clone();
        schema::create_tables(&mut pool).await
    }

    async fn create_user_account(&self, user: &mut UserAccount) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        users::create_user_entry(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_user_account(&self, user_id: &str, credential_hash: &str) -> DbResult<UserAccount> {
        let mut pool = self.pool.clone();
        users::fetch_user_by_id_and_credential(&mut pool, user_id, credential_hash)
            .await?
            .ok_or_else(|| DbError::not_found("user", user_id))
    }

    async fn update_user_account(&self, user: &UserAccount) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        users::update_user_entry(&mut tx, user).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_user_account(&self, user_id: &str) -> DbResult<()> {
        let mut pool = self.pool.clone();
        if users::delete_user_entry(&mut pool, user_id).await? == 0 {
            return Err(DbError::not_found("user", user_id));
        }
        Ok(())
    }
}

/// Open the backend named by `config.driver`.
pub async fn open_datastore(config: &DbConfig) -> DbResult<Box<dyn DataStore>> {
    validate_config(config)?;
    let driver = config.driver.trim();
    if is_supported_driver(driver) {
        return Ok(Box::new(SqliteDataStore::connect(config).await?));
    }
    Err(DbError::InvalidDriver(driver.to_string()))
}
