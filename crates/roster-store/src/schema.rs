//! Table definitions and creation.

use tracing::{debug, info};

use crate::{DbError, DbResult, StoreHandle};

pub const ROLE_TABLE: &str = "roles";
pub const ORG_TABLE: &str = "org";
pub const USER_TABLE: &str = "users";

const ROLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    role_type INTEGER NOT NULL PRIMARY KEY CHECK (role_type > 0)
)"#;

// Name/address uniqueness among siblings is enforced by the engine's
// (name, address, parent) lookup, not by a constraint.
const ORG_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS org (
    uuid TEXT NOT NULL PRIMARY KEY,
    name VARCHAR(500) NOT NULL,
    address VARCHAR(500),
    parent TEXT NULL REFERENCES org (uuid) ON DELETE SET NULL ON UPDATE SET NULL,
    status INTEGER NOT NULL CHECK (status > 0),
    start_time TIMESTAMP NOT NULL,
    validity INTEGER NULL
)"#;

const ORG_PARENT_INDEX: &str = "CREATE INDEX IF NOT EXISTS org_parent_idx ON org (parent)";

const USER_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id VARCHAR(1000) NOT NULL PRIMARY KEY,
    email VARCHAR(1000) NOT NULL,
    credential_hash VARCHAR(1000) NOT NULL,
    mobile VARCHAR(1000) NOT NULL,
    dob DATE NOT NULL,
    start_time TIMESTAMP NOT NULL,
    validity INTEGER,
    status INTEGER NOT NULL CHECK (status > 0)
)"#;

async fn create_table(handle: &mut impl StoreHandle, table: &'static str, statements: &[&'static str]) -> DbResult<()> {
    for &statement in statements {
        handle
            .exec(sqlx::query(statement))
            .await
            .map_err(|err| match err {
                DbError::Query(source) => DbError::TableCreateFailed { table, source },
                other => other,
            })?;
    }
    debug!(table, "table ready");
    Ok(())
}

pub async fn create_role_table(handle: &mut impl StoreHandle) -> DbResult<()> {
    create_table(handle, ROLE_TABLE, &[ROLE_SCHEMA]).await
}

pub async fn create_org_table(handle: &mut impl StoreHandle) -> DbResult<()> {
    create_table(handle, ORG_TABLE, &[ORG_SCHEMA, ORG_PARENT_INDEX]).await
}

pub async fn create_user_table(handle: &mut impl StoreHandle) -> DbResult<()> {
    create_table(handle, USER_TABLE, &[USER_SCHEMA]).await
}

/// Create every table, in dependency order. Existing tables are left untouched.
pub async fn create_tables(handle: &mut impl StoreHandle) -> DbResult<()> {
    create_role_table(&mut *handle).await?;
    create_org_table(&mut *handle).await?;
    create_user_table(&mut *handle).await?;
    info!("datastore tables ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    #[tokio::test]
    async fn creates_all_tables_idempotently() {
        let mut pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        create_tables(&mut pool).await.unwrap();
        create_tables(&mut pool).await.unwrap();

        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(names, vec!["org", "roles", "users"]);
    }

    #[tokio::test]
    async fn failure_is_table_create_failed() {
        let mut pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        // the single pooled connection refuses writes
        sqlx::query("PRAGMA query_only = ON").execute(&pool).await.unwrap();
        let err = create_tables(&mut pool).await.unwrap_err();
        assert!(matches!(err, DbError::TableCreateFailed { table: "roles", .. }));
    }
}
