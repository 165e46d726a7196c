#![allow(dead_code)]

use roster_store::{DbLocation, OrgNode, StoreHandle, create_org_entry, create_tables, open_pool};
use roster_types::config::DbConfig;
use sqlx::SqlitePool;

pub async fn memory_pool() -> SqlitePool {
    let mut pool = open_pool(&DbLocation::Memory).await.expect("open in-memory pool");
    create_tables(&mut pool).await.expect("create tables");
    pool
}

pub fn sqlite_config(target: &str) -> DbConfig {
    DbConfig {
        driver: "sqlite3".to_string(),
        dbpath: target.to_string(),
        ..DbConfig::default()
    }
}

/// Create `node` and hand it back with its identifier filled.
pub async fn stored(handle: &mut impl StoreHandle, mut node: OrgNode) -> OrgNode {
    create_org_entry(handle, &mut node).await.expect("create org");
    node
}

/// Make every UPDATE or DELETE touching the named org fail.
pub async fn lock_org(pool: &SqlitePool, name: &str) {
    for (event, row) in [("UPDATE", "NEW"), ("DELETE", "OLD")] {
        let sql = format!(
            "CREATE TRIGGER lock_{event}_{name} BEFORE {event} ON org \
             WHEN {row}.name = '{name}' BEGIN SELECT RAISE(ABORT, '{name} is locked'); END"
        );
        sqlx::query(&sql).execute(pool).await.expect("create trigger");
    }
}
