//! In-memory databases for unit tests.

use sqlx::SqlitePool;

use crate::{DbLocation, create_tables, open_pool};

/// A fresh in-memory database with every table created.
pub(crate) async fn memory_pool() -> SqlitePool {
    let mut pool = open_pool(&DbLocation::Memory).await.expect("open in-memory pool");
    create_tables(&mut pool).await.expect("create tables");
    pool
}
