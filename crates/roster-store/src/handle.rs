//! Handle dispatch: run statements the same way against the shared pool or an
//! open transaction.
//!
//! Every table operation in this crate takes `&mut impl StoreHandle`. Callers
//! that need several operations to commit or roll back together begin a
//! transaction, pass it through, and decide its fate themselves; everyone
//! else passes the pool.

use async_trait::async_trait;
use sqlx::{
    Sqlite, SqliteConnection, SqlitePool, Transaction, query::Query, sqlite::{SqliteArguments, SqliteRow}
};

use crate::{DbError, DbResult};

/// A bound SQLite statement ready to run on a handle.
pub type SqlQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

#[async_trait]
pub trait StoreHandle: Send {
    /// Execute a statement, returning the number of rows affected.
    async fn exec<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<u64>;

    /// Fetch at most one row. `Ok(None)` means no row matched.
    async fn get_one<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<Option<SqliteRow>>;

    /// Fetch every matching row.
    async fn get_many<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<Vec<SqliteRow>>;
}

fn ensure_open(pool: &SqlitePool) -> DbResult<()> {
    if pool.is_closed() {
        return Err(DbError::InvalidHandle);
    }
    Ok(())
}

#[async_trait]
impl StoreHandle for SqlitePool {
    async fn exec<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<u64> {
        ensure_open(self)?;
        Ok(query.execute(&*self).await?.rows_affected())
    }

    async fn get_one<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<Option<SqliteRow>> {
        ensure_open(self)?;
        Ok(query.fetch_optional(&*self).await?)
    }

    async fn get_many<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<Vec<SqliteRow>> {
        ensure_open(self)?;
        Ok(query.fetch_all(&*self).await?)
    }
}

#[async_trait]
impl<'c> StoreHandle for Transaction<'c, Sqlite> {
    async fn exec<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<u64> {
        Ok(query.execute(&mut **self).await?.rows_affected())
    }

    async fn get_one<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<Option<SqliteRow>> {
        Ok(query.fetch_optional(&mut **self).await?)
    }

    async fn get_many<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<Vec<SqliteRow>> {
        Ok(query.fetch_all(&mut **self).await?)
    }
}

/// Lets a checked-out pool connection (`&mut *conn`) be used as a handle.
#[async_trait]
impl StoreHandle for SqliteConnection {
    async fn exec<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<u64> {
        Ok(query.execute(&mut *self).await?.rows_affected())
    }

    async fn get_one<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<Option<SqliteRow>> {
        Ok(query.fetch_optional(&mut *self).await?)
    }

    async fn get_many<'q>(&mut self, query: SqlQuery<'q>) -> DbResult<Vec<SqliteRow>> {
        Ok(query.fetch_all(&mut *self).await?)
    }
}
