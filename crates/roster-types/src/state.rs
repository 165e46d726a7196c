//! Flat row shapes persisted by the store.
//!
//! These mirror the relational columns one-to-one. The in-memory types in
//! [`crate::org`] and [`crate::users`] are translated to and from them by the
//! store's row mappers, so other crates can exchange rows without depending on
//! the store itself.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// One row of the `org` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct OrgRow {
    /// Canonical hyphenated UUID; empty while the node is unpersisted.
    pub uuid: String,
    pub name: String,
    pub address: Option<String>,
    /// Parent UUID, `None` for a root.
    pub parent: Option<String>,
    pub status: i64,
    pub start_time: Option<DateTime<Utc>>,
    /// Validity in days.
    pub validity: Option<i64>,
}

/// One row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct UserRow {
    pub user_id: String,
    pub email: String,
    pub credential_hash: String,
    pub mobile: String,
    pub dob: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub validity: Option<i64>,
    pub status: i64,
}
