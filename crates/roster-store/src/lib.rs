//! Persistence for the duty roster backend.
//!
//! Every table operation is a free async function over a [`StoreHandle`], so
//! the same call runs against the shared pool or inside a caller's
//! transaction.
//!
//! ## Module Structure
//!
//! - `handle`: Statement dispatch over pools, transactions and connections
//! - `org`: Org hierarchy engine and its row mapper
//! - `roles`: Role flag set operations
//! - `users`: User account operations
//! - `schema`: Table creation
//! - `db`: Database location resolution and pool setup
//! - `datastore`: The startup-facing datastore trait and its SQLite backend
//! - `error`: Error types and results

mod datastore;
mod db;
mod handle;
mod org;
mod roles;
mod schema;
mod users;

mod error;

pub use datastore::*;
pub use db::*;
pub use error::{DbError, DbResult};
pub use handle::{SqlQuery, StoreHandle};
pub use org::*;
pub use roles::*;
// Re-export types from roster-types
pub use roster_types::{
    OrgId, OrgNode, OrgStatus, RoleFlags, UserAccount, UserStatus, state::{OrgRow, UserRow}
};
pub use schema::*;
pub use users::*;

#[cfg(test)]
mod test_support;
