//! Role flag set operations.
//!
//! The `roles` table records which role flag values are in use; it does not
//! assign roles to users.

use roster_types::{RoleFlags, validation::ValidationError};
use sqlx::Row;
use tracing::{debug, info};

use crate::{DbError, DbResult, StoreHandle};

fn check_role(role: RoleFlags) -> DbResult<i64> {
    if !role.is_valid() {
        return Err(DbError::invalid("role_type", ValidationError::InvalidFlags(role.bits())));
    }
    Ok(role.bits() as i64)
}

/// Record a role value. Returns false when it was already present.
pub async fn create_role_entry(handle: &mut impl StoreHandle, role: RoleFlags) -> DbResult<bool> {
    let bits = check_role(role)?;
    if role_entry_exists(&mut *handle, role).await? {
        debug!(role = bits, "role already present");
        return Ok(false);
    }
    handle
        .exec(sqlx::query("INSERT INTO roles (role_type) VALUES (?)").bind(bits))
        .await?;
    info!(role = bits, "role created");
    Ok(true)
}

pub async fn role_entry_exists(handle: &mut impl StoreHandle, role: RoleFlags) -> DbResult<bool> {
    let bits = check_role(role)?;
    let row = handle
        .get_one(sqlx::query("SELECT role_type FROM roles WHERE role_type = ?").bind(bits))
        .await?;
    Ok(row.is_some())
}

/// Every recorded role value, lowest first.
pub async fn list_role_entries(handle: &mut impl StoreHandle) -> DbResult<Vec<RoleFlags>> {
    let rows = handle
        .get_many(sqlx::query("SELECT role_type FROM roles ORDER BY role_type"))
        .await?;
    rows.iter()
        .map(|row| -> DbResult<RoleFlags> {
            let bits: i64 = row.try_get("role_type")?;
            Ok(RoleFlags::from_bits_retain(bits as u64))
        })
        .collect()
}

pub async fn count_role_entries(handle: &mut impl StoreHandle) -> DbResult<i64> {
    let row = handle.get_one(sqlx::query("SELECT COUNT(*) AS total FROM roles")).await?;
    Ok(match row {
        Some(row) => row.try_get("total")?,
        None => 0,
    })
}

/// Remove a role value. Returns the number of rows removed.
pub async fn delete_role_entry(handle: &mut impl StoreHandle, role: RoleFlags) -> DbResult<u64> {
    let bits = check_role(role)?;
    let removed = handle
        .exec(sqlx::query("DELETE FROM roles WHERE role_type = ?").bind(bits))
        .await?;
    if removed > 0 {
        info!(role = bits, "role deleted");
    }
    Ok(removed)
}
