//! User account operations.

use chrono::Utc;
use roster_types::{
    USER_FIELD_MAX_LEN, UserAccount, UserStatus, state::UserRow, validation::{ValidationError, check_text}
};
use sqlx::{FromRow, Row};
use tracing::{debug, info};

use crate::{DbError, DbResult, StoreHandle};

const ENTITY: &str = "user";

const SELECT_BY_ID: &str = "SELECT user_id, email, credential_hash, mobile, dob, start_time, validity, status \
     FROM users WHERE user_id = ?";
const SELECT_BY_ID_AND_CREDENTIAL: &str = "SELECT user_id, email, credential_hash, mobile, dob, start_time, validity, status \
     FROM users WHERE user_id = ? AND credential_hash = ?";
const SELECT_BY_EMAIL_AND_CREDENTIAL: &str = "SELECT user_id, email, credential_hash, mobile, dob, start_time, validity, status \
     FROM users WHERE email = ? AND credential_hash = ?";

fn check_field(field: &'static str, value: &str) -> DbResult<()> {
    check_text(value, USER_FIELD_MAX_LEN, true).map_err(|err| DbError::invalid(field, err))
}

fn validity_column(user: &UserAccount) -> DbResult<Option<i64>> {
    user.validity
        .map(|days| i64::try_from(days).map_err(|_| DbError::invalid("validity", "value out of range")))
        .transpose()
}

/// Mandatory fields and status of an account about to be written.
fn validate_user(user: &UserAccount) -> DbResult<()> {
    check_field("user_id", &user.user_id)?;
    check_field("email", &user.email)?;
    check_field("credential_hash", &user.credential_hash)?;
    check_field("mobile", &user.mobile)?;
    if !user.status.is_valid() {
        return Err(DbError::invalid("status", ValidationError::InvalidFlags(user.status.bits())));
    }
    validity_column(user)?;
    Ok(())
}

fn user_from_row(row: UserRow) -> UserAccount {
    UserAccount {
        user_id: row.user_id,
        email: row.email,
        credential_hash: row.credential_hash,
        mobile: row.mobile,
        date_of_birth: row.dob,
        start_time: Some(row.start_time),
        validity: row.validity.and_then(|days| u64::try_from(days).ok()),
        status: UserStatus::from_bits_retain(row.status as u64),
    }
}

async fn fetch_one(handle: &mut impl StoreHandle, query: crate::SqlQuery<'_>) -> DbResult<Option<UserAccount>> {
    let row = handle.get_one(query).await?;
    Ok(row.map(|r| UserRow::from_row(&r)).transpose()?.map(user_from_row))
}

/// Insert a new account, stamping its creation time.
///
/// Returns false without writing when the user id is already taken.
pub async fn create_user_entry(handle: &mut impl StoreHandle, user: &mut UserAccount) -> DbResult<bool> {
    validate_user(user)?;
    if fetch_user_by_id(&mut *handle, &user.user_id).await?.is_some() {
        debug!(user_id = %user.user_id, "user already present");
        return Ok(false);
    }

    let start_time = Utc::now();
    handle
        .exec(
            sqlx::query(
                "INSERT INTO users (user_id, email, credential_hash, mobile, dob, start_time, validity, status) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(user.user_id.clone())
            .bind(user.email.clone())
            .bind(user.credential_hash.clone())
            .bind(user.mobile.clone())
            .bind(user.date_of_birth)
            .bind(start_time)
            .bind(validity_column(user)?)
            .bind(user.status.bits() as i64),
        )
        .await?;
    user.start_time = Some(start_time);
    info!(user_id = %user.user_id, "user created");
    Ok(true)
}

pub async fn fetch_user_by_id(handle: &mut impl StoreHandle, user_id: &str) -> DbResult<Option<UserAccount>> {
    if user_id.is_empty() {
        return Err(DbError::not_found(ENTITY, user_id));
    }
    fetch_one(handle, sqlx::query(SELECT_BY_ID).bind(user_id.to_string())).await
}

/// Fetch an account only if both the id and the credential hash match.
pub async fn fetch_user_by_id_and_credential(
    handle: &mut impl StoreHandle,
    user_id: &str,
    credential_hash: &str,
) -> DbResult<Option<UserAccount>> {
    if user_id.is_empty() || credential_hash.is_empty() {
        return Err(DbError::not_found(ENTITY, user_id));
    }
    fetch_one(
        handle,
        sqlx::query(SELECT_BY_ID_AND_CREDENTIAL)
            .bind(user_id.to_string())
            .bind(credential_hash.to_string()),
    )
    .await
}

/// Fetch an account by email and credential hash. Email is not a key, so two
/// matching accounts are reported as [`DbError::RecordNotUnique`].
pub async fn fetch_user_by_email_and_credential(
    handle: &mut impl StoreHandle,
    email: &str,
    credential_hash: &str,
) -> DbResult<Option<UserAccount>> {
    if email.is_empty() || credential_hash.is_empty() {
        return Err(DbError::not_found(ENTITY, email));
    }
    let mut rows = handle
        .get_many(
            sqlx::query(SELECT_BY_EMAIL_AND_CREDENTIAL)
                .bind(email.to_string())
                .bind(credential_hash.to_string()),
        )
        .await?;
    if rows.len() > 1 {
        return Err(DbError::RecordNotUnique {
            entity: ENTITY,
            key: email.to_string(),
        });
    }
    Ok(rows.pop().map(|r| UserRow::from_row(&r)).transpose()?.map(user_from_row))
}

/// Overwrite the mutable fields of an account: email, credential hash,
/// mobile, status and validity. Every one of them is written, so callers pass
/// the full set.
pub async fn update_user_entry(handle: &mut impl StoreHandle, user: &UserAccount) -> DbResult<u64> {
    validate_user(user)?;
    let updated = handle
        .exec(
            sqlx::query(
                "UPDATE users SET email = ?, credential_hash = ?, mobile = ?, status = ?, validity = ? \
                 WHERE user_id = ?",
            )
            .bind(user.email.clone())
            .bind(user.credential_hash.clone())
            .bind(user.mobile.clone())
            .bind(user.status.bits() as i64)
            .bind(validity_column(user)?)
            .bind(user.user_id.clone()),
        )
        .await?;
    if updated == 0 {
        return Err(DbError::not_found(ENTITY, user.user_id.clone()));
    }
    info!(user_id = %user.user_id, "user updated");
    Ok(updated)
}

/// Remove an account. Returns the number of rows removed.
pub async fn delete_user_entry(handle: &mut impl StoreHandle, user_id: &str) -> DbResult<u64> {
    if user_id.is_empty() {
        return Err(DbError::not_found(ENTITY, user_id));
    }
    let removed = handle
        .exec(sqlx::query("DELETE FROM users WHERE user_id = ?").bind(user_id.to_string()))
        .await?;
    if removed > 0 {
        info!(user_id, "user deleted");
    }
    Ok(removed)
}

pub async fn count_user_entries(handle: &mut impl StoreHandle) -> DbResult<i64> {
    let row = handle.get_one(sqlx::query("SELECT COUNT(*) AS total FROM users")).await?;
    Ok(match row {
        Some(row) => row.try_get("total")?,
        None => 0,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::test_support::memory_pool;

    fn alice() -> UserAccount {
        UserAccount::new(
            "alice",
            "alice@example.org",
            "hash-1",
            "+15550100",
            NaiveDate::from_ymd_opt(1990, 4, 12).unwrap(),
        )
    }

    #[tokio::test]
    async fn create_is_idempotent_and_stamps_time() {
        let mut pool = memory_pool().await;
        let mut user = alice();
        assert!(create_user_entry(&mut pool, &mut user).await.unwrap());
        let stamped = user.start_time.unwrap();

        let mut again = alice();
        again.email = "other@example.org".to_string();
        assert!(!create_user_entry(&mut pool, &mut again).await.unwrap());
        assert!(again.start_time.is_none());

        let stored = fetch_user_by_id(&mut pool, "alice").await.unwrap().unwrap();
        assert_eq!(stored.email, "alice@example.org");
        assert_eq!(stored.start_time, Some(stamped));
        assert_eq!(stored.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 12).unwrap());
        assert_eq!(stored.status, UserStatus::REQUESTED);
        assert_eq!(count_user_entries(&mut pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn mandatory_fields_are_checked() {
        let mut pool = memory_pool().await;

        let mut no_mobile = alice();
        no_mobile.mobile.clear();
        let err = create_user_entry(&mut pool, &mut no_mobile).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidParam { field: "mobile", .. }));

        let mut long_email = alice();
        long_email.email = "e".repeat(USER_FIELD_MAX_LEN + 1);
        let err = create_user_entry(&mut pool, &mut long_email).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidParam { field: "email", .. }));

        let mut no_status = alice();
        no_status.status = UserStatus::empty();
        let err = create_user_entry(&mut pool, &mut no_status).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidParam { field: "status", .. }));

        assert_eq!(count_user_entries(&mut pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn credential_lookups() {
        let mut pool = memory_pool().await;
        create_user_entry(&mut pool, &mut alice()).await.unwrap();

        assert!(fetch_user_by_id_and_credential(&mut pool, "alice", "hash-1").await.unwrap().is_some());
        assert!(fetch_user_by_id_and_credential(&mut pool, "alice", "wrong").await.unwrap().is_none());
        assert!(
            fetch_user_by_email_and_credential(&mut pool, "alice@example.org", "hash-1")
                .await
                .unwrap()
                .is_some()
        );

        let err = fetch_user_by_id_and_credential(&mut pool, "alice", "").await.unwrap_err();
        assert!(err.is_not_found());
        let err = fetch_user_by_id(&mut pool, "").await.unwrap_err();
        assert!(err.is_not_found());

        let mut twin = alice();
        twin.user_id = "alice2".to_string();
        create_user_entry(&mut pool, &mut twin).await.unwrap();
        let err = fetch_user_by_email_and_credential(&mut pool, "alice@example.org", "hash-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::RecordNotUnique { entity: "user", .. }));
    }

    #[tokio::test]
    async fn update_touches_only_the_named_user() {
        let mut pool = memory_pool().await;
        create_user_entry(&mut pool, &mut alice()).await.unwrap();
        let mut bob = alice();
        bob.user_id = "bob".to_string();
        bob.email = "bob@example.org".to_string();
        create_user_entry(&mut pool, &mut bob).await.unwrap();

        let mut changed = alice();
        changed.credential_hash = "hash-2".to_string();
        changed.status = UserStatus::APPROVED;
        changed.validity = Some(365);
        assert_eq!(update_user_entry(&mut pool, &changed).await.unwrap(), 1);

        let stored = fetch_user_by_id(&mut pool, "alice").await.unwrap().unwrap();
        assert_eq!(stored.credential_hash, "hash-2");
        assert_eq!(stored.status, UserStatus::APPROVED);
        assert_eq!(stored.validity, Some(365));

        let untouched = fetch_user_by_id(&mut pool, "bob").await.unwrap().unwrap();
        assert_eq!(untouched.credential_hash, "hash-1");
        assert_eq!(untouched.status, UserStatus::REQUESTED);

        let mut ghost = alice();
        ghost.user_id = "ghost".to_string();
        let err = update_user_entry(&mut pool, &ghost).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_by_id() {
        let mut pool = memory_pool().await;
        create_user_entry(&mut pool, &mut alice()).await.unwrap();
        assert_eq!(delete_user_entry(&mut pool, "alice").await.unwrap(), 1);
        assert_eq!(delete_user_entry(&mut pool, "alice").await.unwrap(), 0);
        assert!(fetch_user_by_id(&mut pool, "alice").await.unwrap().is_none());
    }
}
