//! User account domain types.

use bitflags::bitflags;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length (in characters) of any user text column.
pub const USER_FIELD_MAX_LEN: usize = 1000;

bitflags! {
    /// Lifecycle flags of a user account. `DELETED` must remain the last flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct UserStatus: u64 {
        const REQUESTED = 1 << 0;
        const APPROVED = 1 << 1;
        const DELETED = 1 << 2;
    }
}

impl UserStatus {
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && Self::all().contains(*self)
    }
}

/// A user account as persisted in the `users` table.
///
/// `user_id` is chosen by the caller (a username), not minted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: String,
    pub email: String,
    /// Credential hash; the store never sees a plaintext password.
    pub credential_hash: String,
    pub mobile: String,
    pub date_of_birth: NaiveDate,
    /// Stamped by the store on creation.
    pub start_time: Option<DateTime<Utc>>,
    /// Lifetime in days. `None` or `Some(0)` means unlimited.
    pub validity: Option<u64>,
    pub status: UserStatus,
}

impl UserAccount {
    pub fn new(
        user_id: impl Into<String>,
        email: impl Into<String>,
        credential_hash: impl Into<String>,
        mobile: impl Into<String>,
        date_of_birth: NaiveDate,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            credential_hash: credential_hash.into(),
            mobile: mobile.into(),
            date_of_birth,
            start_time: None,
            validity: None,
            status: UserStatus::REQUESTED,
        }
    }
}
