//! Shared type definitions for the duty roster backend.
//!
//! This crate holds the domain types exchanged between the store and the
//! application: org hierarchy nodes, user accounts, role flags, their flat row
//! shapes, and the configuration records read at startup.

pub mod config;
pub mod org;
pub mod roles;
pub mod state;
pub mod users;
pub mod validation;

pub use org::{ORG_NAME_MAX_LEN, OrgId, OrgNode, OrgStatus};
pub use roles::RoleFlags;
pub use users::{USER_FIELD_MAX_LEN, UserAccount, UserStatus};
