//! Organization hierarchy domain types.

use std::{fmt, str::FromStr};

use bitflags::bitflags;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length (in characters) of an org name or address.
pub const ORG_NAME_MAX_LEN: usize = 500;

bitflags! {
    /// Lifecycle flags of an org node.
    ///
    /// Flags must stay contiguous from the lowest to the highest bit. `DELETED` is
    /// the last flag; add new flags above it and move it up.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct OrgStatus: u64 {
        const REQUESTED = 1 << 0;
        const APPROVED = 1 << 1;
        const DELETED = 1 << 2;
    }
}

impl OrgStatus {
    /// A status is valid when it is non-empty and carries no bits above the last flag.
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && Self::all().contains(*self)
    }
}

/// Server-minted identifier of an org node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgId(Uuid);

impl OrgId {
    /// Mint a fresh, time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrgId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for OrgId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One entry in the organizational hierarchy (company, division, unit...).
///
/// A node carries its ancestor chain by value: `parent` is a copy of the parent
/// node, which may be a placeholder holding only an identifier, or only the
/// `(name, address, parent)` triple when the identifier is not known yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgNode {
    /// Assigned on first successful persistence; `None` until then.
    pub id: Option<OrgId>,
    pub name: String,
    pub address: Option<String>,
    pub parent: Option<Box<OrgNode>>,
    pub status: OrgStatus,
    /// Set exactly once, when the node is first persisted.
    pub start_time: Option<DateTime<Utc>>,
    /// Lifetime in days. `None` or `Some(0)` means unlimited.
    pub validity: Option<u64>,
}

impl OrgNode {
    /// A fresh root node in the `REQUESTED` state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            address: None,
            parent: None,
            status: OrgStatus::REQUESTED,
            start_time: None,
            validity: None,
        }
    }

    /// A placeholder that only knows its identifier.
    pub fn with_id(id: OrgId) -> Self {
        Self {
            id: Some(id),
            ..Self::new(String::new())
        }
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn parent(mut self, parent: OrgNode) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn status(mut self, status: OrgStatus) -> Self {
        self.status = status;
        self
    }

    pub fn validity(mut self, days: u64) -> Self {
        self.validity = Some(days);
        self
    }

    pub fn parent_id(&self) -> Option<OrgId> {
        self.parent.as_ref().and_then(|p| p.id)
    }

    /// Validity with the "unlimited" spellings folded together.
    pub fn effective_validity(&self) -> Option<u64> {
        self.validity.filter(|days| *days != 0)
    }

    /// Number of ancestors carried in memory.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent.as_deref(), |p| p.parent.as_deref()).count()
    }

    /// Names from the root down to this node.
    pub fn lineage(&self) -> Vec<&str> {
        let mut names: Vec<&str> = std::iter::successors(Some(self), |n| n.parent.as_deref())
            .map(|n| n.name.as_str())
            .collect();
        names.reverse();
        names
    }

    /// True once `validity` days have passed since `start_time`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match (self.start_time, self.effective_validity()) {
            (Some(start), Some(days)) => {
                let days = i64::try_from(days).unwrap_or(i64::MAX);
                match Duration::try_days(days).and_then(|d| start.checked_add_signed(d)) {
                    Some(end) => now >= end,
                    None => false,
                }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_envelope() {
        assert!(OrgStatus::REQUESTED.is_valid());
        assert!((OrgStatus::REQUESTED | OrgStatus::APPROVED).is_valid());
        assert!(OrgStatus::all().is_valid());
        assert!(!OrgStatus::empty().is_valid());
        assert!(!OrgStatus::from_bits_retain(1 << 3).is_valid());
        assert!(!OrgStatus::from_bits_retain(0b1001).is_valid());
    }

    #[test]
    fn org_id_string_form_round_trips() {
        let id = OrgId::new();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(text.parse::<OrgId>().unwrap(), id);
        assert!("not-a-uuid".parse::<OrgId>().is_err());
    }

    #[test]
    fn lineage_and_depth() {
        let leaf = OrgNode::new("Team").parent(OrgNode::new("Branch").parent(OrgNode::new("HQ")));
        assert_eq!(leaf.depth(), 2);
        assert_eq!(leaf.lineage(), vec!["HQ", "Branch", "Team"]);
        assert_eq!(OrgNode::new("HQ").depth(), 0);
    }

    #[test]
    fn expiry_uses_validity_days() {
        let start = Utc::now() - Duration::days(10);
        let mut node = OrgNode::new("HQ").validity(5);
        node.start_time = Some(start);
        assert!(node.is_expired_at(Utc::now()));

        node.validity = Some(30);
        assert!(!node.is_expired_at(Utc::now()));

        node.validity = Some(0);
        assert!(!node.is_expired_at(Utc::now()));

        node.validity = None;
        assert!(!node.is_expired_at(Utc::now()));
    }
}
