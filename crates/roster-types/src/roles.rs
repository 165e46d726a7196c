//! Role flags.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Hierarchical role bits; each new role takes a higher bit than every role
    /// before it. `ROOT_ADMIN` is the top role and must stay the highest bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct RoleFlags: u64 {
        const END_USER = 1 << 0;
        const MANAGER = 1 << 1;
        /// Application administrator with access to every dataset.
        const ROOT_ADMIN = 1 << 2;
    }
}

impl RoleFlags {
    pub fn is_valid(&self) -> bool {
        !self.is_empty() && Self::all().contains(*self)
    }

    pub fn is_full_access(&self) -> bool {
        self.contains(Self::ROOT_ADMIN)
    }

    /// The most privileged role present, if any.
    pub fn highest(&self) -> Option<RoleFlags> {
        self.iter().last()
    }
}
