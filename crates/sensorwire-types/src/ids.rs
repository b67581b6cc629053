//! Numeric entity identifier.
//!
//! Every entity stored by the service is keyed by a signed 64-bit primary
//! key. The same identifier type is shared across all entity types; the
//! [`EntityType`](crate::EntityType) travels alongside it wherever the two
//! need to be distinguished.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Primary key of a stored entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Wrap a raw primary key value.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Return the raw primary key value.
    pub const fn into_inner(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<EntityId> for i64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl FromStr for EntityId {
    type Err = core::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}
