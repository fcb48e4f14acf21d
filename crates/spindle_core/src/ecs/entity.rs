//! Entity identity with generational index
//!
//! Identities are lightweight (8 bytes) and are the only thing that crosses
//! into scripts. The version counter prevents use-after-free: once a slot is
//! destroyed and reused, stale identities stop validating.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity identity (version-indexed for safety)
///
/// Format: [32-bit version | 32-bit index]
/// - Index: slot in the entity table, reused after destruction
/// - Version: starts at 1, incremented every time the slot is reused
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    version: u32,
}

impl EntityId {
    pub const fn new(index: u32, version: u32) -> Self {
        Self { index, version }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Serialize to 64-bit integer (script handles, save files)
    pub fn to_bits(&self) -> u64 {
        ((self.version as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            version: (bits >> 32) as u32,
        }
    }

    pub(crate) fn to_hecs(self) -> Option<hecs::Entity> {
        hecs::Entity::from_bits(self.to_bits())
    }
}

impl From<hecs::Entity> for EntityId {
    fn from(entity: hecs::Entity) -> Self {
        Self::from_bits(entity.to_bits().get())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Entity::Id {}.{}>", self.index, self.version)
    }
}
