//! FFI layer between Rust and scripts
//!
//! Entity identities cross into scripts as a single number.

use spindle_core::ecs::EntityId;

/// Largest integer a script number holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Opaque handle for script access
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ScriptHandle(pub u64);

impl ScriptHandle {
    /// The handle as a script number.
    ///
    /// Exact while the version stays below 2^21, which is far beyond the
    /// number of times a slot is realistically reused.
    pub fn to_number(self) -> f64 {
        self.0 as f64
    }

    /// Parse a number handed back by a script.
    pub fn from_number(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= MAX_SAFE_INTEGER {
            Some(Self(value as u64))
        } else {
            None
        }
    }
}

impl From<EntityId> for ScriptHandle {
    fn from(entity: EntityId) -> Self {
        ScriptHandle(entity.to_bits())
    }
}

impl From<ScriptHandle> for EntityId {
    fn from(handle: ScriptHandle) -> Self {
        EntityId::from_bits(handle.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_carries_index_and_version() {
        let id = EntityId::new(7, 3);
        let handle = ScriptHandle::from(id);
        assert_eq!(EntityId::from(handle), id);
        assert_eq!(handle.0, (3u64 << 32) | 7);
    }

    #[test]
    fn numbers_from_scripts_must_be_whole() {
        let handle = ScriptHandle::from(EntityId::new(2, 1));
        assert_eq!(ScriptHandle::from_number(handle.to_number()), Some(handle));
        assert_eq!(ScriptHandle::from_number(1.5), None);
        assert_eq!(ScriptHandle::from_number(-1.0), None);
        assert_eq!(ScriptHandle::from_number(f64::NAN), None);
    }
}
