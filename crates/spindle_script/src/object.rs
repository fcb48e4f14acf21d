//! Native-side handles to objects living in the interpreter.
//!
//! Component storage requires `Send + Sync` values, so script objects never
//! sit in a component directly. The interpreter keeps each object alive in a
//! slot of its object table and components hold an [`ScriptObject`] capability
//! naming that slot. Dropping the capability frees the slot; the interpreter's
//! garbage collector reclaims the object once nothing else references it.

use crate::interpreter::Interpreter;
use std::fmt;

/// Key of a slot in the interpreter's object table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script object #{}", self.0)
    }
}

/// Owning capability for one interpreter object.
///
/// Not `Clone`: exactly one component owns the slot.
#[derive(Debug, PartialEq, Eq)]
pub struct ScriptObject {
    id: ObjectId,
}

impl ScriptObject {
    pub(crate) fn new(id: ObjectId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }
}

impl Drop for ScriptObject {
    fn drop(&mut self) {
        // Off the interpreter's thread there is nothing to release into; the
        // slot stays until the process exits.
        if let Some(interpreter) = Interpreter::current() {
            interpreter.release(self.id);
        }
    }
}
