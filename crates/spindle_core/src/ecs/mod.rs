//! Entity Component System core types.
//!
//! Storage is delegated to `hecs`; this module adds what the script bridge
//! needs on top of it: stable `(index, version)` identities that can cross
//! into scripts, synchronous component events, and named systems.

mod component;
mod entity;
mod error;
mod events;
mod manager;
mod system;
mod system_registration_error;

pub use component::ComponentHandle;
pub use entity::EntityId;
pub use error::{EcsError, SystemError};
pub use events::{
    ComponentAddedEvent, ComponentRemovedEvent, EntityCreatedEvent, EntityDestroyedEvent,
};
pub use manager::{Entity, EntityManager};
pub use system::{System, SystemHandle, SystemManager};
pub use system_registration_error::SystemRegistrationError;

/// Anything storable as a component.
pub use hecs::Component;
