// events.rs - Notifications published by the entity manager

use crate::ecs::{ComponentHandle, Entity};

/// A new entity exists.
#[derive(Debug, Clone)]
pub struct EntityCreatedEvent {
    pub entity: Entity,
}

/// An entity is about to be destroyed; it is still valid while receivers run.
#[derive(Debug, Clone)]
pub struct EntityDestroyedEvent {
    pub entity: Entity,
}

/// A `C` component was attached to `entity`.
#[derive(Debug)]
pub struct ComponentAddedEvent<C> {
    pub entity: Entity,
    pub component: ComponentHandle<C>,
}

/// A `C` component is about to be detached; it is still readable while receivers run.
#[derive(Debug)]
pub struct ComponentRemovedEvent<C> {
    pub entity: Entity,
    pub component: ComponentHandle<C>,
}

impl<C> Clone for ComponentAddedEvent<C> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity.clone(),
            component: self.component.clone(),
        }
    }
}
