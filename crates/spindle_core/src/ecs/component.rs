// component.rs - Handles to components owned by the entity manager

use crate::ecs::{EcsError, EntityId, EntityManager};
use std::fmt;
use std::marker::PhantomData;

/// Non-owning handle to an entity's `C` component.
///
/// The handle never keeps the component alive; every access re-checks that the
/// entity still exists and still carries a `C`.
pub struct ComponentHandle<C> {
    manager: EntityManager,
    entity: EntityId,
    _marker: PhantomData<fn() -> C>,
}

impl<C: hecs::Component> ComponentHandle<C> {
    pub(crate) fn new(manager: EntityManager, entity: EntityId) -> Self {
        Self {
            manager,
            entity,
            _marker: PhantomData,
        }
    }

    /// Entity the component belongs to.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    /// Is the component still attached?
    pub fn valid(&self) -> bool {
        self.manager.has_component::<C>(self.entity)
    }

    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        self.manager.with_component(self.entity, f)
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        self.manager.with_component_mut(self.entity, f)
    }

    pub fn remove(&self) -> Result<C, EcsError> {
        self.manager.remove::<C>(self.entity)
    }
}

impl<C> Clone for ComponentHandle<C> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            entity: self.entity,
            _marker: PhantomData,
        }
    }
}

impl<C> fmt::Debug for ComponentHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ComponentHandle<{}>({})",
            std::any::type_name::<C>(),
            self.entity
        )
    }
}
