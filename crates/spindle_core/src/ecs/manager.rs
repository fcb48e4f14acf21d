// manager.rs - Entity storage with event notification
//
// A thin layer over `hecs::World`. Every structural change is published on
// the event bus after the storage borrow is released, so receivers are free
// to call back into the manager (attach more components, spawn entities...).

use crate::ecs::{
    ComponentAddedEvent, ComponentHandle, ComponentRemovedEvent, EcsError, EntityCreatedEvent,
    EntityDestroyedEvent, EntityId,
};
use crate::event::EventManager;
use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Shared handle to the entity storage.
///
/// Cloning is cheap; all clones see the same entities. Component access goes
/// through closures (`with_component`, `with_component_mut`) so that no
/// storage borrow outlives the call.
#[derive(Clone)]
pub struct EntityManager {
    world: Rc<RefCell<hecs::World>>,
    events: EventManager,
}

impl EntityManager {
    pub fn new(events: EventManager) -> Self {
        Self {
            world: Rc::new(RefCell::new(hecs::World::new())),
            events,
        }
    }

    /// Whether `other` is a handle to the same storage.
    pub fn ptr_eq(&self, other: &EntityManager) -> bool {
        Rc::ptr_eq(&self.world, &other.world)
    }

    /// Event bus this manager publishes to.
    pub fn events(&self) -> &EventManager {
        &self.events
    }

    /// Create a new entity with no components.
    pub fn create(&self) -> Result<Entity, EcsError> {
        let raw = self.world.borrow_mut().spawn(());
        let entity = self.entity(EntityId::from(raw));
        trace!(entity = %entity.id(), "entity created");

        self.events.emit(&EntityCreatedEvent {
            entity: entity.clone(),
        })?;
        Ok(entity)
    }

    /// Destroy an entity and drop all of its components.
    ///
    /// `EntityDestroyedEvent` is delivered while the entity is still alive.
    pub fn destroy(&self, id: EntityId) -> Result<(), EcsError> {
        let raw = self.live(id)?;
        self.events.emit(&EntityDestroyedEvent {
            entity: self.entity(id),
        })?;

        // Component destructors run under the storage borrow and must not
        // call back into the manager.
        let despawned = self.world.borrow_mut().despawn(raw);
        if despawned.is_ok() {
            debug!(entity = %id, "entity destroyed");
        }
        // Err: a receiver destroyed it already.
        Ok(())
    }

    /// Is `id` a live entity?
    pub fn valid(&self, id: EntityId) -> bool {
        id.to_hecs()
            .map_or(false, |raw| self.world.borrow().contains(raw))
    }

    /// Wrap an identity in an `Entity` handle bound to this manager.
    pub fn entity(&self, id: EntityId) -> Entity {
        Entity {
            manager: self.clone(),
            id,
        }
    }

    /// Number of live entities.
    pub fn size(&self) -> usize {
        self.world.borrow().len() as usize
    }

    /// Attach `component` to an entity, replacing any previous value of the
    /// same type, then publish `ComponentAddedEvent<C>`.
    pub fn assign<C: hecs::Component>(
        &self,
        id: EntityId,
        component: C,
    ) -> Result<ComponentHandle<C>, EcsError> {
        let raw = self.live(id)?;
        let previous = {
            let mut world = self.world.borrow_mut();
            let previous = world.remove_one::<C>(raw).ok();
            world
                .insert_one(raw, component)
                .map_err(|_| EcsError::NoSuchEntity(id))?;
            previous
        };
        drop(previous);
        trace!(entity = %id, component = type_name::<C>(), "component assigned");

        let handle = ComponentHandle::new(self.clone(), id);
        self.events.emit(&ComponentAddedEvent {
            entity: self.entity(id),
            component: handle.clone(),
        })?;
        Ok(handle)
    }

    /// Detach and return an entity's `C` component.
    ///
    /// `ComponentRemovedEvent<C>` is delivered while the component is still attached.
    pub fn remove<C: hecs::Component>(&self, id: EntityId) -> Result<C, EcsError> {
        let raw = self.live(id)?;
        if !self.has_component::<C>(id) {
            return Err(EcsError::MissingComponent {
                entity: id,
                component: type_name::<C>(),
            });
        }

        self.events.emit(&ComponentRemovedEvent {
            entity: self.entity(id),
            component: ComponentHandle::<C>::new(self.clone(), id),
        })?;

        let removed = self.world.borrow_mut().remove_one::<C>(raw);
        removed.map_err(|_| EcsError::MissingComponent {
            entity: id,
            component: type_name::<C>(),
        })
    }

    /// Does the entity currently carry a `C`?
    pub fn has_component<C: hecs::Component>(&self, id: EntityId) -> bool {
        let Some(raw) = id.to_hecs() else {
            return false;
        };
        let world = self.world.borrow();
        let has = world.entity(raw).map_or(false, |entity| entity.has::<C>());
        has
    }

    /// Run `f` against an entity's `C`, if it has one.
    ///
    /// `f` must not create or destroy entities, or attach/detach components.
    pub fn with_component<C, R>(&self, id: EntityId, f: impl FnOnce(&C) -> R) -> Option<R>
    where
        C: hecs::Component,
    {
        let raw = id.to_hecs()?;
        let world = self.world.borrow();
        let component = world.get::<&C>(raw).ok()?;
        let result = f(&component);
        Some(result)
    }

    /// Run `f` against a mutable view of an entity's `C`, if it has one.
    ///
    /// Same restrictions as [`with_component`](Self::with_component).
    pub fn with_component_mut<C, R>(&self, id: EntityId, f: impl FnOnce(&mut C) -> R) -> Option<R>
    where
        C: hecs::Component,
    {
        let raw = id.to_hecs()?;
        let world = self.world.borrow();
        let mut component = world.get::<&mut C>(raw).ok()?;
        let result = f(&mut component);
        Some(result)
    }

    /// Snapshot of every entity carrying a `C`, in storage order.
    pub fn entities_with<C: hecs::Component>(&self) -> Vec<EntityId> {
        let world = self.world.borrow();
        let mut query = world.query::<&C>();
        let ids = query.iter().map(|(raw, _)| EntityId::from(raw)).collect();
        ids
    }

    fn live(&self, id: EntityId) -> Result<hecs::Entity, EcsError> {
        match id.to_hecs() {
            Some(raw) if self.world.borrow().contains(raw) => Ok(raw),
            _ => Err(EcsError::NoSuchEntity(id)),
        }
    }
}

impl fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityManager")
            .field("size", &self.size())
            .finish()
    }
}

/// An entity identity bound to the manager that owns it.
#[derive(Clone)]
pub struct Entity {
    manager: EntityManager,
    id: EntityId,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn manager(&self) -> &EntityManager {
        &self.manager
    }

    pub fn valid(&self) -> bool {
        self.manager.valid(self.id)
    }

    pub fn destroy(&self) -> Result<(), EcsError> {
        self.manager.destroy(self.id)
    }

    pub fn assign<C: hecs::Component>(&self, component: C) -> Result<ComponentHandle<C>, EcsError> {
        self.manager.assign(self.id, component)
    }

    pub fn remove<C: hecs::Component>(&self) -> Result<C, EcsError> {
        self.manager.remove(self.id)
    }

    /// Handle to the entity's `C`, or `None` if it has none.
    pub fn component<C: hecs::Component>(&self) -> Option<ComponentHandle<C>> {
        self.manager
            .has_component::<C>(self.id)
            .then(|| ComponentHandle::new(self.manager.clone(), self.id))
    }

    pub fn has_component<C: hecs::Component>(&self) -> bool {
        self.manager.has_component::<C>(self.id)
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.manager.world, &other.manager.world)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.id)
    }
}
