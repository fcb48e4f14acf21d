//! Native component types made reachable from scripts.
//!
//! A type opts in with [`expose_component!`](crate::expose_component), which
//! names it for scripts and lists the fields positional constructor arguments
//! map onto. [`ComponentRegistry`] erases the generic helpers per type so the
//! script-facing API can address components by name. Field data crosses the
//! boundary as JSON values.

use crate::error::ScriptError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use spindle_core::ecs::{Component, ComponentHandle, EcsError, EntityId, EntityManager};
use std::collections::HashMap;
use std::marker::PhantomData;

pub trait ExposedComponent: Component + Serialize + DeserializeOwned {
    /// Name scripts use for the type.
    const NAME: &'static str;
    /// Fields in positional-argument order.
    const FIELDS: &'static [&'static str];
}

/// Implement [`ExposedComponent`] for a serde-enabled component type.
///
/// ```ignore
/// expose_component!(Position, "Position", [x, y]);
/// ```
#[macro_export]
macro_rules! expose_component {
    ($ty:ty, $name:expr, [$($field:ident),* $(,)?]) => {
        impl $crate::ExposedComponent for $ty {
            const NAME: &'static str = $name;
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];
        }
    };
}

/// Attach `component` to `id`, replacing any previous value of the same type.
pub fn assign_to<C: ExposedComponent>(
    manager: &EntityManager,
    component: C,
    id: EntityId,
) -> Result<ComponentHandle<C>, EcsError> {
    manager.assign(id, component)
}

/// Copy of the component of type `C` on `id`, if any.
pub fn get_component<C: ExposedComponent + Clone>(manager: &EntityManager, id: EntityId) -> Option<C> {
    manager.with_component(id, C::clone)
}

trait ErasedComponent {
    fn fields(&self) -> &'static [&'static str];
    fn has(&self, manager: &EntityManager, id: EntityId) -> bool;
    fn read(&self, manager: &EntityManager, id: EntityId) -> Result<Option<serde_json::Value>, ScriptError>;
    fn assign(&self, manager: &EntityManager, id: EntityId, fields: serde_json::Value) -> Result<(), ScriptError>;
    fn write(&self, manager: &EntityManager, id: EntityId, fields: serde_json::Value) -> Result<(), ScriptError>;
}

struct Binding<C>(PhantomData<fn() -> C>);

impl<C: ExposedComponent> Binding<C> {
    fn decode(fields: serde_json::Value) -> Result<C, ScriptError> {
        serde_json::from_value(fields).map_err(|source| ScriptError::ComponentData {
            component: C::NAME.to_owned(),
            source,
        })
    }
}

impl<C: ExposedComponent> ErasedComponent for Binding<C> {
    fn fields(&self) -> &'static [&'static str] {
        C::FIELDS
    }

    fn has(&self, manager: &EntityManager, id: EntityId) -> bool {
        manager.has_component::<C>(id)
    }

    fn read(&self, manager: &EntityManager, id: EntityId) -> Result<Option<serde_json::Value>, ScriptError> {
        manager
            .with_component(id, |component: &C| serde_json::to_value(component))
            .transpose()
            .map_err(|source| ScriptError::ComponentData {
                component: C::NAME.to_owned(),
                source,
            })
    }

    fn assign(&self, manager: &EntityManager, id: EntityId, fields: serde_json::Value) -> Result<(), ScriptError> {
        let component = Self::decode(fields)?;
        assign_to(manager, component, id)?;
        Ok(())
    }

    fn write(&self, manager: &EntityManager, id: EntityId, fields: serde_json::Value) -> Result<(), ScriptError> {
        let value = Self::decode(fields)?;
        manager
            .with_component_mut(id, |component: &mut C| *component = value)
            .ok_or(ScriptError::Storage(EcsError::MissingComponent {
                entity: id,
                component: C::NAME,
            }))
    }
}

/// Name-keyed access to exposed component types.
#[derive(Default)]
pub struct ComponentRegistry {
    types: HashMap<&'static str, Box<dyn ErasedComponent>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `C` reachable by [`ExposedComponent::NAME`]. Returns false if the
    /// name was already taken.
    pub fn register<C: ExposedComponent>(&mut self) -> bool {
        if self.types.contains_key(C::NAME) {
            return false;
        }
        self.types.insert(C::NAME, Box::new(Binding::<C>(PhantomData)));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    fn lookup(&self, name: &str) -> Result<&dyn ErasedComponent, ScriptError> {
        self.types
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| ScriptError::UnknownComponentType(name.to_owned()))
    }

    pub fn fields(&self, name: &str) -> Result<&'static [&'static str], ScriptError> {
        Ok(self.lookup(name)?.fields())
    }

    pub fn has(&self, name: &str, manager: &EntityManager, id: EntityId) -> Result<bool, ScriptError> {
        Ok(self.lookup(name)?.has(manager, id))
    }

    pub fn read(
        &self,
        name: &str,
        manager: &EntityManager,
        id: EntityId,
    ) -> Result<Option<serde_json::Value>, ScriptError> {
        self.lookup(name)?.read(manager, id)
    }

    pub fn assign(
        &self,
        name: &str,
        manager: &EntityManager,
        id: EntityId,
        fields: serde_json::Value,
    ) -> Result<(), ScriptError> {
        self.lookup(name)?.assign(manager, id, fields)
    }

    pub fn write(
        &self,
        name: &str,
        manager: &EntityManager,
        id: EntityId,
        fields: serde_json::Value,
    ) -> Result<(), ScriptError> {
        self.lookup(name)?.write(manager, id, fields)
    }
}
