// system.rs - Per-tick systems and their registration

use crate::ecs::{EntityManager, SystemError, SystemRegistrationError};
use crate::event::{BoxError, EventManager};
use crate::time::TimeDelta;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Native logic run once per tick against the entity manager.
pub trait System {
    /// Subscribe to events; called once before the first update.
    fn configure(&mut self, _events: &EventManager) -> Result<(), BoxError> {
        Ok(())
    }

    fn update(
        &mut self,
        entities: &EntityManager,
        events: &EventManager,
        dt: TimeDelta,
    ) -> Result<(), BoxError>;
}

/// Handle assigned to each registered system (its position in update order).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

/// Owns systems and drives them in registration order.
pub struct SystemManager {
    entities: EntityManager,
    events: EventManager,
    systems: Vec<RegisteredSystem>,
    name_lookup: HashMap<String, SystemHandle>,
    configured: bool,
}

struct RegisteredSystem {
    name: String,
    system: Box<dyn System>,
}

impl SystemManager {
    pub fn new(entities: EntityManager, events: EventManager) -> Self {
        Self {
            entities,
            events,
            systems: Vec::new(),
            name_lookup: HashMap::new(),
            configured: false,
        }
    }

    pub fn add<S: System + 'static>(
        &mut self,
        name: impl Into<String>,
        system: S,
    ) -> Result<SystemHandle, SystemRegistrationError> {
        let name = name.into();
        if self.configured {
            return Err(SystemRegistrationError::AfterConfigure { name });
        }
        if self.name_lookup.contains_key(&name) {
            return Err(SystemRegistrationError::DuplicateName { name });
        }

        let handle = SystemHandle(self.systems.len() as u32);
        debug!(system = %name, %handle, "system registered");
        self.name_lookup.insert(name.clone(), handle);
        self.systems.push(RegisteredSystem {
            name,
            system: Box::new(system),
        });
        Ok(handle)
    }

    pub fn handle(&self, name: &str) -> Option<SystemHandle> {
        self.name_lookup.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Configure every system once. Later calls are no-ops.
    pub fn configure(&mut self) -> Result<(), SystemError> {
        if self.configured {
            return Ok(());
        }
        for registered in &mut self.systems {
            registered
                .system
                .configure(&self.events)
                .map_err(|source| SystemError::Configure {
                    name: registered.name.clone(),
                    source,
                })?;
        }
        self.configured = true;
        info!(systems = self.systems.len(), "systems configured");
        Ok(())
    }

    /// Update a single system.
    pub fn update(&mut self, handle: SystemHandle, dt: TimeDelta) -> Result<(), SystemError> {
        let Some(registered) = self.systems.get_mut(handle.index() as usize) else {
            return Ok(());
        };
        registered
            .system
            .update(&self.entities, &self.events, dt)
            .map_err(|source| SystemError::Update {
                name: registered.name.clone(),
                source,
            })
    }

    /// Update every system in registration order; the first failure aborts the tick.
    pub fn update_all(&mut self, dt: TimeDelta) -> Result<(), SystemError> {
        for index in 0..self.systems.len() {
            self.update(SystemHandle(index as u32), dt)?;
        }
        Ok(())
    }
}
