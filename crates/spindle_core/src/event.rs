//! Typed event delivery
//!
//! Receivers subscribe per event type and are invoked synchronously, in
//! subscription order, from inside `emit`. Delivery is re-entrant: a receiver
//! may emit further events (or subscribe new receivers) while being notified.

use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::rc::Rc;
use thiserror::Error;

/// Error type receivers report back through `emit`.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Something that wants to hear about events of type `E`.
pub trait Receiver<E> {
    fn receive(&self, event: &E) -> Result<(), BoxError>;
}

/// A receiver failed while an event was being delivered.
///
/// Delivery stops at the first failure; receivers subscribed after the failing
/// one are not notified.
#[derive(Debug, Error)]
#[error("receiver failed while handling {event}: {source}")]
pub struct DeliveryError {
    pub event: &'static str,
    #[source]
    pub source: BoxError,
}

type Handler = Rc<dyn Fn(&dyn Any) -> Result<(), BoxError>>;

/// Cheaply cloneable handle to a shared subscriber table.
#[derive(Clone, Default)]
pub struct EventManager {
    handlers: Rc<RefCell<HashMap<TypeId, Vec<Handler>>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `receiver` to events of type `E`.
    pub fn subscribe<E, R>(&self, receiver: Rc<R>)
    where
        E: 'static,
        R: Receiver<E> + 'static,
    {
        self.push_handler::<E>(Rc::new(move |event: &dyn Any| {
            match event.downcast_ref::<E>() {
                Some(event) => receiver.receive(event),
                None => Ok(()),
            }
        }));
    }

    /// Subscribe a closure to events of type `E`.
    pub fn subscribe_fn<E, F>(&self, f: F)
    where
        E: 'static,
        F: Fn(&E) -> Result<(), BoxError> + 'static,
    {
        self.push_handler::<E>(Rc::new(move |event: &dyn Any| {
            match event.downcast_ref::<E>() {
                Some(event) => f(event),
                None => Ok(()),
            }
        }));
    }

    /// Deliver `event` to every receiver subscribed to `E`.
    pub fn emit<E: 'static>(&self, event: &E) -> Result<(), DeliveryError> {
        // Snapshot so receivers can subscribe or emit while we iterate.
        let handlers = match self.handlers.borrow().get(&TypeId::of::<E>()) {
            Some(handlers) => handlers.clone(),
            None => return Ok(()),
        };

        for handler in handlers {
            handler(event).map_err(|source| DeliveryError {
                event: type_name::<E>(),
                source,
            })?;
        }
        Ok(())
    }

    /// Number of receivers currently subscribed to `E`.
    pub fn receiver_count<E: 'static>(&self) -> usize {
        self.handlers
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    fn push_handler<E: 'static>(&self, handler: Handler) {
        self.handlers
            .borrow_mut()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(handler);
    }
}
