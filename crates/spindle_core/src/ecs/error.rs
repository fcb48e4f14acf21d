use crate::ecs::EntityId;
use crate::event::{BoxError, DeliveryError};
use thiserror::Error;

/// Errors raised by entity and component operations.
#[derive(Debug, Error)]
pub enum EcsError {
    #[error("{0} does not refer to a live entity")]
    NoSuchEntity(EntityId),

    #[error("{entity} has no {component} component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    /// A receiver failed while the operation's event was being delivered.
    /// The storage change itself has already been applied.
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Errors raised while driving registered systems.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("system '{name}' failed to configure: {source}")]
    Configure {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("system '{name}' failed to update: {source}")]
    Update {
        name: String,
        #[source]
        source: BoxError,
    },
}
