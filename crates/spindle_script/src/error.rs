use crate::object::ObjectId;
use spindle_core::ecs::EcsError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the script bridge.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("cannot import script module '{module}': {reason}")]
    UnresolvedModule { module: String, reason: String },

    #[error("script module '{module}' has no class '{class}'")]
    UnresolvedClass { module: String, class: String },

    #[error("script class '{module}.{class}' has no '{factory}' factory")]
    MissingFactory {
        module: String,
        class: String,
        factory: &'static str,
    },

    #[error("script object has no callable '{method}'")]
    MissingMethod { method: String },

    #[error("script error while {during}: {message}")]
    Invocation { during: String, message: String },

    #[error("the script interpreter is already running a call on this thread")]
    InterpreterBusy,

    #[error("the script interpreter is owned by another thread")]
    ForeignThread,

    #[error("{0} is no longer held by the interpreter")]
    StaleObject(ObjectId),

    #[error("time delta must be finite and non-negative, got {0}")]
    InvalidTimeDelta(f64),

    #[error("unknown component type '{0}'")]
    UnknownComponentType(String),

    #[error("'{component}' data does not match the native component: {source}")]
    ComponentData {
        component: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] EcsError),

    #[error("invalid script configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("script runtime error: {0}")]
    Runtime(String),
}

/// Coarse classification used by hosts deciding how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A module, class, factory or method could not be found by name.
    Resolution,
    /// Script code raised while being called.
    ForeignInvocation,
    /// The bridge was used out of order or with bad input.
    Usage,
    /// Configuration, I/O or interpreter setup failed.
    Environment,
}

impl ScriptError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnresolvedModule { .. }
            | Self::UnresolvedClass { .. }
            | Self::MissingFactory { .. }
            | Self::MissingMethod { .. }
            | Self::UnknownComponentType(_) => ErrorKind::Resolution,
            Self::Invocation { .. } => ErrorKind::ForeignInvocation,
            Self::InterpreterBusy
            | Self::ForeignThread
            | Self::StaleObject(_)
            | Self::InvalidTimeDelta(_)
            | Self::ComponentData { .. }
            | Self::Storage(_) => ErrorKind::Usage,
            Self::Config(_) | Self::Io { .. } | Self::Runtime(_) => ErrorKind::Environment,
        }
    }

    /// Recover the bridge error carried by a failed component attach.
    ///
    /// Materialization runs inside event delivery, so its failures reach the
    /// caller of `assign` wrapped in `EcsError::Delivery`.
    pub fn from_storage(error: &EcsError) -> Option<&ScriptError> {
        match error {
            EcsError::Delivery(delivery) => delivery.source.downcast_ref::<ScriptError>(),
            _ => None,
        }
    }
}

impl From<rquickjs::Error> for ScriptError {
    fn from(error: rquickjs::Error) -> Self {
        Self::Runtime(error.to_string())
    }
}
