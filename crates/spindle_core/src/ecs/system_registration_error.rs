use thiserror::Error;

/// Errors that can occur while registering a system with the manager.
#[derive(Debug, Error)]
pub enum SystemRegistrationError {
    #[error("system '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("system '{name}' was added after systems were configured")]
    AfterConfigure { name: String },
}
