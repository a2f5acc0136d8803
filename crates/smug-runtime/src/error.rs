//! Runtime error types.

use smug_core::{BrokerError, DispatchError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No broker kind is registered under the configured `type`.
    #[error("Unknown broker type '{kind}' for broker '{broker}'")]
    UnknownKind { broker: String, kind: String },

    /// A broker could not be built from its configuration.
    #[error("Failed to build broker '{broker}': {source}")]
    Build {
        broker: String,
        #[source]
        source: BrokerError,
    },

    /// Dispatcher error.
    #[error("Dispatcher error: {0}")]
    Dispatch(#[from] DispatchError),

    /// A broker failed in a way that must end the process.
    #[error("Fatal broker error: {0}")]
    Fatal(BrokerError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
