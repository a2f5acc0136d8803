//! Configuration error types.

use std::path::PathBuf;

use smug_transport::TransportError;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Fetching a remote configuration failed.
    #[error("Failed to fetch configuration: {0}")]
    Fetch(#[from] TransportError),

    /// YAML parsing or extraction error.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    ValidationError { message: String },

    /// An active broker has no configuration entry.
    #[error("No configuration for active broker: {0}")]
    MissingBroker(String),

    /// Environment override with an unusable value.
    #[error("Invalid value for environment variable {var}: {reason}")]
    InvalidEnv { var: String, reason: String },
}

impl ConfigError {
    /// Creates a validation error with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
