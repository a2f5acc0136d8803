//! Configuration module for the smug runtime.
//!
//! This module provides YAML configuration loading, environment overrides
//! and validation for the relay and its brokers.

pub mod env;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, env_key};
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file, parse_config};
pub use schema::{LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SmugConfig};
pub use validation::validate_config;
