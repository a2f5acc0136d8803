//! Smug Runtime - Orchestration layer for the smug chat relay.
//!
//! This crate provides:
//! - YAML configuration loading from a file or URL, with `SMUG_*`
//!   environment overrides
//! - Logging configuration
//! - A registry of broker kinds buildable from configuration
//! - The run loop (`SmugRuntime`): start brokers, heartbeat, shut down
//!
//! ```ignore
//! use smug_runtime::SmugRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SmugRuntime::load_config().await?;
//!
//!     // Register the broker kinds configuration may refer to
//!     runtime.register_kind::<PatternRouter>();
//!     runtime.register_kind::<SlackBroker>();
//!
//!     // Run until Ctrl+C, SIGTERM or a fatal broker error
//!     runtime.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runtime;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, LoggingConfig, SmugConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use registry::{BrokerRegistry, BuiltBroker};
pub use runtime::{RuntimeBuilder, SmugRuntime};

// Re-export tracing for use by other crates
pub use tracing;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `instrument` attribute
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, trace, warn};
}
