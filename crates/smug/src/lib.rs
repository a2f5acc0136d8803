//! # Smug
//!
//! A cross-network chat relay with pattern-triggered API routing.
//!
//! ## Overview
//!
//! Smug joins chat networks through brokers. Every message one broker sees
//! becomes a neutral [`Event`](core::Event) that the dispatcher hands to
//! every other broker; the pattern router is just another broker that turns
//! matching messages into HTTP calls and their replies back into events.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────┐     ┌─────────────────────────────┐
//! │ Slack #dev   │────▶│ Dispatcher │────▶│ Pattern Router              │──▶ HTTP APIs
//! │ Slack #ops   │◀────│            │◀────│ (feedback queue, 1 drainer) │
//! └──────────────┘     └────────────┘     └─────────────────────────────┘
//! ```
//!
//! - **Runtime**: Loads configuration, builds brokers, runs the heartbeat
//! - **Dispatcher**: Fans every event out to every broker, one mailbox each
//! - **Brokers**: Network adapters (Slack) and the pattern router
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smug::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SmugRuntime::builder()
//!         .config_location("smug.yaml")
//!         .build()
//!         .await?;
//!     smug::register_builtin_kinds(&runtime);
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `slack`: Enable the Slack broker (default)

pub use smug_core as core;
pub use smug_router as router;
pub use smug_runtime as runtime;
pub use smug_transport as transport;

#[cfg(feature = "slack")]
pub use smug_adapter_slack as slack;

use smug_runtime::SmugRuntime;

/// Registers every broker kind built into this crate.
///
/// That is `patterns`, plus `slack` with the `slack` feature.
pub fn register_builtin_kinds(runtime: &SmugRuntime) {
    runtime.register_kind::<smug_router::PatternRouter>();
    #[cfg(feature = "slack")]
    runtime.register_kind::<smug_adapter_slack::SlackBroker>();
}

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use smug::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use smug_runtime::{RuntimeError, SmugConfig, SmugRuntime};

    // Broker contract - for custom brokers
    pub use smug_core::{
        BoxedBroker, Broker, BrokerConfig, BrokerError, BrokerLog, BrokerResult,
        ConfigurableBroker, Counters, Dispatcher, Event, EventBlock,
    };

    // Built-in brokers
    pub use smug_router::{Pattern, PatternRouter};

    #[cfg(feature = "slack")]
    pub use smug_adapter_slack::SlackBroker;
}

#[cfg(test)]
mod tests {
    use super::*;
    use smug_runtime::SmugConfig;

    #[test]
    fn builtin_kinds_are_registered() {
        let runtime = SmugRuntime::from_config(SmugConfig::default());
        register_builtin_kinds(&runtime);

        let kinds = runtime.kinds();
        assert!(kinds.contains(&"patterns"));
        #[cfg(feature = "slack")]
        assert!(kinds.contains(&"slack"));
    }
}
