//! The broker lifecycle contract.
//!
//! Every network adapter and the pattern router implement [`Broker`]; the
//! [`Dispatcher`] only ever sees `Arc<dyn Broker>`.
//!
//! # Lifecycle
//!
//! ```text
//! setup(args) ──▶ activate(dispatcher) ──▶ deactivate()
//!                        │
//!                        └──▶ Err(Authentication) ──▶ process exit
//! ```
//!
//! - `setup` configures internal state. Recoverable problems (an unknown
//!   channel, a failed identity lookup) are logged and leave the broker
//!   alive but inert; setup itself never fails.
//! - `activate` runs the broker's loop and normally never returns while the
//!   broker is live.
//! - `handle_event` is called for every broadcast event and must return
//!   promptly: any network I/O it triggers goes to a separate task.
//! - `heartbeat` logs metrics, resets counters and returns `false` if the
//!   broker considers itself unhealthy.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::BrokerConfig;
use crate::dispatcher::Dispatcher;
use crate::error::BrokerResult;
use crate::event::Event;

/// The core broker trait.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Returns the broker's stable name.
    ///
    /// Used for log tagging and for matching [`Event::reply_broker`].
    fn name(&self) -> &str;

    /// Configures the broker from positional, broker-defined arguments.
    ///
    /// For example the Slack broker takes `[token, channel]`.
    async fn setup(&self, args: &[String]);

    /// Runs the broker's main loop.
    ///
    /// Returns only when the broker can no longer operate. An error for which
    /// [`BrokerError::is_fatal`](crate::BrokerError::is_fatal) holds trips the
    /// dispatcher's fatal signal.
    async fn activate(&self, dispatcher: Dispatcher) -> BrokerResult<()>;

    /// Releases resources before the broker is unregistered.
    fn deactivate(&self) {}

    /// Reacts to a broadcast event. Must not block.
    fn handle_event(&self, event: &Event, dispatcher: &Dispatcher);

    /// Logs metrics, resets counters and reports liveness.
    fn heartbeat(&self) -> bool;
}

/// A shared broker trait object.
pub type BoxedBroker = Arc<dyn Broker>;

/// Trait for brokers that can be built from a [`BrokerConfig`] entry.
///
/// Separates construction concerns from the object-safe [`Broker`] trait.
pub trait ConfigurableBroker: Broker {
    /// The `type` value selecting this broker in configuration.
    fn kind() -> &'static str
    where
        Self: Sized;

    /// Builds the broker. Configuration errors fail here, before the
    /// broker is ever registered.
    fn from_config(config: &BrokerConfig) -> BrokerResult<Self>
    where
        Self: Sized;

    /// Positional arguments handed to [`Broker::setup`].
    fn setup_args(_config: &BrokerConfig) -> Vec<String>
    where
        Self: Sized,
    {
        Vec::new()
    }
}
