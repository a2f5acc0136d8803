//! # Smug Core
//!
//! The core of the smug chat relay.
//!
//! This crate provides the neutral [`Event`] envelope, the [`Broker`]
//! lifecycle contract every adapter implements, and the [`Dispatcher`] that
//! fans events out to all registered brokers.
//!
//! ## Hub-and-Spoke Architecture
//!
//! Every event flows through the central [`Dispatcher`]:
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌────────────────┐
//! │    Slack    │────▶│ Dispatcher │────▶│ Pattern Router │
//! │  (#general) │◀────│   (Core)   │────▶│ Slack (#dev)   │
//! └─────────────┘     └────────────┘     └────────────────┘
//! ```
//!
//! A broker producing an event calls [`Dispatcher::broadcast`]; every
//! broker, the producer included, receives it in [`Broker::handle_event`]
//! and decides on its own whether to act.
//!
//! ## Example
//!
//! ```rust,ignore
//! use smug_core::{Broker, Dispatcher, Event};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Dispatcher::new();
//!     dispatcher.add_broker(Arc::new(MyBroker::default()), &[]).await.unwrap();
//!
//!     dispatcher.broadcast(Event::new("bob", "Hello, smug!"));
//! }
//! ```

pub mod broker;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod telemetry;

pub use broker::{BoxedBroker, Broker, ConfigurableBroker};
pub use config::{BrokerConfig, PatternConfig};
pub use dispatcher::{Dispatcher, MAILBOX_CAPACITY};
pub use error::{BrokerError, BrokerResult, DispatchError, DispatchResult};
pub use event::{ContentType, Event, EventBlock};
pub use telemetry::{BrokerLog, Counters};
