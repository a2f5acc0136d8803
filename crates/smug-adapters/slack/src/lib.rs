//! # Smug Adapter for Slack
//!
//! Relays a Slack channel through the smug dispatcher.
//!
//! ## Overview
//!
//! This adapter handles:
//!
//! - Web API calls (`auth.test`, channel and user lookups, `chat.postMessage`)
//! - A bidirectional id/nick [`UserCache`] filled at setup and on demand
//! - Translation between Slack markup and neutral event text
//! - Block Kit rendering of event content blocks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smug_adapter_slack::SlackBroker;
//! use smug_runtime::SmugRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = SmugRuntime::load_config()?;
//!     runtime.register_kind::<SlackBroker>();
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Reference Translation
//!
//! ```text
//! Slack:    <@U6CRHMXK4> see <https://x.com|the docs> &amp; more
//! Neutral:  bob see the docs & more
//!
//! Neutral:  bob: hi @amy
//! Slack:    <@U6CRHMXK4>: hi <@U7AMY0001>
//! ```
//!
//! Inbound translation may fetch unknown users from the Web API; outbound
//! translation only ever consults the cache.

pub mod api;
pub mod blocks;
pub mod broker;
pub mod cache;
pub mod error;
pub mod model;
pub mod translate;

pub use api::{SLACK_API_URL, SlackApi, SlackWebApi};
pub use blocks::render_blocks;
pub use broker::{OUTBOUND_CAPACITY, SlackBroker};
pub use cache::{Lookup, SlackUser, UserCache, UserDirectory};
pub use error::{SlackError, SlackResult};
pub use model::{AuthIdentity, OutgoingMessage, SlackChannel, SlackIncoming, SlackMessage};
