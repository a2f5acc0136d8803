//! # Smug Router
//!
//! Pattern-triggered API routing for the smug chat relay.
//!
//! A [`PatternRouter`] is an ordinary broker: it receives every broadcast
//! event, matches its text against configured [`Pattern`]s and, on a match,
//! calls an external HTTP endpoint whose structured reply comes back into
//! the chat as a new event.
//!
//! ## Example
//!
//! ```rust,ignore
//! use smug_router::{Pattern, PatternRouter};
//! use smug_transport::HttpClient;
//!
//! let router = PatternRouter::new(HttpClient::new(None)?);
//! router.add_pattern(Pattern::simple(r"^weather (?P<city>\w+)", "https://api.example/weather")?);
//!
//! dispatcher.add_broker(Arc::new(router), &[]).await?;
//! ```

pub mod error;
pub mod pattern;
pub mod reply;
pub mod router;

pub use error::{PatternError, PatternResult};
pub use pattern::{NamedGroups, Pattern};
pub use reply::{ApiBlock, ApiReply};
pub use router::{FEEDBACK_CAPACITY, LIST_COMMAND, PatternRouter, ROUTER_NAME};
