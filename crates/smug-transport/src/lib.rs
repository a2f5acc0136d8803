//! # Smug Transport
//!
//! Outbound HTTP for the smug chat relay.
//!
//! ```text
//! ┌─────────────────────┐
//! │  Broker Layer       │  (pattern router, Slack)
//! ├─────────────────────┤
//! │  smug-transport     │  <- This crate
//! ├─────────────────────┤
//! │  Network (HTTP)     │
//! └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smug_transport::{HttpClient, HttpMethod};
//! use reqwest::header::HeaderMap;
//!
//! let client = HttpClient::new(None)?;
//! let reply = client
//!     .send_json(HttpMethod::Post, "https://api.example/hook", &HeaderMap::new(), &payload)
//!     .await?;
//! if reply.is_success() {
//!     println!("{}", reply.body);
//! }
//! ```

pub mod client;
pub mod error;

pub use client::{DEFAULT_TIMEOUT, HttpClient, HttpMethod, HttpReply, build_headers};
pub use error::{TransportError, TransportResult};
pub use reqwest::header::HeaderMap;
