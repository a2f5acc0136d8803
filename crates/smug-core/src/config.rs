//! Broker configuration records.
//!
//! [`BrokerConfig`] is a superset of what every broker kind needs: the Slack
//! broker reads `token` and `channel`, the pattern router reads `patterns`,
//! other adapters would read `server`, `ssl` and `nick`.
//!
//! ```yaml
//! brokers:
//!   slack:
//!     type: slack
//!     token: xoxb-...
//!     channel: general
//!   patterns:
//!     type: patterns
//!     patterns:
//!       - name: weather
//!         regex: "^weather (?P<city>\\w+)"
//!         url: https://api.example/weather
//!         method: POST
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration of a single broker instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Broker kind, e.g. `slack` or `patterns`.
    #[serde(rename = "type")]
    pub kind: String,
    pub server: String,
    #[serde(rename = "token")]
    pub api_token: String,
    #[serde(rename = "ssl")]
    pub use_ssl: bool,
    pub nick: String,
    pub channel: String,
    /// Timeout for outbound HTTP calls made on behalf of this broker.
    pub timeout_secs: Option<u64>,
    pub patterns: Vec<PatternConfig>,
}

/// A regex-to-endpoint routing rule as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub name: String,
    pub help: String,
    pub regex: String,
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub vars: HashMap<String, String>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            name: "n/a".to_string(),
            help: String::new(),
            regex: String::new(),
            url: String::new(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            vars: HashMap::new(),
        }
    }
}
