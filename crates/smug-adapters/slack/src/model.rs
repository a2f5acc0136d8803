//! Slack data types.
//!
//! [`SlackIncoming`] is what the wire client hands the broker: Slack's own
//! real-time event objects plus the client-side `latency_report` and
//! `invalid_auth` notifications.
//!
//! ```json
//! {"type":"message","channel":"C6MR9CBGR","user":"U6CRHMXK4","text":"test","ts":"1568468854.004200"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Real-time events
// =============================================================================

/// An event delivered by the Slack wire client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackIncoming {
    Hello,
    /// The wire client finished connecting.
    Connected,
    Message(SlackMessage),
    PresenceChange {
        #[serde(default)]
        user: String,
        #[serde(default)]
        presence: String,
    },
    LatencyReport {
        value_ms: u64,
    },
    #[serde(rename = "error")]
    RtmError {
        error: RtmErrorBody,
    },
    /// Slack rejected the connection's credentials.
    InvalidAuth,
    #[serde(other)]
    Other,
}

impl SlackIncoming {
    /// Parses a single JSON frame.
    pub fn parse(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RtmErrorBody {
    pub code: i64,
    pub msg: String,
}

/// A channel or direct message.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlackMessage {
    pub channel: String,
    pub user: String,
    pub bot_id: String,
    pub subtype: String,
    pub text: String,
    pub files: Vec<SlackFile>,
    pub attachments: Vec<SlackAttachment>,
    pub ts: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlackFile {
    pub name: String,
    pub url_private: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlackAttachment {
    pub fallback: String,
    pub title: String,
    pub image_url: String,
}

impl SlackMessage {
    /// Flattens text, files and attachments into one line of Slack markup.
    ///
    /// Files render as `name(url)`; attachments contribute their fallback
    /// and, when they carry an image, `title image_url`.
    pub fn flatten_text(&self) -> String {
        let mut parts = vec![self.text.clone()];
        for file in &self.files {
            parts.push(format!("{}({})", file.name, file.url_private));
        }
        for attachment in &self.attachments {
            if !attachment.fallback.is_empty() {
                parts.push(attachment.fallback.clone());
            }
            if !attachment.image_url.is_empty() {
                parts.push(format!("{} {}", attachment.title, attachment.image_url));
            }
        }
        parts.join(" ").trim().to_string()
    }
}

// =============================================================================
// Web API records
// =============================================================================

/// The bot's own identity as reported by `auth.test`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthIdentity {
    pub user_id: String,
    pub bot_id: String,
    pub user: String,
    pub team: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlackChannel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub deleted: bool,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub image_72: String,
}

/// A `chat.postMessage` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OutgoingMessage {
    pub channel: String,
    pub text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon_emoji: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Value>,
}

impl OutgoingMessage {
    /// Creates a message posted under `actor`'s name and avatar emoji.
    ///
    /// An empty actor posts under the bot's own identity.
    pub fn new(channel: impl Into<String>, text: impl Into<String>, actor: &str) -> Self {
        let icon_emoji = if actor.is_empty() {
            String::new()
        } else {
            format!(":avatar_{actor}:")
        };
        Self {
            channel: channel.into(),
            text: text.into(),
            username: actor.to_string(),
            icon_emoji,
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Value>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Returns `true` if there is nothing to post.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.blocks.is_empty()
    }
}
