//! The neutral message envelope passed between brokers.
//!
//! An [`Event`] is built by exactly one producer (a network adapter or the
//! pattern router), handed to [`Dispatcher::broadcast`](crate::Dispatcher::broadcast)
//! by value and shared read-only with every broker afterwards.
//!
//! `text` is always network-neutral: adapters translate their own mention
//! and link markup away before broadcasting and translate back only when
//! relaying into their own network.

use std::fmt;
use std::time::SystemTime;

/// How a content block should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentType {
    /// Regular visible content.
    #[default]
    Display,
    /// Metadata that adapters may render differently or skip.
    Meta,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display => write!(f, "Display"),
            Self::Meta => write!(f, "Meta"),
        }
    }
}

/// A unit of richer layout attached to an event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventBlock {
    pub title: String,
    pub text: String,
    pub img_url: String,
    pub kind: ContentType,
}

impl EventBlock {
    /// Creates a display block.
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        img_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            img_url: img_url.into(),
            kind: ContentType::Display,
        }
    }

    /// Returns `true` if the block carries nothing beyond its title.
    pub fn is_title_only(&self) -> bool {
        self.text.is_empty() && self.img_url.is_empty()
    }
}

/// A message flowing through the dispatcher.
///
/// Broker references (`origin`, `reply_broker`) hold broker names, which are
/// stable for the lifetime of a broker.
#[derive(Debug, Clone)]
pub struct Event {
    /// Set on events produced by bots or commands rather than people.
    pub is_cmd_output: bool,
    /// Name of the broker that produced the event.
    pub origin: Option<String>,
    /// If set, only this broker should act on the event.
    pub reply_broker: Option<String>,
    /// Address meaningful only to `reply_broker` (a user, a DM channel...).
    pub reply_target: Option<String>,
    /// Display name of the author.
    pub actor: String,
    pub avatar: Option<String>,
    /// Neutral display text.
    pub text: String,
    /// The untranslated original text.
    pub raw_text: String,
    pub content_blocks: Vec<EventBlock>,
    pub timestamp: SystemTime,
}

impl Event {
    /// Creates an event authored by `actor` with the given neutral text.
    ///
    /// `raw_text` starts out equal to `text`; adapters override it with
    /// [`with_raw_text`](Self::with_raw_text).
    pub fn new(actor: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            is_cmd_output: false,
            origin: None,
            reply_broker: None,
            reply_target: None,
            actor: actor.into(),
            avatar: None,
            raw_text: text.clone(),
            text,
            content_blocks: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Creates command output answering `request`.
    ///
    /// The reply inherits the request's `reply_broker` and `reply_target`
    /// so it routes back to wherever the request came from. `origin` is
    /// left for the producing broker to fill in.
    pub fn reply_to(request: &Event, text: impl Into<String>) -> Self {
        let mut event = Self::new("", text);
        event.is_cmd_output = true;
        event.reply_broker.clone_from(&request.reply_broker);
        event.reply_target.clone_from(&request.reply_target);
        event
    }

    pub fn with_origin(mut self, broker: impl Into<String>) -> Self {
        self.origin = Some(broker.into());
        self
    }

    pub fn with_reply(mut self, broker: impl Into<String>, target: impl Into<String>) -> Self {
        self.reply_broker = Some(broker.into());
        self.reply_target = Some(target.into());
        self
    }

    pub fn with_raw_text(mut self, raw: impl Into<String>) -> Self {
        self.raw_text = raw.into();
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }

    pub fn with_blocks(mut self, blocks: Vec<EventBlock>) -> Self {
        self.content_blocks = blocks;
        self
    }

    /// Returns `true` if the broker named `broker` should act on this event.
    ///
    /// Events without a reply broker are meant for everyone.
    pub fn is_addressed_to(&self, broker: &str) -> bool {
        self.reply_broker.as_deref().is_none_or(|b| b == broker)
    }

    /// Returns `true` if the broker named `broker` produced this event.
    pub fn originated_from(&self, broker: &str) -> bool {
        self.origin.as_deref() == Some(broker)
    }
}
