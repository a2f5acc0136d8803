//! Per-broker logging handle and heartbeat counters.
//!
//! Each broker constructs its own [`BrokerLog`] instead of reaching for a
//! process-wide logger; the handle carries the broker's tags (name and,
//! once known, channel) on a [`tracing::Span`] so every line a broker emits
//! can be attributed to it.
//!
//! ```rust,ignore
//! let log = BrokerLog::new("slack-general").with_channel("general");
//! warn!(parent: log.span(), "channel not found");
//! log.metrics(12, 3);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{Span, field, info, info_span};

/// Tagged logging handle owned by a single broker.
#[derive(Debug, Clone)]
pub struct BrokerLog {
    broker: String,
    span: Span,
}

impl BrokerLog {
    /// Creates a handle tagged with the broker's name.
    pub fn new(broker: impl Into<String>) -> Self {
        let broker = broker.into();
        let span = info_span!("broker", broker = %broker, channel = field::Empty);
        Self { broker, span }
    }

    /// Adds the channel tag.
    pub fn with_channel(self, channel: &str) -> Self {
        self.span.record("channel", channel);
        self
    }

    /// Returns the broker name this handle is tagged with.
    pub fn broker(&self) -> &str {
        &self.broker
    }

    /// Returns the span to use as `parent:` for log lines or to instrument tasks with.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Emits the heartbeat metrics line.
    pub fn metrics(&self, rcvd: u64, sent: u64) {
        info!(parent: &self.span, broker = %self.broker, rcvd, sent, "heartbeat");
    }
}

/// A pair of monotonically increasing counters that reset on each heartbeat.
///
/// The two values are read and reset independently, so a snapshot taken
/// while events are in flight may be off by one in either direction.
#[derive(Debug, Default)]
pub struct Counters {
    received: AtomicU64,
    sent: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the current `(received, sent)` values without resetting them.
    pub fn snapshot(&self) -> (u64, u64) {
        (
            self.received.load(Ordering::Relaxed),
            self.sent.load(Ordering::Relaxed),
        )
    }

    /// Returns the current `(received, sent)` values and resets both to zero.
    pub fn take(&self) -> (u64, u64) {
        (
            self.received.swap(0, Ordering::Relaxed),
            self.sent.swap(0, Ordering::Relaxed),
        )
    }
}
