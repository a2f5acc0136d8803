//! The pattern routing broker.
//!
//! [`PatternRouter`] watches every broadcast event. The first configured
//! pattern whose regex matches the event text wins; its endpoint is called
//! on a separate task and a successful structured reply is queued as
//! feedback, which the router's activation loop re-broadcasts.
//!
//! ```text
//! handle_event ──match──▶ spawn(submit) ──HTTP──▶ endpoint
//!                                │
//!                                ▼ 2xx + reply
//!                     feedback queue (100) ──▶ activate ──▶ broadcast
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use smug_core::{
    Broker, BrokerConfig, BrokerError, BrokerLog, BrokerResult, ConfigurableBroker, Counters,
    Dispatcher, Event,
};
use smug_transport::HttpClient;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, trace, warn};

use crate::pattern::{NamedGroups, Pattern};
use crate::reply::ApiReply;

/// The router's broker name.
pub const ROUTER_NAME: &str = "pattern-router";

/// Capacity of the feedback queue.
pub const FEEDBACK_CAPACITY: usize = 100;

/// Prefix of the built-in command listing all pattern help lines.
pub const LIST_COMMAND: &str = "..list";

/// Broker turning pattern matches into external API calls.
pub struct PatternRouter {
    log: BrokerLog,
    patterns: RwLock<Vec<Arc<Pattern>>>,
    client: HttpClient,
    feedback_tx: mpsc::Sender<Event>,
    feedback_rx: Mutex<Option<mpsc::Receiver<Event>>>,
    counters: Counters,
}

impl PatternRouter {
    /// Creates a router without patterns.
    pub fn new(client: HttpClient) -> Self {
        let (feedback_tx, feedback_rx) = mpsc::channel(FEEDBACK_CAPACITY);
        Self {
            log: BrokerLog::new(ROUTER_NAME),
            patterns: RwLock::new(Vec::new()),
            client,
            feedback_tx,
            feedback_rx: Mutex::new(Some(feedback_rx)),
            counters: Counters::new(),
        }
    }

    /// Appends a pattern. Patterns are tried in insertion order.
    pub fn add_pattern(&self, pattern: Pattern) {
        debug!(parent: self.log.span(), pattern = %pattern.name(), "Pattern added");
        self.patterns.write().push(Arc::new(pattern));
    }

    /// Returns the number of configured patterns.
    pub fn num_patterns(&self) -> usize {
        self.patterns.read().len()
    }

    /// Joins every non-empty pattern help line with newlines.
    pub fn help_text(&self) -> String {
        self.patterns
            .read()
            .iter()
            .map(|p| p.help_text())
            .filter(|h| !h.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the current `(received, actioned)` counters.
    pub fn stats(&self) -> (u64, u64) {
        self.counters.snapshot()
    }

    fn first_match(&self, text: &str) -> Option<(Arc<Pattern>, NamedGroups)> {
        self.patterns.read().iter().find_map(|pattern| {
            pattern
                .extract_matches(text)
                .map(|(_, named)| (Arc::clone(pattern), named))
        })
    }

    /// Queues `event` as feedback, waiting while the queue is full.
    ///
    /// Called from `handle_event`, which the dispatcher runs on the router's
    /// own delivery thread, so waiting only holds back the router's mailbox.
    fn enqueue(&self, event: Event) {
        let event = match self.feedback_tx.try_send(event) {
            Ok(()) => return,
            Err(mpsc::error::TrySendError::Full(event)) => event,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(parent: self.log.span(), "Feedback queue closed, reply dropped");
                return;
            }
        };
        debug!(parent: self.log.span(), capacity = FEEDBACK_CAPACITY, "Feedback queue full, waiting");
        if self.feedback_tx.blocking_send(event).is_err() {
            warn!(parent: self.log.span(), "Feedback queue closed, reply dropped");
        }
    }
}

#[async_trait]
impl Broker for PatternRouter {
    fn name(&self) -> &str {
        ROUTER_NAME
    }

    async fn setup(&self, _args: &[String]) {
        info!(
            parent: self.log.span(),
            patterns = self.num_patterns(),
            timeout_ms = self.client.timeout().as_millis() as u64,
            "Pattern router ready"
        );
    }

    async fn activate(&self, dispatcher: Dispatcher) -> BrokerResult<()> {
        let mut feedback = self
            .feedback_rx
            .lock()
            .take()
            .ok_or_else(|| BrokerError::Internal(format!("{ROUTER_NAME} is already active")))?;

        while let Some(mut event) = feedback.recv().await {
            event.origin = Some(ROUTER_NAME.to_string());
            dispatcher.broadcast(event);
        }
        Ok(())
    }

    fn handle_event(&self, event: &Event, _dispatcher: &Dispatcher) {
        if event.originated_from(ROUTER_NAME) {
            return;
        }
        self.counters.incr_received();

        if event.text.starts_with(LIST_COMMAND) {
            self.counters.incr_sent();
            self.enqueue(Event::reply_to(event, self.help_text()));
            return;
        }

        let Some((pattern, named)) = self.first_match(&event.text) else {
            trace!(parent: self.log.span(), "No pattern matched");
            return;
        };
        self.counters.incr_sent();
        debug!(parent: self.log.span(), pattern = %pattern.name(), actor = %event.actor, "Pattern matched");

        let payload = pattern.payload(&event.actor, &event.text, &named);
        let submission = submit(
            pattern,
            self.client.clone(),
            Event::reply_to(event, ""),
            payload,
            self.feedback_tx.clone(),
        );
        tokio::spawn(submission.instrument(self.log.span().clone()));
    }

    fn heartbeat(&self) -> bool {
        let (rcvd, sent) = self.counters.take();
        self.log.metrics(rcvd, sent);
        true
    }
}

impl ConfigurableBroker for PatternRouter {
    fn kind() -> &'static str {
        "patterns"
    }

    fn from_config(config: &BrokerConfig) -> BrokerResult<Self> {
        let client = HttpClient::new(config.timeout_secs.map(Duration::from_secs))
            .map_err(|e| BrokerError::invalid_config(ROUTER_NAME, e.to_string()))?;
        let router = Self::new(client);
        for pattern in &config.patterns {
            let pattern = Pattern::new(pattern)
                .map_err(|e| BrokerError::invalid_config(ROUTER_NAME, e.to_string()))?;
            router.add_pattern(pattern);
        }
        Ok(router)
    }
}

/// Calls the pattern's endpoint and queues any structured reply.
///
/// `template` carries the routing of the originating event.
async fn submit(
    pattern: Arc<Pattern>,
    client: HttpClient,
    template: Event,
    payload: std::collections::BTreeMap<String, String>,
    feedback: mpsc::Sender<Event>,
) {
    let body = Value::Object(
        payload
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    );

    let reply = match client
        .send_json(pattern.method(), pattern.url(), pattern.headers(), &body)
        .await
    {
        Ok(reply) => reply,
        Err(e) => {
            warn!(pattern = %pattern.name(), url = %pattern.url(), error = %e, "Pattern request failed");
            return;
        }
    };

    if !reply.is_success() {
        warn!(
            pattern = %pattern.name(),
            url = %pattern.url(),
            status = reply.status,
            body = %reply.body,
            "Pattern endpoint returned an error status"
        );
        return;
    }

    let parsed = match ApiReply::parse(&reply.body) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            trace!(pattern = %pattern.name(), "Empty reply, no feedback");
            return;
        }
        Err(e) => {
            warn!(pattern = %pattern.name(), error = %e, body = %reply.body, "Malformed reply dropped");
            return;
        }
    };

    if feedback.send(parsed.into_event(&template)).await.is_err() {
        warn!(pattern = %pattern.name(), "Feedback queue closed, reply dropped");
    }
}
