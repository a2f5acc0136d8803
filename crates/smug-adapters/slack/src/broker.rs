//! The Slack broker.
//!
//! Bridges one Slack channel (plus direct messages to the bot) into the
//! dispatcher.
//!
//! ```text
//! wire client ──SlackIncoming──▶ inbound() ──▶ receive loop ──▶ broadcast
//!                                                    │
//! handle_event ──OutgoingMessage──▶ send loop ──▶ chat.postMessage
//! ```
//!
//! Both loops run inside [`Broker::activate`]. The wire client (RTM or
//! Socket Mode) lives outside this crate and only needs the sender returned
//! by [`SlackBroker::inbound`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use smug_core::{
    Broker, BrokerConfig, BrokerError, BrokerLog, BrokerResult, ConfigurableBroker, Counters,
    Dispatcher, Event,
};
use smug_transport::HttpClient;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::api::{SlackApi, SlackWebApi};
use crate::blocks::render_blocks;
use crate::cache::{Lookup, UserDirectory};
use crate::model::{OutgoingMessage, SlackIncoming, SlackMessage};

/// Messages waiting for the send loop before new ones are dropped.
pub const OUTBOUND_CAPACITY: usize = 256;

/// What setup learned about the workspace.
#[derive(Debug, Default)]
struct Session {
    own_user_id: String,
    own_bot_id: String,
    channel_id: Option<String>,
}

/// Broker relaying a Slack channel.
pub struct SlackBroker {
    name: String,
    channel: String,
    timeout: Option<Duration>,
    log: BrokerLog,
    directory: UserDirectory,
    session: RwLock<Session>,
    counters: Counters,
    inbound_tx: mpsc::UnboundedSender<SlackIncoming>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<SlackIncoming>>>,
    outbound_tx: mpsc::Sender<OutgoingMessage>,
    outbound_rx: Mutex<Option<mpsc::Receiver<OutgoingMessage>>>,
}

impl SlackBroker {
    /// Creates a broker for `channel` (without the leading `#`).
    ///
    /// The Web API client is created during setup from the token argument.
    pub fn new(channel: impl Into<String>) -> Self {
        let channel = channel.into();
        let name = format!("slack-{channel}");
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        Self {
            log: BrokerLog::new(name.clone()).with_channel(&channel),
            name,
            channel,
            timeout: None,
            directory: UserDirectory::new(),
            session: RwLock::new(Session::default()),
            counters: Counters::new(),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
        }
    }

    /// Creates a broker that talks to Slack through `api`.
    pub fn with_api(channel: impl Into<String>, api: Arc<dyn SlackApi>) -> Self {
        let broker = Self::new(channel);
        broker.directory.set_api(api);
        broker
    }

    /// Sets the timeout of the Web API client created during setup.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the sender the wire client feeds events into.
    pub fn inbound(&self) -> mpsc::UnboundedSender<SlackIncoming> {
        self.inbound_tx.clone()
    }

    /// Returns the user directory backing reference translation.
    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    /// Returns the configured channel's id once setup found it.
    pub fn channel_id(&self) -> Option<String> {
        self.session.read().channel_id.clone()
    }

    fn is_own_message(&self, message: &SlackMessage) -> bool {
        if message.user.is_empty() {
            return true;
        }
        let session = self.session.read();
        message.user == session.own_user_id
            || (!message.bot_id.is_empty() && message.bot_id == session.own_bot_id)
    }

    /// Builds a neutral event from a Slack message.
    ///
    /// Messages outside the configured channel are addressed back to this
    /// broker and the channel they came from.
    pub async fn parse_to_event(&self, message: &SlackMessage) -> Event {
        let actor = self
            .directory
            .user_nick(&message.user, Lookup::Remote)
            .await
            .unwrap_or_else(|| message.user.clone());
        let raw = message.flatten_text();
        let text = self.directory.to_neutral(&raw, Lookup::Remote).await;

        let mut event = Event::new(actor, text)
            .with_raw_text(raw)
            .with_origin(self.name.clone());
        if let Some(avatar) = self
            .directory
            .user(&message.user)
            .and_then(|user| user.avatar.clone())
        {
            event = event.with_avatar(avatar);
        }
        if self.channel_id().as_deref() != Some(message.channel.as_str()) {
            event = event.with_reply(self.name.clone(), message.channel.clone());
        }
        event
    }

    async fn receive_loop(
        &self,
        mut inbound: mpsc::UnboundedReceiver<SlackIncoming>,
        dispatcher: &Dispatcher,
    ) -> BrokerResult<()> {
        while let Some(incoming) = inbound.recv().await {
            match incoming {
                SlackIncoming::Hello => trace!(parent: self.log.span(), "hello"),
                SlackIncoming::Connected => {
                    info!(parent: self.log.span(), channel = %self.channel, "Joining channel");
                }
                SlackIncoming::Message(message) => {
                    if self.is_own_message(&message) {
                        trace!(parent: self.log.span(), "Skipping own or anonymous message");
                        continue;
                    }
                    let event = self.parse_to_event(&message).await;
                    self.counters.incr_sent();
                    dispatcher.broadcast(event);
                }
                SlackIncoming::PresenceChange { user, presence } => {
                    info!(parent: self.log.span(), user = %user, presence = %presence, "Presence change");
                }
                SlackIncoming::LatencyReport { value_ms } => {
                    info!(parent: self.log.span(), latency_ms = value_ms, "Current latency");
                }
                SlackIncoming::RtmError { error } => {
                    warn!(parent: self.log.span(), code = error.code, error = %error.msg, "Slack error");
                }
                SlackIncoming::InvalidAuth => {
                    error!(parent: self.log.span(), "Invalid credentials");
                    return Err(BrokerError::authentication(
                        &self.name,
                        "invalid credentials",
                    ));
                }
                SlackIncoming::Other => debug!(parent: self.log.span(), "Unexpected event ignored"),
            }
        }
        Ok(())
    }

    async fn send_loop(
        &self,
        mut outbound: mpsc::Receiver<OutgoingMessage>,
        api: Arc<dyn SlackApi>,
    ) -> BrokerResult<()> {
        while let Some(message) = outbound.recv().await {
            if let Err(e) = api.post_message(&message).await {
                if e.is_auth_failure() {
                    error!(parent: self.log.span(), error = %e, "Slack rejected credentials");
                    return Err(BrokerError::authentication(&self.name, e.to_string()));
                }
                warn!(parent: self.log.span(), destination = %message.channel, error = %e, "Failed to post message");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for SlackBroker {
    fn name(&self) -> &str {
        &self.name
    }

    /// Args: `[token, channel]`.
    ///
    /// `channel` must name this broker's channel; any other channel leaves
    /// the broker inert.
    async fn setup(&self, args: &[String]) {
        let [token, channel, ..] = args else {
            warn!(parent: self.log.span(), "Expected [token, channel] setup arguments");
            return;
        };
        if channel.starts_with('#') {
            warn!(parent: self.log.span(), "Slack channels should not begin with #");
        }
        if channel.trim_start_matches('#') != self.channel {
            error!(parent: self.log.span(), requested = %channel, "Setup channel does not match broker channel");
            return;
        }

        let api = match self.directory.api() {
            Some(api) => api,
            None => match HttpClient::new(self.timeout) {
                Ok(client) => {
                    let api: Arc<dyn SlackApi> = Arc::new(SlackWebApi::new(client, token.clone()));
                    self.directory.set_api(Arc::clone(&api));
                    api
                }
                Err(e) => {
                    warn!(parent: self.log.span(), error = %e, "Failed to create Slack client");
                    return;
                }
            },
        };

        match api.auth_test().await {
            Ok(identity) => {
                info!(parent: self.log.span(), user = %identity.user, user_id = %identity.user_id, "Authenticated");
                let mut session = self.session.write();
                session.own_user_id = identity.user_id;
                session.own_bot_id = identity.bot_id;
            }
            Err(e) => warn!(parent: self.log.span(), error = %e, "Failed to fetch own identity"),
        }

        let channel = match api.find_channel(&self.channel).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                warn!(parent: self.log.span(), "Channel not found");
                return;
            }
            Err(e) => {
                warn!(parent: self.log.span(), error = %e, "Failed to list channels");
                return;
            }
        };
        self.session.write().channel_id = Some(channel.id.clone());

        let members = match api.channel_members(&channel.id).await {
            Ok(members) => members,
            Err(e) => {
                warn!(parent: self.log.span(), error = %e, "Failed to list channel members");
                Vec::new()
            }
        };
        let cached = self.directory.populate(&members).await;
        info!(parent: self.log.span(), channel_id = %channel.id, cached, "Slack broker ready");
    }

    async fn activate(&self, dispatcher: Dispatcher) -> BrokerResult<()> {
        let api = self
            .directory
            .api()
            .ok_or_else(|| BrokerError::NotSetUp(self.name.clone()))?;
        let inbound = self.inbound_rx.lock().take();
        let outbound = self.outbound_rx.lock().take();
        let (Some(inbound), Some(outbound)) = (inbound, outbound) else {
            return Err(BrokerError::Internal(format!(
                "{} is already active",
                self.name
            )));
        };

        info!(parent: self.log.span(), "Slack broker active");
        tokio::select! {
            result = self.receive_loop(inbound, &dispatcher) => result,
            result = self.send_loop(outbound, api) => result,
        }
    }

    fn handle_event(&self, event: &Event, _dispatcher: &Dispatcher) {
        if !event.is_addressed_to(&self.name) || event.originated_from(&self.name) {
            return;
        }
        self.counters.incr_received();

        let reply_target = event
            .reply_broker
            .as_deref()
            .filter(|broker| *broker == self.name)
            .and(event.reply_target.clone());
        let Some(destination) = reply_target.or_else(|| self.channel_id()) else {
            debug!(parent: self.log.span(), "No destination channel, event dropped");
            return;
        };

        let text = self.directory.to_network_cached(&event.text);
        let message = OutgoingMessage::new(destination, text, &event.actor)
            .with_blocks(render_blocks(&event.content_blocks));
        if message.is_empty() {
            debug!(parent: self.log.span(), "Nothing to post");
            return;
        }
        match self.outbound_tx.try_send(message) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(message)) => {
                warn!(parent: self.log.span(), destination = %message.channel, capacity = OUTBOUND_CAPACITY, "Send queue full, message dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(parent: self.log.span(), "Send queue closed, message dropped");
            }
        }
    }

    fn heartbeat(&self) -> bool {
        let (rcvd, sent) = self.counters.take();
        self.log.metrics(rcvd, sent);
        true
    }
}

impl ConfigurableBroker for SlackBroker {
    fn kind() -> &'static str {
        "slack"
    }

    fn from_config(config: &BrokerConfig) -> BrokerResult<Self> {
        if config.channel.is_empty() {
            return Err(BrokerError::invalid_config("slack", "channel is required"));
        }
        if config.api_token.is_empty() {
            return Err(BrokerError::invalid_config(
                format!("slack-{}", config.channel),
                "token is required",
            ));
        }
        let broker = Self::new(config.channel.clone());
        Ok(match config.timeout_secs {
            Some(secs) => broker.with_timeout(Duration::from_secs(secs)),
            None => broker,
        })
    }

    fn setup_args(config: &BrokerConfig) -> Vec<String> {
        vec![config.api_token.clone(), config.channel.clone()]
    }
}
