//! Event dispatcher for the smug relay.
//!
//! The [`Dispatcher`] owns the set of active brokers and delivers every
//! broadcast event to each of them exactly once.
//!
//! # Delivery model
//!
//! Every registered broker gets its own bounded mailbox, drained by a
//! delivery loop on the blocking pool. `handle_event` is synchronous and may
//! block, so it never runs on an async worker.
//! [`broadcast`](Dispatcher::broadcast) enqueues the event into every
//! mailbox and returns immediately, so:
//!
//! 1. Events reach a given broker in broadcast call order
//! 2. There is no ordering between different brokers
//! 3. A broker that blocks or panics in `handle_event` only stalls or loses
//!    its own mailbox; every other broker keeps receiving
//! 4. Once a stalled broker's mailbox holds [`MAILBOX_CAPACITY`] events,
//!    further events for it are dropped with a warning
//!
//! ```rust,ignore
//! use smug_core::Dispatcher;
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher.add_broker(router, &[]).await?;
//! dispatcher.add_broker(slack, &[token, channel]).await?;
//!
//! dispatcher.broadcast(Event::new("bob", "hello"));
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::broker::BoxedBroker;
use crate::error::{BrokerError, DispatchError, DispatchResult};
use crate::event::Event;

/// Events a broker may have queued before new ones are dropped.
pub const MAILBOX_CAPACITY: usize = 1024;

/// A broker together with the tasks that serve it.
struct Registration {
    broker: BoxedBroker,
    mailbox: mpsc::Sender<Arc<Event>>,
    activation: JoinHandle<()>,
}

struct Inner {
    brokers: RwLock<Vec<Registration>>,
    fatal: CancellationToken,
    fatal_error: Mutex<Option<BrokerError>>,
}

/// The central hub broadcasting events to all registered brokers.
///
/// `Dispatcher` is a cheap handle; clones share the same broker set.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Creates a dispatcher with no brokers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                brokers: RwLock::new(Vec::new()),
                fatal: CancellationToken::new(),
                fatal_error: Mutex::new(None),
            }),
        }
    }

    /// Delivers `event` to every registered broker.
    pub fn broadcast(&self, event: Event) {
        let event = Arc::new(event);
        let brokers = self.inner.brokers.read();
        for registration in brokers.iter() {
            match registration.mailbox.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => warn!(
                    broker = %registration.broker.name(),
                    capacity = MAILBOX_CAPACITY,
                    "Broker mailbox full, event dropped"
                ),
                Err(mpsc::error::TrySendError::Closed(_)) => warn!(
                    broker = %registration.broker.name(),
                    "Broker mailbox closed, event dropped"
                ),
            }
        }
        trace!(
            origin = event.origin.as_deref().unwrap_or("-"),
            recipients = brokers.len(),
            "Event broadcast"
        );
    }

    /// Sets up `broker`, starts its activation loop and registers it.
    ///
    /// Fails if a broker with the same name is already registered; in that
    /// case the new broker is deactivated again.
    pub async fn add_broker(&self, broker: BoxedBroker, args: &[String]) -> DispatchResult<()> {
        let name = broker.name().to_string();
        if self.contains(&name) {
            return Err(DispatchError::BrokerExists(name));
        }

        broker.setup(args).await;
        debug!(broker = %name, "Broker setup complete");

        let activation = tokio::spawn(activate(Arc::clone(&broker), self.clone()));
        let (mailbox, inbox) = mpsc::channel(MAILBOX_CAPACITY);
        let delivery = Arc::clone(&broker);
        let inner = Arc::downgrade(&self.inner);
        tokio::task::spawn_blocking(move || deliver(delivery, inbox, inner));

        let mut brokers = self.inner.brokers.write();
        if brokers.iter().any(|r| r.broker.name() == name) {
            drop(brokers);
            activation.abort();
            broker.deactivate();
            return Err(DispatchError::BrokerExists(name));
        }
        brokers.push(Registration {
            broker,
            mailbox,
            activation,
        });
        info!(broker = %name, total = brokers.len(), "Broker registered");
        Ok(())
    }

    /// Deactivates and unregisters the broker named `name`.
    ///
    /// Events already queued for the broker are still delivered.
    pub fn remove_broker(&self, name: &str) -> DispatchResult<()> {
        let registration = {
            let mut brokers = self.inner.brokers.write();
            let index = brokers
                .iter()
                .position(|r| r.broker.name() == name)
                .ok_or_else(|| DispatchError::BrokerNotFound(name.to_string()))?;
            brokers.remove(index)
        };

        registration.broker.deactivate();
        registration.activation.abort();
        info!(broker = %name, "Broker removed");
        Ok(())
    }

    /// Returns the number of registered brokers.
    pub fn num_brokers(&self) -> usize {
        self.inner.brokers.read().len()
    }

    /// Returns the names of all registered brokers in registration order.
    pub fn broker_names(&self) -> Vec<String> {
        self.inner
            .brokers
            .read()
            .iter()
            .map(|r| r.broker.name().to_string())
            .collect()
    }

    /// Returns whether a broker named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .brokers
            .read()
            .iter()
            .any(|r| r.broker.name() == name)
    }

    /// Runs one heartbeat sweep and returns the names of unhealthy brokers.
    ///
    /// Unhealthy brokers are logged and stay registered.
    pub fn heartbeat(&self) -> Vec<String> {
        let brokers: Vec<BoxedBroker> = self
            .inner
            .brokers
            .read()
            .iter()
            .map(|r| Arc::clone(&r.broker))
            .collect();

        let mut unhealthy = Vec::new();
        for broker in &brokers {
            let healthy = catch_unwind(AssertUnwindSafe(|| broker.heartbeat())).unwrap_or(false);
            if !healthy {
                warn!(broker = %broker.name(), "Broker reported unhealthy");
                unhealthy.push(broker.name().to_string());
            }
        }

        debug!(
            brokers = brokers.len(),
            unhealthy = unhealthy.len(),
            "Heartbeat sweep complete"
        );
        unhealthy
    }

    /// Deactivates and unregisters every broker.
    pub fn shutdown(&self) {
        let registrations = std::mem::take(&mut *self.inner.brokers.write());
        for registration in registrations {
            registration.broker.deactivate();
            registration.activation.abort();
            debug!(broker = %registration.broker.name(), "Broker deactivated");
        }
        info!("Dispatcher shut down");
    }

    /// Waits until a broker fails fatally and returns its error.
    pub async fn fatal(&self) -> BrokerError {
        self.inner.fatal.cancelled().await;
        self.inner
            .fatal_error
            .lock()
            .clone()
            .unwrap_or_else(|| BrokerError::Internal("fatal signal without error".into()))
    }

    /// Returns whether a fatal broker error has been reported.
    pub fn is_fatal(&self) -> bool {
        self.inner.fatal.is_cancelled()
    }

    fn trip_fatal(&self, err: BrokerError) {
        let mut slot = self.inner.fatal_error.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
        self.inner.fatal.cancel();
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("brokers", &self.broker_names())
            .finish()
    }
}

/// Runs a broker's activation loop and reports how it ended.
async fn activate(broker: BoxedBroker, dispatcher: Dispatcher) {
    let name = broker.name().to_string();
    let outcome = AssertUnwindSafe(broker.activate(dispatcher.clone()))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => info!(broker = %name, "Broker activation loop finished"),
        Ok(Err(e)) if e.is_fatal() => {
            error!(broker = %name, error = %e, "Broker failed fatally");
            dispatcher.trip_fatal(e);
        }
        Ok(Err(e)) => error!(broker = %name, error = %e, "Broker activation failed"),
        Err(_) => error!(broker = %name, "Broker activation loop panicked"),
    }
}

/// Feeds a broker's mailbox into its `handle_event`, one event at a time.
///
/// Runs on the blocking pool and ends once every mailbox sender is gone.
fn deliver(broker: BoxedBroker, mut inbox: mpsc::Receiver<Arc<Event>>, dispatcher: Weak<Inner>) {
    while let Some(event) = inbox.blocking_recv() {
        let Some(inner) = dispatcher.upgrade() else {
            break;
        };
        let dispatcher = Dispatcher { inner };
        if catch_unwind(AssertUnwindSafe(|| broker.handle_event(&event, &dispatcher))).is_err() {
            error!(broker = %broker.name(), "Broker panicked while handling event");
        }
    }
    trace!(broker = %broker.name(), "Delivery loop finished");
}
