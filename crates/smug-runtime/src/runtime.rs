//! Main runtime orchestration.
//!
//! The runtime turns a [`SmugConfig`] into running brokers:
//!
//! 1. Every active broker entry is built through the [`BrokerRegistry`]
//!    (configuration errors fail here, before anything starts)
//! 2. Each broker is added to the [`Dispatcher`] with its setup args
//! 3. A heartbeat sweep runs every `heartbeat_secs`
//! 4. Ctrl+C, SIGTERM or a fatal broker error stops everything
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use smug_runtime::SmugRuntime;
//!
//! let runtime = SmugRuntime::builder()
//!     .config_location("smug.yaml")
//!     .build()
//!     .await?;
//! runtime.register_kind::<PatternRouter>();
//! runtime.register_kind::<SlackBroker>();
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use smug_core::{ConfigurableBroker, Dispatcher};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, ConfigResult, SmugConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::registry::{BrokerRegistry, BuiltBroker};

/// The smug runtime: configuration, brokers and the dispatcher joining them.
pub struct SmugRuntime {
    /// The configuration.
    config: SmugConfig,
    /// Broker kinds this runtime can build.
    registry: RwLock<BrokerRegistry>,
    /// The dispatcher all brokers are added to.
    dispatcher: Dispatcher,
    /// Whether the brokers have been started.
    running: AtomicBool,
}

impl SmugRuntime {
    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from `smug.yaml` in the current directory or the
    /// user config directory.
    pub async fn load_config() -> ConfigResult<Self> {
        Self::builder().build().await
    }

    /// Creates a new runtime from configuration.
    ///
    /// This initializes logging based on the configuration.
    pub fn from_config(config: SmugConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            active_brokers = ?config.active_brokers,
            "Runtime initialized from configuration"
        );

        Self {
            config,
            registry: RwLock::new(BrokerRegistry::new()),
            dispatcher: Dispatcher::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &SmugConfig {
        &self.config
    }

    /// Returns the dispatcher shared by every broker.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Makes broker kind `B` available to configuration entries.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// runtime.register_kind::<SlackBroker>();
    /// ```
    pub fn register_kind<B: ConfigurableBroker>(&self) {
        self.registry.write().register::<B>();
    }

    /// Returns the registered broker kinds.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.registry.read().kinds()
    }

    /// Returns whether the brokers are running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Builds and starts every active broker.
    ///
    /// All brokers are built before the first one starts, so a bad entry
    /// leaves the dispatcher empty.
    pub async fn start(&self) -> RuntimeResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Runtime is already running");
            return Ok(());
        }

        let result = self.start_brokers().await;
        if result.is_err() {
            self.stop();
        }
        result
    }

    async fn start_brokers(&self) -> RuntimeResult<()> {
        validate_config(&self.config)?;

        let built = {
            let registry = self.registry.read();
            self.config
                .active()
                .map(|(name, config)| registry.build(name, config).map(|b| (name, b)))
                .collect::<RuntimeResult<Vec<_>>>()?
        };

        info!(brokers = built.len(), "Starting brokers");
        for (name, BuiltBroker { broker, args }) in built {
            let broker_name = broker.name().to_string();
            self.dispatcher.add_broker(broker, &args).await?;
            info!(entry = %name, broker = %broker_name, "Broker started");
        }
        Ok(())
    }

    /// Deactivates every broker.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Runtime is not running");
        }
        self.dispatcher.shutdown();
        info!("Runtime stopped");
    }

    /// Runs one heartbeat sweep and returns the unhealthy broker names.
    pub fn heartbeat(&self) -> Vec<String> {
        self.dispatcher.heartbeat()
    }

    /// Runs the runtime until a shutdown signal is received.
    ///
    /// Returns [`RuntimeError::Fatal`] if a broker failed fatally.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Smug runtime is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs the runtime until `shutdown` completes or a broker fails
    /// fatally.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;

        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.heartbeat_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                err = self.dispatcher.fatal() => break Err(RuntimeError::Fatal(err)),
                _ = ticker.tick() => {
                    let unhealthy = self.heartbeat();
                    if !unhealthy.is_empty() {
                        warn!(brokers = ?unhealthy, "Unhealthy brokers");
                    }
                }
            }
        };

        self.stop();
        result
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => {
                        info!("Received Ctrl+C, shutting down");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM, shutting down");
                    }
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `SmugRuntime` with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = SmugRuntime::builder()
///     .config_location("https://config.example/smug.yaml")
///     .build()
///     .await?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets the configuration file path or URL.
    pub fn config_location(mut self, location: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.location(location);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables environment overrides.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Builds the runtime.
    pub async fn build(self) -> ConfigResult<SmugRuntime> {
        let config = self.config_loader.load().await?;
        Ok(SmugRuntime::from_config(config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
