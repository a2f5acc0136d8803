//! Broker kind registry.
//!
//! Maps the `type` of a broker configuration entry to a factory building
//! that broker:
//!
//! ```text
//! brokers.slack    { type: slack }     ──▶ SlackBroker::from_config
//! brokers.patterns { type: patterns }  ──▶ PatternRouter::from_config
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use smug_core::{BoxedBroker, BrokerConfig, BrokerResult, ConfigurableBroker};
use tracing::debug;

use crate::error::{RuntimeError, RuntimeResult};

/// A broker ready to be added to the dispatcher, with its setup args.
pub struct BuiltBroker {
    pub broker: BoxedBroker,
    pub args: Vec<String>,
}

type BrokerFactory = Box<dyn Fn(&BrokerConfig) -> BrokerResult<BuiltBroker> + Send + Sync>;

/// Registry of the broker kinds the runtime can build.
#[derive(Default)]
pub struct BrokerRegistry {
    factories: BTreeMap<&'static str, BrokerFactory>,
}

impl BrokerRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers broker kind `B` under [`ConfigurableBroker::kind`].
    ///
    /// Registering the same kind again replaces the earlier factory.
    pub fn register<B: ConfigurableBroker>(&mut self) {
        let factory: BrokerFactory = Box::new(|config: &BrokerConfig| {
            let broker = B::from_config(config)?;
            Ok(BuiltBroker {
                broker: Arc::new(broker),
                args: B::setup_args(config),
            })
        });
        self.factories.insert(B::kind(), factory);
        debug!(kind = B::kind(), "Registered broker kind");
    }

    /// Returns `true` if `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Returns all registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Builds the broker configured under `name`.
    pub fn build(&self, name: &str, config: &BrokerConfig) -> RuntimeResult<BuiltBroker> {
        let factory =
            self.factories
                .get(config.kind.as_str())
                .ok_or_else(|| RuntimeError::UnknownKind {
                    broker: name.to_string(),
                    kind: config.kind.clone(),
                })?;
        factory(config).map_err(|source| RuntimeError::Build {
            broker: name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use smug_core::{Broker, BrokerError, Dispatcher, Event};

    /// Minimal broker built from configuration.
    pub(crate) struct EchoBroker {
        name: String,
    }

    #[async_trait]
    impl Broker for EchoBroker {
        fn name(&self) -> &str {
            &self.name
        }

        async fn setup(&self, _args: &[String]) {}

        async fn activate(&self, _dispatcher: Dispatcher) -> BrokerResult<()> {
            Ok(())
        }

        fn handle_event(&self, _event: &Event, _dispatcher: &Dispatcher) {}

        fn heartbeat(&self) -> bool {
            true
        }
    }

    impl ConfigurableBroker for EchoBroker {
        fn kind() -> &'static str {
            "echo"
        }

        fn from_config(config: &BrokerConfig) -> BrokerResult<Self> {
            if config.nick.is_empty() {
                return Err(BrokerError::invalid_config("echo", "nick is required"));
            }
            Ok(Self {
                name: format!("echo-{}", config.nick),
            })
        }

        fn setup_args(config: &BrokerConfig) -> Vec<String> {
            vec![config.nick.clone()]
        }
    }

    fn echo_config(nick: &str) -> BrokerConfig {
        BrokerConfig {
            kind: "echo".into(),
            nick: nick.into(),
            ..BrokerConfig::default()
        }
    }

    #[test]
    fn test_build_registered_kind() {
        let mut registry = BrokerRegistry::new();
        registry.register::<EchoBroker>();
        assert!(registry.contains("echo"));
        assert_eq!(registry.kinds(), vec!["echo"]);

        let built = registry.build("main", &echo_config("bob")).unwrap();
        assert_eq!(built.broker.name(), "echo-bob");
        assert_eq!(built.args, vec!["bob".to_string()]);
    }

    #[test]
    fn test_unknown_kind() {
        let registry = BrokerRegistry::new();
        let err = registry.build("main", &echo_config("bob")).err().unwrap();
        assert!(matches!(err, RuntimeError::UnknownKind { ref kind, .. } if kind == "echo"));
    }

    #[test]
    fn test_config_errors_propagate() {
        let mut registry = BrokerRegistry::new();
        registry.register::<EchoBroker>();
        let err = registry.build("main", &echo_config("")).err().unwrap();
        assert!(matches!(
            err,
            RuntimeError::Build { ref broker, source: BrokerError::InvalidConfig { .. } } if broker == "main"
        ));
    }
}
