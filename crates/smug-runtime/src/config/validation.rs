//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, SmugConfig};

/// Validates the entire configuration.
///
/// Broker kinds are checked later, against the kinds the runtime knows.
pub fn validate_config(config: &SmugConfig) -> ConfigResult<()> {
    if config.heartbeat_secs == 0 {
        return Err(ConfigError::validation(
            "Heartbeat interval must be greater than 0",
        ));
    }

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "File log output requires logging.file_path",
        ));
    }

    validate_active_brokers(config)
}

fn validate_active_brokers(config: &SmugConfig) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for name in &config.active_brokers {
        if !seen.insert(name) {
            return Err(ConfigError::validation(format!(
                "Broker '{name}' is listed as active more than once"
            )));
        }

        let Some(broker) = config.brokers.get(name) else {
            return Err(ConfigError::MissingBroker(name.clone()));
        };
        if broker.kind.is_empty() {
            return Err(ConfigError::validation(format!(
                "Broker '{name}' has no type"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use smug_core::BrokerConfig;
    use std::path::PathBuf;

    fn with_broker(name: &str, kind: &str) -> SmugConfig {
        let mut config = SmugConfig::default();
        config.active_brokers.push(name.to_string());
        config.brokers.insert(
            name.to_string(),
            BrokerConfig {
                kind: kind.to_string(),
                ..BrokerConfig::default()
            },
        );
        config
    }

    #[test]
    fn test_validate_empty_config() {
        assert!(validate_config(&SmugConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_active_broker() {
        assert!(validate_config(&with_broker("slack", "slack")).is_ok());

        let mut missing = with_broker("slack", "slack");
        missing.active_brokers.push("patterns".into());
        assert!(matches!(
            validate_config(&missing),
            Err(ConfigError::MissingBroker(ref name)) if name == "patterns"
        ));

        assert!(validate_config(&with_broker("slack", "")).is_err());

        let mut twice = with_broker("slack", "slack");
        twice.active_brokers.push("slack".into());
        assert!(validate_config(&twice).is_err());
    }

    #[test]
    fn test_inactive_brokers_are_not_checked() {
        let mut config = SmugConfig::default();
        config
            .brokers
            .insert("spare".into(), BrokerConfig::default());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_heartbeat_and_logging() {
        let mut config = SmugConfig::default();
        config.heartbeat_secs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = SmugConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());
        config.logging.file_path = Some(PathBuf::from("smug.log"));
        assert!(validate_config(&config).is_ok());
    }
}
