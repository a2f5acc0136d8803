//! Environment overrides for broker settings.
//!
//! Each broker entry can have its connection settings replaced from the
//! environment, keyed by the upper-cased broker name:
//!
//! ```text
//! brokers.slack.token    <- SMUG_SLACK_APITOKEN
//! brokers.slack.channel  <- SMUG_SLACK_CHANNEL
//! brokers.irc-main.ssl   <- SMUG_IRC_MAIN_SSL
//! ```
//!
//! Characters other than ASCII letters and digits in the broker name become
//! `_`. Unset and empty variables leave the file value untouched.

use smug_core::BrokerConfig;
use tracing::debug;

use super::error::{ConfigError, ConfigResult};
use super::schema::SmugConfig;

/// Prefix shared by every override variable.
pub const ENV_PREFIX: &str = "SMUG";

type Setter = fn(&mut BrokerConfig, &str) -> Result<(), String>;

/// Field suffix to setter.
const OVERRIDES: &[(&str, Setter)] = &[
    ("SERVER", set_server),
    ("APITOKEN", set_api_token),
    ("SSL", set_use_ssl),
    ("NICK", set_nick),
    ("CHANNEL", set_channel),
];

fn set_server(config: &mut BrokerConfig, value: &str) -> Result<(), String> {
    config.server = value.to_string();
    Ok(())
}

fn set_api_token(config: &mut BrokerConfig, value: &str) -> Result<(), String> {
    config.api_token = value.to_string();
    Ok(())
}

fn set_use_ssl(config: &mut BrokerConfig, value: &str) -> Result<(), String> {
    config.use_ssl = parse_bool(value)?;
    Ok(())
}

fn set_nick(config: &mut BrokerConfig, value: &str) -> Result<(), String> {
    config.nick = value.to_string();
    Ok(())
}

fn set_channel(config: &mut BrokerConfig, value: &str) -> Result<(), String> {
    config.channel = value.to_string();
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

/// Returns the variable name overriding `suffix` of broker `broker`.
pub fn env_key(broker: &str, suffix: &str) -> String {
    let broker: String = broker
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{ENV_PREFIX}_{broker}_{suffix}")
}

/// Applies overrides from the process environment.
///
/// Returns the number of fields overridden.
pub fn apply_env_overrides(config: &mut SmugConfig) -> ConfigResult<usize> {
    apply_overrides_with(config, |key| std::env::var(key).ok())
}

/// Applies overrides read through `lookup`.
pub fn apply_overrides_with<F>(config: &mut SmugConfig, lookup: F) -> ConfigResult<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;
    for (name, broker) in config.brokers.iter_mut() {
        for (suffix, set) in OVERRIDES {
            let var = env_key(name, suffix);
            let Some(value) = lookup(&var).filter(|v| !v.is_empty()) else {
                continue;
            };
            set(broker, &value).map_err(|reason| ConfigError::InvalidEnv {
                var: var.clone(),
                reason,
            })?;
            debug!(broker = %name, var = %var, "Applied environment override");
            applied += 1;
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> SmugConfig {
        let mut config = SmugConfig::default();
        config.brokers.insert(
            "slack".into(),
            BrokerConfig {
                kind: "slack".into(),
                api_token: "from-file".into(),
                channel: "general".into(),
                ..BrokerConfig::default()
            },
        );
        config.brokers.insert(
            "irc-main".into(),
            BrokerConfig {
                kind: "irc".into(),
                ..BrokerConfig::default()
            },
        );
        config
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_env_key() {
        assert_eq!(env_key("slack", "APITOKEN"), "SMUG_SLACK_APITOKEN");
        assert_eq!(env_key("irc-main", "SSL"), "SMUG_IRC_MAIN_SSL");
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = config();
        let applied = apply_overrides_with(
            &mut config,
            lookup(&[
                ("SMUG_SLACK_APITOKEN", "xoxb-env"),
                ("SMUG_SLACK_CHANNEL", ""),
                ("SMUG_IRC_MAIN_SERVER", "irc.example:6697"),
                ("SMUG_IRC_MAIN_SSL", "yes"),
                ("SMUG_IRC_MAIN_NICK", "smugbot"),
            ]),
        )
        .unwrap();

        assert_eq!(applied, 4);
        let slack = &config.brokers["slack"];
        assert_eq!(slack.api_token, "xoxb-env");
        // empty values are ignored
        assert_eq!(slack.channel, "general");
        let irc = &config.brokers["irc-main"];
        assert_eq!(irc.server, "irc.example:6697");
        assert!(irc.use_ssl);
        assert_eq!(irc.nick, "smugbot");
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let mut config = config();
        let err = apply_overrides_with(&mut config, lookup(&[("SMUG_SLACK_SSL", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { ref var, .. } if var == "SMUG_SLACK_SSL"));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Ok(true));
        assert_eq!(parse_bool("0"), Ok(false));
        assert_eq!(parse_bool(" no "), Ok(false));
        assert!(parse_bool("").is_err());
    }
}
