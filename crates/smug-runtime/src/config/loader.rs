//! Configuration loader using figment.
//!
//! A configuration is a single YAML document, read from one of:
//!
//! - **A URL**: any location starting with `http` is fetched first
//! - **A file path**: read directly, missing files are an error
//! - **A search**: `smug.yaml` / `smug.yml` in the search paths (current
//!   directory and the user config directory by default)
//!
//! After parsing, environment overrides (see [`env`](super::env)) are
//! applied unless disabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use smug_runtime::config::ConfigLoader;
//!
//! // From default locations
//! let config = ConfigLoader::new().load().await?;
//!
//! // From a URL, without env overrides
//! let config = ConfigLoader::new()
//!     .location("https://config.example/smug.yaml")
//!     .without_env()
//!     .load()
//!     .await?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Format, Serialized, Yaml};
use smug_transport::HttpClient;
use tracing::{debug, info, trace, warn};

use super::env::apply_env_overrides;
use super::error::{ConfigError, ConfigResult};
use super::schema::SmugConfig;

/// File names tried in each search path, in order.
const CONFIG_FILE_NAMES: &[&str] = &["smug.yaml", "smug.yml"];

/// Returns `true` if `location` should be fetched rather than read.
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http")
}

/// Configuration loader.
pub struct ConfigLoader {
    /// Explicit path or URL (overrides search).
    location: Option<String>,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to apply environment overrides.
    load_env: bool,
    /// Timeout for fetching remote configuration.
    fetch_timeout: Option<Duration>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            location: None,
            search_paths: Vec::new(),
            load_env: true,
            fetch_timeout: None,
        }
    }

    /// Sets the configuration file path or URL.
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("smug"))
        } else {
            self
        }
    }

    /// Enables environment overrides (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables environment overrides.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Sets the timeout used when fetching a remote configuration.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Loads and returns the configuration.
    pub async fn load(self) -> ConfigResult<SmugConfig> {
        let mut config = match &self.location {
            Some(url) if is_remote(url) => {
                info!(url = %url, "Fetching configuration");
                let client = HttpClient::new(self.fetch_timeout)?;
                let bytes = client.get_bytes(url).await?;
                let text = String::from_utf8(bytes)
                    .map_err(|e| ConfigError::ParseError(format!("{url}: {e}")))?;
                parse_config(&text)?
            }
            Some(path) => load_config_from_file(path)?,
            None => match self.find_config_file() {
                Some(path) => load_config_from_file(path)?,
                None => {
                    warn!("No configuration file found, using defaults");
                    SmugConfig::default()
                }
            },
        };

        if self.load_env {
            trace!("Applying SMUG_ environment overrides");
            let applied = apply_env_overrides(&mut config)?;
            debug!(applied, "Environment overrides applied");
        }

        debug!(
            active_brokers = ?config.active_brokers,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );
        Ok(config)
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("smug"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    fn find_config_file(&self) -> Option<PathBuf> {
        self.resolve_search_paths()
            .iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|path| path.exists())
    }
}

/// Parses a YAML configuration document.
pub fn parse_config(yaml: &str) -> ConfigResult<SmugConfig> {
    Ok(base_figment().merge(Yaml::string(yaml)).extract()?)
}

/// Loads a configuration file without environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SmugConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    info!(path = %path.display(), "Loading configuration file");
    Ok(base_figment().merge(Yaml::file(path)).extract()?)
}

/// Loads the configuration at `location` (path or URL) with environment
/// overrides.
pub async fn load_config(location: &str) -> ConfigResult<SmugConfig> {
    ConfigLoader::new().location(location).load().await
}

fn base_figment() -> Figment {
    Figment::from(Serialized::defaults(SmugConfig::default()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, LogLevel};
    use figment::Jail;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONFIG: &str = r#"
active-brokers: [patterns, slack]
heartbeat_secs: 30
logging:
  level: debug
  format: json
brokers:
  slack:
    type: slack
    token: xoxb-file
    channel: general
  patterns:
    type: patterns
    timeout_secs: 5
    patterns:
      - name: weather
        help: "weather <city>"
        regex: "^weather (?P<city>\\w+)"
        url: https://api.example/weather
        headers: { X-Key: abc }
        vars: { units: metric }
"#;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    #[test]
    fn test_parse_config() {
        let config = parse_config(CONFIG).unwrap();

        assert_eq!(config.active_brokers, vec!["patterns", "slack"]);
        assert_eq!(config.heartbeat_secs, 30);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);

        let slack = &config.brokers["slack"];
        assert_eq!(slack.kind, "slack");
        assert_eq!(slack.api_token, "xoxb-file");
        assert_eq!(slack.timeout_secs, None);

        let patterns = &config.brokers["patterns"];
        assert_eq!(patterns.timeout_secs, Some(5));
        let weather = &patterns.patterns[0];
        assert_eq!(weather.regex, r"^weather (?P<city>\w+)");
        assert_eq!(weather.method, "POST");
        assert_eq!(weather.headers["X-Key"], "abc");
        assert_eq!(weather.vars["units"], "metric");
    }

    #[test]
    fn test_defaults_fill_gaps() {
        let config = parse_config("active-brokers: []").unwrap();
        assert_eq!(config, SmugConfig::default());
        assert!(parse_config("heartbeat_secs: [1, 2]").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config_from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_search_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("smug.yaml", CONFIG)?;
            jail.set_env("SMUG_SLACK_APITOKEN", "xoxb-env");
            jail.set_env("SMUG_SLACK_CHANNEL", "");

            let config = block_on(ConfigLoader::new().search_path(jail.directory()).load())
                .map_err(|e| e.to_string())?;
            assert_eq!(config.brokers["slack"].api_token, "xoxb-env");
            assert_eq!(config.brokers["slack"].channel, "general");

            let config = block_on(
                ConfigLoader::new()
                    .search_path(jail.directory())
                    .without_env()
                    .load(),
            )
            .map_err(|e| e.to_string())?;
            assert_eq!(config.brokers["slack"].api_token, "xoxb-file");
            Ok(())
        });
    }

    #[test]
    fn test_no_file_uses_defaults() {
        Jail::expect_with(|jail| {
            let config = block_on(
                ConfigLoader::new()
                    .search_path(jail.directory())
                    .without_env()
                    .load(),
            )
            .map_err(|e| e.to_string())?;
            assert_eq!(config, SmugConfig::default());
            Ok(())
        });
    }

    #[tokio::test]
    async fn test_remote_config() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/smug.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CONFIG))
            .mount(&server)
            .await;

        let config = ConfigLoader::new()
            .location(format!("{}/smug.yaml", server.uri()))
            .without_env()
            .load()
            .await
            .unwrap();
        assert_eq!(config.active_brokers, vec!["patterns", "slack"]);
    }

    #[tokio::test]
    async fn test_remote_config_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = ConfigLoader::new()
            .location(format!("{}/missing.yaml", server.uri()))
            .without_env()
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Fetch(_)));
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://config.example/smug.yaml"));
        assert!(is_remote("http://localhost/smug.yaml"));
        assert!(!is_remote("./smug.yaml"));
    }
}
