//! Regex-to-endpoint routing rules.
//!
//! A [`Pattern`] is validated once at construction and immutable afterwards,
//! so it can be shared between the router and its in-flight submissions
//! without locking.

use std::collections::{BTreeMap, HashMap};

use regex::Regex;
use smug_core::PatternConfig;
use smug_transport::{HeaderMap, HttpMethod, build_headers};

use crate::error::{PatternError, PatternResult};

/// Named capture results keyed by group name.
pub type NamedGroups = HashMap<String, String>;

/// A compiled routing rule.
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    regex: Regex,
    url: String,
    method: HttpMethod,
    headers: HeaderMap,
    vars: HashMap<String, String>,
    help: String,
}

impl Pattern {
    /// Builds a pattern from its configuration, validating every field.
    pub fn new(config: &PatternConfig) -> PatternResult<Self> {
        let name = config.name.clone();

        if !is_http_url(&config.url) {
            return Err(PatternError::InvalidUrl {
                pattern: name,
                url: config.url.clone(),
            });
        }

        let method = config
            .method
            .parse::<HttpMethod>()
            .map_err(|_| PatternError::InvalidMethod {
                pattern: name.clone(),
                method: config.method.clone(),
            })?;

        let regex = Regex::new(&config.regex).map_err(|e| PatternError::InvalidRegex {
            pattern: name.clone(),
            reason: e.to_string(),
        })?;

        let headers = build_headers(&config.headers).map_err(|e| PatternError::InvalidHeader {
            pattern: name.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name,
            regex,
            url: config.url.clone(),
            method,
            headers,
            vars: config.vars.clone(),
            help: config.help.clone(),
        })
    }

    /// Builds an unnamed POST pattern without headers, vars or help.
    pub fn simple(regex: &str, url: &str) -> PatternResult<Self> {
        Self::new(&PatternConfig {
            regex: regex.to_string(),
            url: url.to_string(),
            ..PatternConfig::default()
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help_text(&self) -> &str {
        &self.help
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Matches `text` against the pattern.
    ///
    /// Returns `None` when the regex does not match. Otherwise returns the
    /// positional captures (index 0 is the whole match) and the named
    /// captures; groups that did not participate map to an empty string.
    pub fn extract_matches(&self, text: &str) -> Option<(Vec<String>, NamedGroups)> {
        let captures = self.regex.captures(text)?;

        let positional = captures
            .iter()
            .map(|m| m.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect();

        let named = self
            .regex
            .capture_names()
            .flatten()
            .map(|group| {
                let value = captures.name(group).map_or("", |m| m.as_str());
                (group.to_string(), value.to_string())
            })
            .collect();

        Some((positional, named))
    }

    /// Builds the JSON body sent to the endpoint.
    ///
    /// Later sources overwrite earlier ones: `actor` and `text`, then named
    /// captures, then static vars.
    pub fn payload(&self, actor: &str, text: &str, named: &NamedGroups) -> BTreeMap<String, String> {
        let mut payload = BTreeMap::new();
        payload.insert("actor".to_string(), actor.to_string());
        payload.insert("text".to_string(), text.to_string());
        payload.extend(named.iter().map(|(k, v)| (k.clone(), v.clone())));
        payload.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        payload
    }
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.len() > scheme.len() && lower.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(regex: &str) -> PatternConfig {
        PatternConfig {
            name: "weather".into(),
            help: "weather <city>".into(),
            regex: regex.into(),
            url: "https://api.example/weather".into(),
            ..PatternConfig::default()
        }
    }

    #[test]
    fn rejects_non_http_url() {
        let mut cfg = config("^weather");
        cfg.url = "ftp://files.example".into();
        assert!(matches!(
            Pattern::new(&cfg),
            Err(PatternError::InvalidUrl { .. })
        ));

        cfg.url = "http://".into();
        assert!(matches!(
            Pattern::new(&cfg),
            Err(PatternError::InvalidUrl { .. })
        ));

        cfg.url = "HTTPS://API.EXAMPLE".into();
        assert!(Pattern::new(&cfg).is_ok());
    }

    #[test]
    fn rejects_bad_method() {
        let mut cfg = config("^weather");
        cfg.method = "PUT".into();
        assert_eq!(
            Pattern::new(&cfg).unwrap_err(),
            PatternError::InvalidMethod {
                pattern: "weather".into(),
                method: "PUT".into()
            }
        );

        cfg.method = "get".into();
        assert_eq!(Pattern::new(&cfg).unwrap().method(), HttpMethod::Get);
    }

    #[test]
    fn rejects_bad_regex_and_header() {
        assert!(matches!(
            Pattern::new(&config("(unclosed")),
            Err(PatternError::InvalidRegex { .. })
        ));

        let mut cfg = config("^weather");
        cfg.headers.insert("bad header".into(), "v".into());
        assert!(matches!(
            Pattern::new(&cfg),
            Err(PatternError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn simple_pattern_defaults() {
        let pattern = Pattern::simple("^ping$", "http://localhost:8080/ping").unwrap();
        assert_eq!(pattern.name(), "n/a");
        assert_eq!(pattern.method(), HttpMethod::Post);
        assert_eq!(pattern.help_text(), "");
    }

    #[test]
    fn extracts_positional_and_named_captures() {
        let pattern = Pattern::new(&config(r"^weather (?P<city>\w+)(?: in (?P<unit>\w+))?")).unwrap();

        assert!(pattern.extract_matches("what is the weather").is_none());

        let (positional, named) = pattern.extract_matches("weather London").unwrap();
        assert_eq!(positional, vec!["weather London", "London", ""]);
        assert_eq!(named.get("city").map(String::as_str), Some("London"));
        assert_eq!(named.get("unit").map(String::as_str), Some(""));
    }

    #[test]
    fn vars_win_over_captures() {
        let mut cfg = config(r"^weather (?P<city>\w+)");
        cfg.vars.insert("city".into(), "Paris".into());
        cfg.vars.insert("units".into(), "metric".into());
        let pattern = Pattern::new(&cfg).unwrap();

        let (_, named) = pattern.extract_matches("weather London").unwrap();
        let payload = pattern.payload("bob", "weather London", &named);

        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["actor", "city", "text", "units"]);
        assert_eq!(payload["actor"], "bob");
        assert_eq!(payload["text"], "weather London");
        assert_eq!(payload["city"], "Paris");
        assert_eq!(payload["units"], "metric");
    }

    #[test]
    fn captures_may_override_actor() {
        let pattern = Pattern::new(&config(r"^as (?P<actor>\w+)")).unwrap();
        let (_, named) = pattern.extract_matches("as alice").unwrap();
        assert_eq!(pattern.payload("bob", "as alice", &named)["actor"], "alice");
    }
}
