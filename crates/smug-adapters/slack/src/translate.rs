//! Translation between Slack markup and neutral event text.
//!
//! Inbound, Slack text such as
//!
//! ```text
//! <@U6CRHMXK4> see <https://x.com|the docs> &amp; more
//! ```
//!
//! becomes `bob see the docs & more`. Outbound, `bob: hi` and `hi @bob`
//! become `<@U6CRHMXK4>: hi` and `hi <@U6CRHMXK4>` when the nick is known.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::cache::{Lookup, UserDirectory};

static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<@([UW][A-Z0-9]+)(?:\|([^>]*))?>").expect("Invalid mention regex")
});
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(https?://[^>]*)>").expect("Invalid link regex"));
static LEADING_NICK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+):").expect("Invalid nick regex"));
// `@` must open a word; `ops@bob.example` is an address, not a mention.
static AT_NICK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[^\w.])@(\w+)\b").expect("Invalid nick regex"));
static USER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[UW][A-Z0-9]+$").expect("Invalid user id regex"));

// =============================================================================
// Inbound
// =============================================================================

/// Returns every mentioned user id once, in order of first appearance.
pub fn mention_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in MENTION.captures_iter(text) {
        let id = &caps[1];
        if !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

/// Replaces every mention with the nick resolved for its id.
///
/// Unresolved mentions fall back to their label (`<@U1|bob>`), then to the
/// bare id.
pub fn replace_mentions(text: &str, nicks: &HashMap<String, String>) -> String {
    MENTION
        .replace_all(text, |caps: &Captures<'_>| {
            let id = &caps[1];
            if let Some(nick) = nicks.get(id) {
                return nick.clone();
            }
            caps.get(2)
                .map(|label| label.as_str())
                .filter(|label| !label.is_empty())
                .unwrap_or(id)
                .to_string()
        })
        .into_owned()
}

/// Replaces `<url|label>` link markup with its most readable part.
pub fn simplify_links(text: &str) -> String {
    LINK.replace_all(text, |caps: &Captures<'_>| simplify_link(&caps[1]).to_string())
        .into_owned()
}

fn simplify_link(inner: &str) -> &str {
    let parts: Vec<&str> = inner.split('|').collect();
    match parts.as_slice() {
        [_, label] if !label.is_empty() => *label,
        [first, ..] => *first,
        [] => inner,
    }
}

/// Decodes Slack's text escaping.
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// =============================================================================
// Outbound
// =============================================================================

/// Encodes the characters Slack reserves for markup.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Returns every nick addressed in `text`: `@nick` tokens and a leading
/// `nick:` shorthand.
pub fn nick_tokens(text: &str) -> Vec<String> {
    let mut nicks: Vec<String> = AT_NICK
        .captures_iter(text)
        .map(|caps| caps[2].to_string())
        .collect();
    if let Some(caps) = LEADING_NICK.captures(text) {
        nicks.push(caps[1].to_string());
    }
    nicks.dedup();
    nicks
}

/// Returns `true` if `id` looks like a Slack user id.
pub fn is_user_id(id: &str) -> bool {
    USER_ID.is_match(id)
}

/// Rewrites addressed nicks into mentions.
///
/// `ids` maps lower-cased nicks to user ids; ids failing [`is_user_id`]
/// are ignored and the nick is left as written.
pub fn insert_mentions(text: &str, ids: &HashMap<String, String>) -> String {
    let resolve = |nick: &str| {
        ids.get(&nick.to_lowercase())
            .filter(|id| is_user_id(id))
            .cloned()
    };

    let text = AT_NICK.replace_all(text, |caps: &Captures<'_>| match resolve(&caps[2]) {
        Some(id) => format!("{}<@{id}>", &caps[1]),
        None => caps[0].to_string(),
    });
    LEADING_NICK
        .replace(&text, |caps: &Captures<'_>| match resolve(&caps[1]) {
            Some(id) => format!("<@{id}>:"),
            None => caps[0].to_string(),
        })
        .into_owned()
}

// =============================================================================
// Directory-backed translation
// =============================================================================

impl UserDirectory {
    /// Converts Slack text to neutral text.
    ///
    /// Each distinct id is resolved once.
    pub async fn to_neutral(&self, text: &str, lookup: Lookup) -> String {
        let mut nicks = HashMap::new();
        for id in mention_ids(text) {
            if let Some(nick) = self.user_nick(&id, lookup).await {
                nicks.insert(id, nick);
            }
        }
        unescape(&simplify_links(&replace_mentions(text, &nicks)))
    }

    /// Converts neutral text to Slack text using only cached users.
    pub fn to_network_cached(&self, text: &str) -> String {
        let ids = nick_tokens(text)
            .into_iter()
            .filter_map(|nick| {
                self.cache()
                    .by_nick(&nick)
                    .map(|user| (nick.to_lowercase(), user.id.clone()))
            })
            .collect();
        insert_mentions(&escape(text), &ids)
    }

    /// Converts neutral text to Slack text, optionally resolving unknown
    /// nicks remotely.
    pub async fn to_network(&self, text: &str, lookup: Lookup) -> String {
        let mut ids = HashMap::new();
        for nick in nick_tokens(text) {
            if let Some(id) = self.user_id(&nick, lookup).await {
                ids.insert(nick.to_lowercase(), id);
            }
        }
        insert_mentions(&escape(text), &ids)
    }
}
