//! Slack Web API access.
//!
//! The broker talks to Slack only through [`SlackApi`], so tests and
//! alternative clients can stand in for [`SlackWebApi`].
//!
//! | Method | Web API call |
//! |--------|--------------|
//! | [`auth_test`](SlackApi::auth_test) | `auth.test` |
//! | [`find_channel`](SlackApi::find_channel) | `conversations.list` |
//! | [`channel_members`](SlackApi::channel_members) | `conversations.members` |
//! | [`user_info`](SlackApi::user_info) | `users.info` |
//! | [`user_by_nick`](SlackApi::user_by_nick) | `users.list` |
//! | [`post_message`](SlackApi::post_message) | `chat.postMessage` |

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smug_transport::HttpClient;
use tracing::trace;

use crate::cache::SlackUser;
use crate::error::{SlackError, SlackResult};
use crate::model::{AuthIdentity, OutgoingMessage, SlackChannel, UserRecord};

/// Default Web API endpoint.
pub const SLACK_API_URL: &str = "https://slack.com/api";

const PAGE_SIZE: &str = "200";

/// Operations the Slack broker needs from the Web API.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Returns the identity the token belongs to.
    async fn auth_test(&self) -> SlackResult<AuthIdentity>;

    /// Finds a channel by name (without the leading `#`).
    async fn find_channel(&self, name: &str) -> SlackResult<Option<SlackChannel>>;

    /// Lists the user ids in a channel.
    async fn channel_members(&self, channel_id: &str) -> SlackResult<Vec<String>>;

    /// Fetches a single user by id.
    async fn user_info(&self, user_id: &str) -> SlackResult<SlackUser>;

    /// Finds a user by nick, case-insensitively.
    async fn user_by_nick(&self, nick: &str) -> SlackResult<Option<SlackUser>>;

    /// Posts a message.
    async fn post_message(&self, message: &OutgoingMessage) -> SlackResult<()>;
}

/// [`SlackApi`] backed by Slack's HTTPS Web API.
#[derive(Debug, Clone)]
pub struct SlackWebApi {
    client: HttpClient,
    token: String,
    base_url: String,
}

impl SlackWebApi {
    pub fn new(client: HttpClient, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
            base_url: SLACK_API_URL.to_string(),
        }
    }

    /// Points the client at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, method: &str, query: &[(&str, &str)]) -> SlackResult<Value> {
        let url = format!("{}/{method}", self.base_url);
        let response: Value = self.client.get_json(&url, Some(&self.token), query).await?;
        trace!(method, "Slack call complete");
        check_ok(method, response)
    }

    /// Walks a cursor-paginated list, stopping early once `visit` returns `true`.
    async fn paginate<F>(
        &self,
        method: &str,
        query: &[(&str, &str)],
        mut visit: F,
    ) -> SlackResult<()>
    where
        F: FnMut(&Value) -> SlackResult<bool> + Send,
    {
        let mut cursor = String::new();
        loop {
            let mut page_query = query.to_vec();
            page_query.push(("limit", PAGE_SIZE));
            if !cursor.is_empty() {
                page_query.push(("cursor", &cursor));
            }
            let page = self.get(method, &page_query).await?;
            if visit(&page)? {
                return Ok(());
            }
            match next_cursor(&page) {
                Some(next) => cursor = next,
                None => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl SlackApi for SlackWebApi {
    async fn auth_test(&self) -> SlackResult<AuthIdentity> {
        let response = self.get("auth.test", &[]).await?;
        decode("auth.test", response)
    }

    async fn find_channel(&self, name: &str) -> SlackResult<Option<SlackChannel>> {
        let mut found = None;
        self.paginate(
            "conversations.list",
            &[("types", "public_channel,private_channel"), ("exclude_archived", "true")],
            |page| {
                let channels: Vec<SlackChannel> =
                    decode_field("conversations.list", page, "channels")?;
                found = channels.into_iter().find(|c| c.name == name);
                Ok(found.is_some())
            },
        )
        .await?;
        Ok(found)
    }

    async fn channel_members(&self, channel_id: &str) -> SlackResult<Vec<String>> {
        let mut members = Vec::new();
        self.paginate(
            "conversations.members",
            &[("channel", channel_id)],
            |page| {
                let page_members: Vec<String> =
                    decode_field("conversations.members", page, "members")?;
                members.extend(page_members);
                Ok(false)
            },
        )
        .await?;
        Ok(members)
    }

    async fn user_info(&self, user_id: &str) -> SlackResult<SlackUser> {
        let response = self.get("users.info", &[("user", user_id)]).await?;
        let record: UserRecord = decode_field("users.info", &response, "user")?;
        Ok(record.into())
    }

    async fn user_by_nick(&self, nick: &str) -> SlackResult<Option<SlackUser>> {
        let mut found = None;
        self.paginate("users.list", &[], |page| {
            let records: Vec<UserRecord> = decode_field("users.list", page, "members")?;
            found = records
                .into_iter()
                .find(|r| !r.deleted && r.name.eq_ignore_ascii_case(nick));
            Ok(found.is_some())
        })
        .await?;
        Ok(found.map(SlackUser::from))
    }

    async fn post_message(&self, message: &OutgoingMessage) -> SlackResult<()> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let body = serde_json::to_value(message).map_err(|e| SlackError::Decode {
            method: "chat.postMessage".into(),
            reason: e.to_string(),
        })?;
        let response: Value = self.client.post_json(&url, Some(&self.token), &body).await?;
        check_ok("chat.postMessage", response).map(|_| ())
    }
}

impl From<UserRecord> for SlackUser {
    fn from(record: UserRecord) -> Self {
        let avatar = Some(record.profile.image_72).filter(|a| !a.is_empty());
        SlackUser {
            id: record.id,
            nick: record.name,
            avatar,
        }
    }
}

fn check_ok(method: &str, response: Value) -> SlackResult<Value> {
    if response.get("ok").and_then(Value::as_bool) == Some(true) {
        return Ok(response);
    }
    let error = response
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error")
        .to_string();
    Err(SlackError::Api {
        method: method.to_string(),
        error,
    })
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> SlackResult<T> {
    serde_json::from_value(value).map_err(|e| SlackError::Decode {
        method: method.to_string(),
        reason: e.to_string(),
    })
}

fn decode_field<T: DeserializeOwned>(method: &str, value: &Value, field: &str) -> SlackResult<T> {
    let inner = value.get(field).cloned().ok_or_else(|| SlackError::Decode {
        method: method.to_string(),
        reason: format!("missing field '{field}'"),
    })?;
    decode(method, inner)
}

fn next_cursor(page: &Value) -> Option<String> {
    page.pointer("/response_metadata/next_cursor")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api(server: &MockServer) -> SlackWebApi {
        SlackWebApi::new(HttpClient::new(None).unwrap(), "xoxb-test").with_base_url(server.uri())
    }

    #[tokio::test]
    async fn auth_test_returns_identity() {
        let server = MockServer::start().await;
        Mock::given(path("/auth.test"))
            .and(bearer_token("xoxb-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "user_id": "UBOT", "bot_id": "BBOT", "user": "smugbot", "team": "smug"
            })))
            .mount(&server)
            .await;

        let identity = api(&server).await.auth_test().await.unwrap();
        assert_eq!(identity.user_id, "UBOT");
        assert_eq!(identity.bot_id, "BBOT");
    }

    #[tokio::test]
    async fn not_ok_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(path("/auth.test"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "invalid_auth"})),
            )
            .mount(&server)
            .await;

        let err = api(&server).await.auth_test().await.unwrap_err();
        assert!(matches!(&err, SlackError::Api { method, error } if method == "auth.test" && error == "invalid_auth"));
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn find_channel_follows_cursor() {
        let server = MockServer::start().await;
        Mock::given(path("/conversations.list"))
            .and(query_param("cursor", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{"id": "C2", "name": "general"}],
                "response_metadata": {"next_cursor": ""}
            })))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(path("/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "channels": [{"id": "C1", "name": "random"}],
                "response_metadata": {"next_cursor": "page2"}
            })))
            .with_priority(2)
            .mount(&server)
            .await;

        let api = api(&server).await;
        let channel = api.find_channel("general").await.unwrap();
        assert_eq!(
            channel,
            Some(SlackChannel {
                id: "C2".into(),
                name: "general".into()
            })
        );
        assert_eq!(api.find_channel("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn user_lookups() {
        let server = MockServer::start().await;
        Mock::given(path("/users.info"))
            .and(query_param("user", "U1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "user": {"id": "U1", "name": "bob", "profile": {"image_72": "https://img/bob.png"}}
            })))
            .mount(&server)
            .await;
        Mock::given(path("/users.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "members": [
                    {"id": "U1", "name": "bob", "profile": {}},
                    {"id": "U2", "name": "Alice", "profile": {}},
                    {"id": "U3", "name": "ghost", "deleted": true, "profile": {}}
                ]
            })))
            .mount(&server)
            .await;

        let api = api(&server).await;
        let bob = api.user_info("U1").await.unwrap();
        assert_eq!(bob.nick, "bob");
        assert_eq!(bob.avatar.as_deref(), Some("https://img/bob.png"));

        let alice = api.user_by_nick("alice").await.unwrap().unwrap();
        assert_eq!(alice.id, "U2");
        assert_eq!(alice.avatar, None);
        assert!(api.user_by_nick("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn post_message_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(json!({
                "channel": "C1", "text": "hi", "username": "bob", "icon_emoji": ":avatar_bob:"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        api(&server)
            .await
            .post_message(&OutgoingMessage::new("C1", "hi", "bob"))
            .await
            .unwrap();
    }
}
