//! Structured replies returned by pattern endpoints.
//!
//! ```json
//! {"text": "Sunny, 21°C", "blocks": [{"title": "London", "text": "...", "img": "https://..."}]}
//! ```
//!
//! Every field is optional.

use serde::Deserialize;
use smug_core::{Event, EventBlock};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiBlock {
    pub text: String,
    pub img: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ApiReply {
    pub text: String,
    pub blocks: Vec<ApiBlock>,
}

impl ApiReply {
    /// Parses a 2xx response body.
    ///
    /// A blank body means "nothing to say" and yields `Ok(None)`.
    pub fn parse(body: &str) -> Result<Option<Self>, serde_json::Error> {
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(body).map(Some)
    }

    /// Converts the reply into command output answering `request`.
    pub fn into_event(self, request: &Event) -> Event {
        let blocks = self
            .blocks
            .into_iter()
            .map(|b| EventBlock::new(b.title, b.text, b.img))
            .collect();
        Event::reply_to(request, self.text).with_blocks(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_body_is_no_reply() {
        assert_eq!(ApiReply::parse("").unwrap(), None);
        assert_eq!(ApiReply::parse("  \n").unwrap(), None);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(ApiReply::parse("<html>oops</html>").is_err());
        assert!(ApiReply::parse(r#"{"text": 5}"#).is_err());
    }

    #[test]
    fn missing_fields_default() {
        let reply = ApiReply::parse(r#"{"blocks":[{"title":"T"}]}"#)
            .unwrap()
            .unwrap();
        assert_eq!(reply.text, "");
        assert_eq!(
            reply.blocks,
            vec![ApiBlock {
                title: "T".into(),
                ..ApiBlock::default()
            }]
        );
    }

    #[test]
    fn reply_routes_back_to_request() {
        let request = Event::new("bob", "weather London")
            .with_origin("slack-general")
            .with_reply("slack-general", "D42");
        let reply = ApiReply::parse(
            r#"{"text":"ok","blocks":[{"title":"London","text":"Sunny","img":"http://img"}]}"#,
        )
        .unwrap()
        .unwrap();

        let event = reply.into_event(&request);
        assert!(event.is_cmd_output);
        assert_eq!(event.text, "ok");
        assert_eq!(event.reply_broker.as_deref(), Some("slack-general"));
        assert_eq!(event.reply_target.as_deref(), Some("D42"));
        assert_eq!(
            event.content_blocks,
            vec![EventBlock::new("London", "Sunny", "http://img")]
        );
    }
}
