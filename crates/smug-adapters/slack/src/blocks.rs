//! Block Kit rendering of event content blocks.

use serde_json::{Value, json};
use smug_core::EventBlock;

/// Alt text used for image accessories.
const IMAGE_ALT: &str = "accimg";

fn section(text: &str) -> Value {
    json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": text},
    })
}

/// Renders content blocks as Block Kit sections.
///
/// A non-empty title becomes a bold section of its own. Text and image
/// share a second section with the image as accessory; blocks with neither
/// contribute only their title.
pub fn render_blocks(blocks: &[EventBlock]) -> Vec<Value> {
    let mut rendered = Vec::new();
    for block in blocks {
        if !block.title.is_empty() {
            rendered.push(section(&format!("*{}*", block.title)));
        }
        if block.is_title_only() {
            continue;
        }

        // Slack rejects sections with empty text.
        let text = if block.text.is_empty() { " " } else { block.text.as_str() };
        let mut body = section(text);
        if !block.img_url.is_empty() {
            body["accessory"] = json!({
                "type": "image",
                "image_url": block.img_url,
                "alt_text": IMAGE_ALT,
            });
        }
        rendered.push(body);
    }
    rendered
}
