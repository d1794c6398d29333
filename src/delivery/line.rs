/// LINE Messaging API reply client
///
/// Converts a `RenderedMessage` into a LINE message object and posts it to
/// the reply endpoint. `PlainText` becomes a `text` message; cards become
/// Flex bubbles, and a carousel becomes a Flex `carousel`.
///
/// LINE rejects empty `text` fields, so blank strings go out as the "-"
/// placeholder.
///
/// API Documentation:
/// https://developers.line.biz/en/reference/messaging-api/#send-reply-message

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::DeliverySink;
use crate::compose::{CardPayload, CardRow, RenderedMessage};
use crate::config::LineConfig;
use crate::model::{MISSING_DESCRIPTION, RelayError, Result};

const REPLY_PATH: &str = "/v2/bot/message/reply";

/// LINE rejects text messages longer than this.
const MAX_TEXT_CHARS: usize = 5000;
/// LINE rejects Flex alt text longer than this.
const MAX_ALT_TEXT_CHARS: usize = 400;

const LABEL_COLOR: &str = "#AAAAAA";
const VALUE_COLOR: &str = "#555555";

// ============================================================================
// Client
// ============================================================================

pub struct LineSink {
    client: reqwest::Client,
    reply_url: String,
    access_token: String,
}

impl LineSink {
    pub fn new(config: &LineConfig, access_token: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            reply_url: format!("{}{}", config.api_base.trim_end_matches('/'), REPLY_PATH),
            access_token: access_token.into(),
        })
    }
}

#[async_trait]
impl DeliverySink for LineSink {
    fn name(&self) -> &str {
        "line"
    }

    async fn deliver(&self, reply_token: &str, message: &RenderedMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.reply_url)
            .bearer_auth(&self.access_token)
            .json(&reply_body(reply_token, message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Delivery {
                status: Some(status.as_u16()),
                reason: format!("LINE API error: {status} {body}"),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// Full request body for the reply endpoint.
pub fn reply_body(reply_token: &str, message: &RenderedMessage) -> Value {
    json!({
        "replyToken": reply_token,
        "messages": [to_line_message(message)],
    })
}

pub fn to_line_message(message: &RenderedMessage) -> Value {
    match message {
        RenderedMessage::PlainText { body } => json!({
            "type": "text",
            "text": truncate_chars(non_empty(body), MAX_TEXT_CHARS),
        }),
        RenderedMessage::SingleCard { alt_text, card } => json!({
            "type": "flex",
            "altText": truncate_chars(non_empty(alt_text), MAX_ALT_TEXT_CHARS),
            "contents": bubble(card),
        }),
        RenderedMessage::CardCarousel { alt_text, cards } => json!({
            "type": "flex",
            "altText": truncate_chars(non_empty(alt_text), MAX_ALT_TEXT_CHARS),
            "contents": {
                "type": "carousel",
                "contents": cards.iter().map(bubble).collect::<Vec<_>>(),
            },
        }),
    }
}

fn bubble(card: &CardPayload) -> Value {
    let mut title = json!({
        "type": "text",
        "text": non_empty(&card.title),
        "weight": "bold",
        "size": "lg",
        "wrap": true,
    });
    if let Some(color) = &card.accent_color {
        title["color"] = json!(color);
    }

    let mut body_contents = vec![title];
    if !card.rows.is_empty() {
        body_contents.push(json!({
            "type": "box",
            "layout": "vertical",
            "margin": "lg",
            "spacing": "sm",
            "contents": card.rows.iter().map(row).collect::<Vec<_>>(),
        }));
    }

    let mut bubble = json!({
        "type": "bubble",
        "body": {
            "type": "box",
            "layout": "vertical",
            "contents": body_contents,
        },
    });

    if let Some(url) = &card.hero_image_url {
        bubble["hero"] = json!({
            "type": "image",
            "url": url,
            "size": "full",
            "aspectRatio": "20:13",
            "aspectMode": "cover",
        });
    }

    if let Some(action) = &card.action {
        bubble["footer"] = json!({
            "type": "box",
            "layout": "vertical",
            "contents": [{
                "type": "button",
                "style": "link",
                "height": "sm",
                "action": { "type": "uri", "label": action.label, "uri": action.uri },
            }],
        });
    }

    bubble
}

fn row(row: &CardRow) -> Value {
    json!({
        "type": "box",
        "layout": "baseline",
        "spacing": "sm",
        "contents": [
            {
                "type": "text",
                "text": non_empty(&row.label),
                "color": LABEL_COLOR,
                "size": "sm",
                "flex": 2,
            },
            {
                "type": "text",
                "text": non_empty(&row.value),
                "wrap": true,
                "color": row.color.as_deref().unwrap_or(VALUE_COLOR),
                "size": "sm",
                "flex": 5,
            },
        ],
    })
}

fn non_empty(text: &str) -> &str {
    if text.trim().is_empty() {
        MISSING_DESCRIPTION
    } else {
        text
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

// ============================================================================
// Tests
// ============================================================================
