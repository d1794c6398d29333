//! Inbound webhook event batch.
//!
//! The HTTP listener and signature check live outside this crate; what
//! arrives here is the already-authenticated request body. Only text
//! messages carrying a reply token are actionable; every other event type
//! (follow, postback, stickers, ...) is skipped.

use serde::Deserialize;

use crate::model::Result;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// A text message that can be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCommand<'a> {
    pub reply_token: &'a str,
    pub text: &'a str,
}

impl WebhookEvent {
    pub fn as_text_command(&self) -> Option<TextCommand<'_>> {
        if self.kind != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.kind != "text" {
            return None;
        }
        Some(TextCommand {
            reply_token: self.reply_token.as_deref()?,
            text: message.text.as_deref()?,
        })
    }
}

pub fn parse_body(json: &str) -> Result<WebhookBody> {
    Ok(serde_json::from_str(json)?)
}

/// Parses a body straight from raw input bytes; invalid UTF-8 is a parse
/// error like any other malformed document.
pub fn parse_body_bytes(bytes: &[u8]) -> Result<WebhookBody> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelayError;

    const BODY: &str = r#"{
        "destination": "U0000",
        "events": [
            { "type": "message", "replyToken": "r1", "timestamp": 1714568400000,
              "message": { "type": "text", "id": "1", "text": "level" } },
            { "type": "message", "replyToken": "r2",
              "message": { "type": "sticker", "id": "2", "packageId": "1", "stickerId": "1" } },
            { "type": "follow", "replyToken": "r3" },
            { "type": "message", "message": { "type": "text", "text": "history" } }
        ]
    }"#;

    #[test]
    fn test_only_text_messages_with_reply_token_are_commands() {
        let body = parse_body(BODY).expect("valid body");
        assert_eq!(body.events.len(), 4);

        let commands: Vec<TextCommand<'_>> =
            body.events.iter().filter_map(WebhookEvent::as_text_command).collect();
        assert_eq!(
            commands,
            vec![TextCommand {
                reply_token: "r1",
                text: "level"
            }]
        );
    }

    #[test]
    fn test_body_without_events_is_empty_batch() {
        let body = parse_body(r#"{ "destination": "U0000" }"#).expect("valid body");
        assert!(body.events.is_empty());
    }

    #[test]
    fn test_malformed_body_is_error() {
        assert!(parse_body("{ events: ").is_err());
    }

    #[test]
    fn test_body_bytes_reject_invalid_utf8() {
        let body = parse_body_bytes(BODY.as_bytes()).expect("valid body");
        assert_eq!(body.events.len(), 4);

        let text = b"{\"events\": [{\"type\": \"message\", \"replyToken\": \"r1\",
            \"message\": {\"type\": \"text\", \"text\": \"\xc3\x28\"}}]}";
        assert!(matches!(parse_body_bytes(text), Err(RelayError::Parse(_))));
        assert!(parse_body_bytes(b"\xff\xfe bad\n").is_err());
    }
}
