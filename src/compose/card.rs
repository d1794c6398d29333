//! Card and message shapes produced by the composer.
//!
//! These are channel-neutral; `delivery::line` converts them to the Flex
//! wire format.

use serde::Serialize;

/// One labelled text row in a card body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardRow {
    pub label: String,
    pub value: String,
    /// Overrides the default text colour of the value.
    pub color: Option<String>,
}

impl CardRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// A link button at the foot of a card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardAction {
    pub label: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardPayload {
    pub title: String,
    pub hero_image_url: Option<String>,
    pub accent_color: Option<String>,
    pub rows: Vec<CardRow>,
    pub action: Option<CardAction>,
}

impl CardPayload {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            hero_image_url: None,
            accent_color: None,
            rows: Vec::new(),
            action: None,
        }
    }

    pub fn with_hero(mut self, url: Option<String>) -> Self {
        self.hero_image_url = url;
        self
    }

    pub fn with_accent(mut self, color: impl Into<String>) -> Self {
        self.accent_color = Some(color.into());
        self
    }

    pub fn with_row(mut self, row: CardRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn with_action(mut self, label: impl Into<String>, uri: impl Into<String>) -> Self {
        self.action = Some(CardAction {
            label: label.into(),
            uri: uri.into(),
        });
        self
    }
}

/// A message ready for the delivery sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedMessage {
    PlainText { body: String },
    SingleCard { alt_text: String, card: CardPayload },
    /// Never constructed with an empty `cards`.
    CardCarousel { alt_text: String, cards: Vec<CardPayload> },
}

impl RenderedMessage {
    pub fn plain(body: impl Into<String>) -> Self {
        RenderedMessage::PlainText { body: body.into() }
    }

    /// Short name of the variant, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderedMessage::PlainText { .. } => "text",
            RenderedMessage::SingleCard { .. } => "card",
            RenderedMessage::CardCarousel { .. } => "carousel",
        }
    }

    pub fn cards(&self) -> &[CardPayload] {
        match self {
            RenderedMessage::PlainText { .. } => &[],
            RenderedMessage::SingleCard { card, .. } => std::slice::from_ref(card),
            RenderedMessage::CardCarousel { cards, .. } => cards,
        }
    }

    pub fn is_plain_text(&self) -> bool {
        matches!(self, RenderedMessage::PlainText { .. })
    }
}
