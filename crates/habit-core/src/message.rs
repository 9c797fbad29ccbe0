use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inbound event from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Update {
    /// A text message (command or free text).
    Message(IncomingMessage),
    /// An inline keyboard button press.
    Callback(CallbackQuery),
}

/// An incoming text message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform-assigned user ID.
    pub sender_id: i64,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Chat the message was sent in; replies go here.
    pub chat_id: i64,
    /// Platform message ID, used for threaded replies.
    pub message_id: i64,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Platform callback ID, needed to answer the query.
    pub id: String,
    pub sender_id: i64,
    pub chat_id: i64,
    /// The message carrying the keyboard, if the platform reports it.
    pub message_id: Option<i64>,
    /// Opaque data attached to the pressed button.
    pub data: String,
}

/// An outgoing message to send through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub chat_id: i64,
    pub text: String,
    /// Reply to this message ID in the same chat.
    #[serde(default)]
    pub reply_to: Option<i64>,
    #[serde(default)]
    pub keyboard: Option<InlineKeyboard>,
}

impl OutgoingMessage {
    /// A plain text message to a chat.
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Inline keyboard (rows of buttons) attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

/// Reference to a message the channel delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    pub chat_id: i64,
    pub message_id: i64,
}

/// A file sent as a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    pub data: Vec<u8>,
    pub caption: String,
}
