use crate::{
    error::HabitError,
    message::{Document, MessageHandle, OutgoingMessage, Update},
};
use async_trait::async_trait;

/// Messaging channel trait: the chat transport.
///
/// Sends may be invoked concurrently from the receive loop and the
/// scheduler; implementations must be safe for that.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for updates.
    ///
    /// The returned receiver is an infinite stream; reconnecting after
    /// transport failures is the channel's own responsibility.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<Update>, HabitError>;

    /// Send a message. Delivery failures are returned to the caller.
    async fn send(&self, message: OutgoingMessage) -> Result<MessageHandle, HabitError>;

    /// Send a file with a caption.
    async fn send_document(&self, chat_id: i64, document: Document) -> Result<(), HabitError>;

    /// Acknowledge a button press, optionally showing a short notice.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>)
        -> Result<(), HabitError>;

    /// Delete a previously sent message.
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), HabitError>;

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), HabitError>;
}
