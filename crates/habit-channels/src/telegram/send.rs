//! Outbound Bot API calls: messages, documents, callbacks, deletes.

use super::types::{TgResponse, TgSentMessage};
use super::TelegramChannel;
use crate::utils::split_message;
use habit_core::{
    error::HabitError,
    message::{Document, InlineKeyboard, MessageHandle, OutgoingMessage},
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

/// Telegram's maximum message length.
const MAX_MESSAGE_LEN: usize = 4096;

impl TelegramChannel {
    /// POST a JSON body to a Bot API method and unwrap the `result`.
    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, HabitError> {
        let url = format!("{}/{method}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| HabitError::Channel(format!("telegram {method} failed: {e}")))?;
        read_result(method, resp).await
    }

    /// Send a text message, split into 4096-char chunks.
    ///
    /// `reply_to` applies to the first chunk and the keyboard to the last.
    /// Returns the handle of the last chunk sent.
    pub(crate) async fn send_text(
        &self,
        message: &OutgoingMessage,
    ) -> Result<MessageHandle, HabitError> {
        let chunks = split_message(&message.text, MAX_MESSAGE_LEN);
        let last = chunks.len() - 1;
        let mut handle = None;

        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut body = json!({
                "chat_id": message.chat_id,
                "text": chunk,
            });
            if let (0, Some(reply_to)) = (i, message.reply_to) {
                body["reply_parameters"] = json!({
                    "message_id": reply_to,
                    "allow_sending_without_reply": true,
                });
            }
            if let (true, Some(keyboard)) = (i == last, message.keyboard.as_ref()) {
                body["reply_markup"] = keyboard_markup(keyboard);
            }

            let sent: TgSentMessage = self.call("sendMessage", &body).await?;
            handle = Some(MessageHandle {
                chat_id: sent.chat.id,
                message_id: sent.message_id,
            });
        }

        debug!("telegram: sent message to chat {}", message.chat_id);
        handle.ok_or_else(|| HabitError::Channel("telegram sendMessage sent nothing".into()))
    }

    /// Upload a document with a caption.
    pub(crate) async fn send_document_bytes(
        &self,
        chat_id: i64,
        document: Document,
    ) -> Result<(), HabitError> {
        let url = format!("{}/sendDocument", self.base_url);

        let part = reqwest::multipart::Part::bytes(document.data)
            .file_name(document.filename)
            .mime_str("application/octet-stream")
            .map_err(|e| HabitError::Channel(format!("mime error: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", document.caption)
            .part("document", part);

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| HabitError::Channel(format!("telegram sendDocument failed: {e}")))?;

        let _: TgSentMessage = read_result("sendDocument", resp).await?;
        Ok(())
    }

    pub(crate) async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), HabitError> {
        let mut body = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", &body).await?;
        Ok(())
    }

    pub(crate) async fn delete_chat_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> Result<(), HabitError> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id });
        let _: bool = self.call("deleteMessage", &body).await?;
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = json!({
            "commands": [
                { "command": "start", "description": "Welcome message and usage" },
                { "command": "help", "description": "Show available commands" },
                { "command": "status", "description": "Your habit statistics" },
                { "command": "language", "description": "Choose English or Arabic" },
                { "command": "next", "description": "When the next daily message is sent" },
                { "command": "schedule", "description": "Change the daily message time" },
                { "command": "export", "description": "Download your entries as CSV" },
                { "command": "test", "description": "Send a test message" },
            ]
        });

        match self.call::<bool>("setMyCommands", &commands).await {
            Ok(_) => info!("registered Telegram bot commands"),
            Err(e) => warn!("failed to register Telegram bot commands: {e}"),
        }
    }
}

/// Check the HTTP status and the `ok` flag, then return `result`.
async fn read_result<T: DeserializeOwned>(
    method: &str,
    resp: reqwest::Response,
) -> Result<T, HabitError> {
    let status = resp.status();
    if !status.is_success() {
        let error_text = resp.text().await.unwrap_or_default();
        return Err(HabitError::Channel(format!(
            "telegram {method} got {status}: {error_text}"
        )));
    }

    let body: TgResponse<T> = resp
        .json()
        .await
        .map_err(|e| HabitError::Channel(format!("telegram {method} parse failed: {e}")))?;

    if !body.ok {
        return Err(HabitError::Channel(format!(
            "telegram {method} rejected: {}",
            body.description.unwrap_or_default()
        )));
    }

    body.result
        .ok_or_else(|| HabitError::Channel(format!("telegram {method} returned no result")))
}

/// Bot API `InlineKeyboardMarkup` for a keyboard.
pub(crate) fn keyboard_markup(keyboard: &InlineKeyboard) -> Value {
    let rows: Vec<Vec<Value>> = keyboard
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| json!({ "text": b.text, "callback_data": b.callback_data }))
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}
