//! Long-polling update loop and Channel trait implementation.

use super::types::{TgResponse, TgUpdate};
use super::TelegramChannel;
use async_trait::async_trait;
use habit_core::{
    error::HabitError,
    message::{CallbackQuery, Document, IncomingMessage, MessageHandle, OutgoingMessage, Update},
    traits::Channel,
};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<Update>, HabitError> {
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let allowed_users = self.config.allowed_users.clone();
        let last_update_id = self.last_update_id.clone();
        let mut shutdown = self.shutdown.subscribe();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let offset = last_update_id.lock().await.map(|id| id + 1);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let request = client.get(&url).timeout(Duration::from_secs(35)).send();
                let resp = tokio::select! {
                    r = request => r,
                    _ = shutdown.changed() => {
                        info!("telegram polling stopped");
                        return;
                    }
                };

                let body: Result<TgResponse<Vec<TgUpdate>>, String> = match resp {
                    Ok(r) => r.json().await.map_err(|e| format!("parse error: {e}")),
                    Err(e) => Err(format!("poll error: {e}")),
                };

                let updates = match body {
                    Ok(b) if b.ok => b.result.unwrap_or_default(),
                    Ok(b) => {
                        error!(
                            "telegram API error (retry in {backoff_secs}s): {}",
                            b.description.unwrap_or_default()
                        );
                        if !backoff(&mut backoff_secs, &mut shutdown).await {
                            info!("telegram polling stopped");
                            return;
                        }
                        continue;
                    }
                    Err(e) => {
                        error!("telegram {e} (retry in {backoff_secs}s)");
                        if !backoff(&mut backoff_secs, &mut shutdown).await {
                            info!("telegram polling stopped");
                            return;
                        }
                        continue;
                    }
                };

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for tg_update in updates {
                    let Some(update) = convert_update(tg_update, &allowed_users) else {
                        continue;
                    };
                    if tx.send(update).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<MessageHandle, HabitError> {
        self.send_text(&message).await
    }

    async fn send_document(&self, chat_id: i64, document: Document) -> Result<(), HabitError> {
        self.send_document_bytes(chat_id, document).await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), HabitError> {
        self.answer_callback_query(callback_id, text).await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), HabitError> {
        self.delete_chat_message(chat_id, message_id).await
    }

    async fn stop(&self) -> Result<(), HabitError> {
        self.shutdown.send_replace(true);
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Wait out the current backoff, doubling it up to 60 s.
///
/// Returns `false` when shutdown is signalled during the wait.
pub(crate) async fn backoff(
    backoff_secs: &mut u64,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(*backoff_secs)) => {
            *backoff_secs = (*backoff_secs * 2).min(60);
            true
        }
        _ = shutdown.changed() => false,
    }
}

/// Map a raw Telegram update onto a channel update.
///
/// Returns `None` for updates we do not handle, bot senders, and users
/// outside a non-empty allow-list.
pub(crate) fn convert_update(update: TgUpdate, allowed_users: &[i64]) -> Option<Update> {
    let authorized = |user_id: i64| {
        let ok = allowed_users.is_empty() || allowed_users.contains(&user_id);
        if !ok {
            warn!("ignoring update from unauthorized user {user_id}");
        }
        ok
    };

    if let Some(cb) = update.callback_query {
        if !authorized(cb.from.id) {
            return None;
        }
        let (chat_id, message_id) = match cb.message {
            Some(ref m) => (m.chat.id, Some(m.message_id)),
            // Old keyboards carry no message; answer in the user's private chat.
            None => (cb.from.id, None),
        };
        return Some(Update::Callback(CallbackQuery {
            id: cb.id,
            sender_id: cb.from.id,
            chat_id,
            message_id,
            data: cb.data.unwrap_or_default(),
        }));
    }

    let msg = update.message?;
    let text = msg.text?;
    let user = msg.from?;

    if user.is_bot {
        debug!("telegram: ignoring message from bot {}", user.id);
        return None;
    }
    if !authorized(user.id) {
        return None;
    }

    debug!(
        "telegram: message in {} chat {}",
        if msg.chat.chat_type.is_empty() { "unknown" } else { msg.chat.chat_type.as_str() },
        msg.chat.id
    );

    Some(Update::Message(IncomingMessage {
        id: Uuid::new_v4(),
        channel: "telegram".to_string(),
        sender_id: user.id,
        sender_name: Some(user.display_name()),
        chat_id: msg.chat.id,
        message_id: msg.message_id,
        text,
        timestamp: chrono::Utc::now(),
    }))
}
