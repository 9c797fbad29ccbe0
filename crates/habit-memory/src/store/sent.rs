//! Rolling log of outgoing messages.

use super::Store;
use chrono::{DateTime, Utc};
use habit_core::error::HabitError;
use serde::Serialize;
use tracing::debug;

/// Rows kept in the log; older ones are pruned on insert.
pub const SENT_LOG_LIMIT: i64 = 100;

/// Characters of message text kept per row.
const PREVIEW_CHARS: usize = 100;

/// One logged outgoing message.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SentMessage {
    pub id: i64,
    pub chat_id: i64,
    /// First characters of the text, with `...` when cut.
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

impl Store {
    /// Log a message sent to `chat_id`, keeping only the newest rows.
    pub async fn log_sent_message(&self, chat_id: i64, text: &str) -> Result<(), HabitError> {
        let mut conn = self.conn().await?;

        sqlx::query("INSERT INTO sent_messages (chat_id, message, sent_at) VALUES (?, ?, ?)")
            .bind(chat_id)
            .bind(preview(text))
            .bind(Utc::now())
            .execute(&mut *conn)
            .await
            .map_err(|e| HabitError::Storage(format!("log sent message failed: {e}")))?;

        let pruned = sqlx::query(
            "DELETE FROM sent_messages WHERE id NOT IN \
             (SELECT id FROM sent_messages ORDER BY id DESC LIMIT ?)",
        )
        .bind(SENT_LOG_LIMIT)
        .execute(&mut *conn)
        .await
        .map_err(|e| HabitError::Storage(format!("prune sent messages failed: {e}")))?
        .rows_affected();

        if pruned > 0 {
            debug!("pruned {pruned} old sent message(s)");
        }
        Ok(())
    }

    /// The most recent logged messages, newest first.
    pub async fn recent_sent_messages(&self, limit: i64) -> Result<Vec<SentMessage>, HabitError> {
        let mut conn = self.conn().await?;
        sqlx::query_as::<_, SentMessage>(
            "SELECT id, chat_id, message, sent_at FROM sent_messages ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| HabitError::Storage(format!("query sent messages failed: {e}")))
    }
}
