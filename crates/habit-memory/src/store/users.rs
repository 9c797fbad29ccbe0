//! Per-user language preference.

use super::Store;
use habit_core::{error::HabitError, language::Language};
use tracing::{debug, info};

impl Store {
    /// The user's stored language, creating the user as English if unknown.
    pub async fn get_user_language(&self, user_id: i64) -> Result<Language, HabitError> {
        let mut conn = self.conn().await?;

        let row: Option<(String,)> = sqlx::query_as("SELECT language FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| HabitError::Storage(format!("query language failed: {e}")))?;

        if let Some((code,)) = row {
            return Ok(Language::from_code_or_default(&code));
        }

        let default = Language::default();
        sqlx::query("INSERT OR IGNORE INTO users (user_id, language) VALUES (?, ?)")
            .bind(user_id)
            .bind(default.as_str())
            .execute(&mut *conn)
            .await
            .map_err(|e| HabitError::Storage(format!("create user failed: {e}")))?;
        debug!("created user {user_id} with default language");

        Ok(default)
    }

    /// Upsert the user's language. Returns the persisted value.
    pub async fn set_user_language(
        &self,
        user_id: i64,
        language: Language,
    ) -> Result<Language, HabitError> {
        let mut conn = self.conn().await?;

        sqlx::query(
            "INSERT INTO users (user_id, language) VALUES (?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET language = excluded.language, \
             updated_at = datetime('now')",
        )
        .bind(user_id)
        .bind(language.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| HabitError::Storage(format!("upsert language failed: {e}")))?;

        info!("user {user_id} language set to {language}");
        Ok(language)
    }
}
