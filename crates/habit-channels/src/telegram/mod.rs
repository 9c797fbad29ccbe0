//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates` and `sendMessage` for responses.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
mod send;
pub(crate) mod types;


use habit_core::{config::TelegramConfig, error::HabitError};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::info;
use types::{TgResponse, TgUser};

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
    /// Flipped by `stop()` to end the polling task.
    shutdown: watch::Sender<bool>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        let base_url = format!("https://api.telegram.org/bot{}", config.bot_token);
        Self::with_base_url(config, base_url)
    }

    pub(crate) fn with_base_url(config: TelegramConfig, base_url: String) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
            shutdown,
        }
    }

    /// Verify the token by calling `getMe`. Returns the bot's display name.
    pub async fn get_me(&self) -> Result<String, HabitError> {
        let url = format!("{}/getMe", self.base_url);
        let resp: TgResponse<TgUser> = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| HabitError::Channel(format!("telegram getMe failed: {e}")))?
            .json()
            .await
            .map_err(|e| HabitError::Channel(format!("telegram getMe parse failed: {e}")))?;

        if !resp.ok {
            return Err(HabitError::Channel(format!(
                "telegram getMe rejected: {}",
                resp.description.unwrap_or_default()
            )));
        }

        let me = resp
            .result
            .ok_or_else(|| HabitError::Channel("telegram getMe returned no user".into()))?;
        let name = me.display_name();
        info!("Bot connected: {name}");
        Ok(name)
    }
}
