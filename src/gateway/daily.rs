//! The daily message job.

use crate::commands::resolve_lang;
use crate::i18n::{Category, Locales};
use crate::scheduler::Job;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use habit_core::{
    error::HabitError, language::Language, message::OutgoingMessage, traits::Channel,
};
use habit_memory::Store;
use std::sync::Arc;
use tracing::{info, warn};

/// Sends a random daily message to the owner chat, in the owner's language.
pub struct DailyMessage {
    channel: Arc<dyn Channel>,
    store: Store,
    locales: Arc<Locales>,
    chat_id: i64,
    tz: Tz,
    include_date: bool,
}

impl DailyMessage {
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Store,
        locales: Arc<Locales>,
        chat_id: i64,
        tz: Tz,
        include_date: bool,
    ) -> Self {
        Self {
            channel,
            store,
            locales,
            chat_id,
            tz,
            include_date,
        }
    }

    /// Message text as of `now`. The owner's user id is the chat id.
    pub(crate) async fn compose_at(&self, now: DateTime<Utc>) -> String {
        let lang = resolve_lang(&self.store, self.chat_id).await;
        let message = self.locales.daily_message(lang);
        if !self.include_date {
            return message;
        }

        let date = now.with_timezone(&self.tz).format("%B %d, %Y");
        let awareness = self
            .store
            .get_user_stats(self.chat_id)
            .await
            .and_then(|stats| stats.days_since_last)
            .map(|days| awareness_text(&self.locales, lang, days))
            .unwrap_or_default();
        format!("📅 {date}\n\n{message}{awareness}")
    }
}

/// Progress line for the number of days since the last entry.
pub(crate) fn awareness_text(locales: &Locales, lang: Language, days: i64) -> String {
    let days_param = days.to_string();
    let params = [("days", days_param.as_str())];
    let t = |key: &str, params: &[(&str, &str)]| locales.text(lang, Category::Awareness, key, params);
    match days {
        d if d <= 0 => t("new_opportunity", &[]),
        1 => t("one_day", &[]),
        2..=6 => t("few_days", &params),
        _ => t("many_days", &params),
    }
}

#[async_trait]
impl Job for DailyMessage {
    fn name(&self) -> &str {
        "daily message"
    }

    async fn run(&self) -> Result<(), HabitError> {
        let text = self.compose_at(Utc::now()).await;
        self.channel
            .send(OutgoingMessage::text(self.chat_id, text.clone()))
            .await?;
        info!("daily message sent to chat {}", self.chat_id);
        if let Err(e) = self.store.log_sent_message(self.chat_id, &text).await {
            warn!("failed to log sent message: {e}");
        }
        Ok(())
    }
}
