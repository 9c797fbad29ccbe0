//! Habit recording for free-text messages.

use super::status::{relative_day, RelativeDayKeys};
use super::{CommandContext, Reply};
use crate::i18n::Category;
use habit_core::language::Language;
use tracing::{error, info};

const TRACKING_DAYS: RelativeDayKeys = RelativeDayKeys {
    today: "was_today",
    yesterday: "was_yesterday",
    days_ago: "was_days_ago",
};

/// Record a habit occurrence for the sender and reply with the updated stats.
pub async fn handle_habit(ctx: &CommandContext<'_>, lang: Language) -> Reply {
    let t = |key: &str, params: &[(&str, &str)]| {
        ctx.locales.text(lang, Category::Tracking, key, params)
    };

    let entry = match ctx.store.record_entry(ctx.sender_id, None).await {
        Ok(entry) => entry,
        Err(e) => {
            error!("failed to record entry for {}: {e}", ctx.sender_id);
            return Reply::text(t("error_recording", &[]));
        }
    };
    info!("recorded entry {} for user {}", entry.id, ctx.sender_id);

    let stats = ctx.store.get_user_stats(ctx.sender_id).await;

    let mut text = t("entry_recorded", &[]);
    if let Some(last) = stats.as_ref().and_then(|s| s.last_entry.as_ref()) {
        text.push_str(&t("last_time", &[("date", &last.entry_date.to_string())]));
        if let Some(days) = stats.as_ref().and_then(|s| s.days_since_last) {
            text.push_str(&relative_day(
                ctx.locales,
                lang,
                Category::Tracking,
                &TRACKING_DAYS,
                days,
            ));
        }
    }
    let total = stats.as_ref().map_or(0, |s| s.total_count);
    text.push_str(&t("total_times", &[("count", &total.to_string())]));
    text.push_str(&t("awareness_message", &[]));
    Reply::text(text)
}
