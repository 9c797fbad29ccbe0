//! Information commands: /status, /next, /test.

use super::{CommandContext, Reply};
use crate::i18n::{Category, Locales};
use crate::scheduler::format_run_time;
use habit_core::{language::Language, message::OutgoingMessage};
use tracing::{error, info, warn};

/// Keys for the "today / yesterday / N days ago" suffix of a category.
pub(super) struct RelativeDayKeys {
    pub today: &'static str,
    pub yesterday: &'static str,
    pub days_ago: &'static str,
}

pub(super) const STATUS_DAYS: RelativeDayKeys = RelativeDayKeys {
    today: "today",
    yesterday: "yesterday",
    days_ago: "days_ago",
};

pub(super) fn relative_day(
    locales: &Locales,
    lang: Language,
    category: Category,
    keys: &RelativeDayKeys,
    days: i64,
) -> String {
    match days {
        0 => locales.text(lang, category, keys.today, &[]),
        1 => locales.text(lang, category, keys.yesterday, &[]),
        n => locales.text(lang, category, keys.days_ago, &[("days", &n.to_string())]),
    }
}

pub(super) async fn handle_status(ctx: &CommandContext<'_>, lang: Language) -> Reply {
    let t = |key: &str, params: &[(&str, &str)]| ctx.locales.text(lang, Category::Status, key, params);

    let Some(stats) = ctx.store.get_user_stats(ctx.sender_id).await else {
        return Reply::text(t("error_getting_stats", &[]));
    };

    let mut text = t("title", &[]);
    match &stats.last_entry {
        Some(entry) => {
            text.push_str(&t("last_entry", &[("date", &entry.entry_date.to_string())]));
            if let Some(days) = stats.days_since_last {
                text.push_str(&relative_day(
                    ctx.locales,
                    lang,
                    Category::Status,
                    &STATUS_DAYS,
                    days,
                ));
            }
        }
        None => text.push_str(&t("no_entries", &[])),
    }
    text.push_str(&t("total_entries", &[("count", &stats.total_count.to_string())]));

    let schedule = ctx.scheduler.status().await;
    let fire_time = schedule.fire_time.format("%H:%M").to_string();
    text.push_str(&t(
        "next_reminder",
        &[("time", &fire_time), ("timezone", schedule.timezone.name())],
    ));
    Reply::text(text)
}

pub(super) fn handle_next(ctx: &CommandContext<'_>, lang: Language) -> Reply {
    let next = format_run_time(&ctx.scheduler.next_run());
    Reply::text(
        ctx.locales
            .text(lang, Category::General, "next_reminder", &[("time", &next)]),
    )
}

/// Send the test message to the owner chat and report the result.
pub(super) async fn handle_test(ctx: &CommandContext<'_>, lang: Language) -> Reply {
    let message = ctx
        .locales
        .text(lang, Category::General, "test_message", &[]);
    let key = match ctx
        .channel
        .send(OutgoingMessage::text(ctx.owner_chat_id, message.clone()))
        .await
    {
        Ok(_) => {
            info!("test message sent to chat {}", ctx.owner_chat_id);
            if let Err(e) = ctx.store.log_sent_message(ctx.owner_chat_id, &message).await {
                warn!("failed to log sent message: {e}");
            }
            "test_sent"
        }
        Err(e) => {
            error!("test message failed: {e}");
            "test_failed"
        }
    };
    Reply::text(ctx.locales.text(lang, Category::General, key, &[]))
}
