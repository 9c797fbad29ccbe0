//! Settings commands: /language (and its button callback), /schedule.

use super::{CommandContext, Reply};
use crate::i18n::{Category, Locales};
use habit_core::{
    language::Language,
    message::{InlineButton, InlineKeyboard},
};
use habit_memory::Store;
use tracing::{info, warn};

/// Callback data prefix of the language buttons.
const LANG_PREFIX: &str = "lang_";

/// One row with a button per supported language.
fn language_keyboard() -> InlineKeyboard {
    let button = |text: &str, lang: Language| InlineButton {
        text: text.to_string(),
        callback_data: format!("{LANG_PREFIX}{}", lang.as_str()),
    };
    InlineKeyboard {
        rows: vec![vec![
            button("🇺🇸 English", Language::English),
            button("🇸🇦 العربية", Language::Arabic),
        ]],
    }
}

pub(super) fn handle_language(ctx: &CommandContext<'_>, lang: Language) -> Reply {
    Reply {
        text: ctx.locales.text(lang, Category::Language, "select", &[]),
        keyboard: Some(language_keyboard()),
    }
}

/// Apply a language button press. Returns the confirmation text in the new
/// language, or `invalid_choice` in the current one for unknown data.
///
/// A failed write still confirms the chosen language for this reply.
pub async fn handle_language_choice(
    store: &Store,
    locales: &Locales,
    user_id: i64,
    data: &str,
) -> String {
    let choice = data
        .strip_prefix(LANG_PREFIX)
        .and_then(|code| code.parse::<Language>().ok());

    let Some(choice) = choice else {
        warn!("unknown language callback '{data}' from {user_id}");
        let lang = super::resolve_lang(store, user_id).await;
        return locales.text(lang, Category::Language, "invalid_choice", &[]);
    };

    let lang = match store.set_user_language(user_id, choice).await {
        Ok(lang) => {
            info!("user {user_id} switched language to {lang}");
            lang
        }
        Err(e) => {
            warn!("could not save language {choice} for user {user_id}: {e}");
            choice
        }
    };
    let key = match lang {
        Language::English => "changed_to_english",
        Language::Arabic => "changed_to_arabic",
    };
    locales.text(lang, Category::Language, key, &[])
}

pub(super) async fn handle_schedule(ctx: &CommandContext<'_>, lang: Language) -> Reply {
    let t = |key: &str, params: &[(&str, &str)]| ctx.locales.text(lang, Category::General, key, params);

    if !ctx.is_owner() {
        warn!("user {} tried to change the schedule", ctx.sender_id);
        return Reply::text(t("owner_only", &[]));
    }
    let Some(arg) = ctx.text.split_whitespace().nth(1) else {
        return Reply::text(t("schedule_usage", &[]));
    };

    match ctx.scheduler.reschedule(arg).await {
        Ok(time) => Reply::text(t(
            "schedule_updated",
            &[
                ("time", &time.format("%H:%M").to_string()),
                ("timezone", ctx.scheduler.timezone().name()),
            ],
        )),
        Err(e) => {
            warn!("rejected schedule '{arg}': {e}");
            Reply::text(t("schedule_invalid", &[("time", arg)]))
        }
    }
}
