//! Bot commands and habit recording.

mod export;
mod settings;
mod status;
mod tracking;


pub use settings::handle_language_choice;
pub use tracking::handle_habit;

use crate::i18n::{Category, Locales};
use crate::scheduler::Scheduler;
use habit_core::{
    error::HabitError, language::Language, message::InlineKeyboard, traits::Channel,
};
use habit_memory::Store;
use tracing::warn;

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub store: &'a Store,
    pub locales: &'a Locales,
    pub scheduler: &'a Scheduler,
    pub channel: &'a dyn Channel,
    /// Chat that receives the daily message.
    pub owner_chat_id: i64,
    /// Users allowed to change the schedule besides the owner chat.
    pub admins: &'a [i64],
    pub sender_id: i64,
    pub chat_id: i64,
    pub text: &'a str,
}

impl CommandContext<'_> {
    fn is_owner(&self) -> bool {
        self.sender_id == self.owner_chat_id || self.admins.contains(&self.sender_id)
    }
}

/// A reply to send back in the originating chat.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Language,
    Next,
    Schedule,
    Export,
    Test,
}

impl Command {
    /// Parse a command from message text. Returns `None` for plain text and
    /// unknown `/` prefixes.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        // Strip @botname suffix (e.g. "/help@habit_bot" → "/help").
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd.to_lowercase().as_str() {
            "/start" | "/help" => Some(Self::Help),
            "/status" | "/stats" => Some(Self::Status),
            "/language" | "/lang" => Some(Self::Language),
            "/next" => Some(Self::Next),
            "/schedule" => Some(Self::Schedule),
            "/export" => Some(Self::Export),
            "/test" => Some(Self::Test),
            _ => None,
        }
    }
}

/// Resolve the user's language, defaulting to English if the store fails.
pub async fn resolve_lang(store: &Store, user_id: i64) -> Language {
    store
        .get_user_language(user_id)
        .await
        .unwrap_or_else(|e| {
            warn!("language lookup for {user_id} failed, using English: {e}");
            Language::default()
        })
}

/// Handle a command. `Ok(None)` means the command already delivered its
/// output (e.g. a document).
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> Result<Option<Reply>, HabitError> {
    let lang = resolve_lang(ctx.store, ctx.sender_id).await;
    let reply = match cmd {
        Command::Help => Reply::text(ctx.locales.text(lang, Category::Commands, "welcome", &[])),
        Command::Status => status::handle_status(ctx, lang).await,
        Command::Language => settings::handle_language(ctx, lang),
        Command::Next => status::handle_next(ctx, lang),
        Command::Schedule => settings::handle_schedule(ctx, lang).await,
        Command::Export => return export::handle_export(ctx, lang).await,
        Command::Test => status::handle_test(ctx, lang).await,
    };
    Ok(Some(reply))
}

/// Localized generic error reply.
pub fn error_reply(locales: &Locales, lang: Language) -> Reply {
    Reply::text(locales.text(lang, Category::General, "error", &[]))
}
