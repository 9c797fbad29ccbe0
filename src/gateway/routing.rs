//! Per-update routing: commands, habit reports, language buttons.

use super::Gateway;
use crate::commands::{self, Command, CommandContext, Reply};
use crate::i18n::is_habit_message;
use habit_core::{
    error::HabitError,
    message::{CallbackQuery, IncomingMessage, OutgoingMessage, Update},
};
use tracing::{debug, error, info, warn};

/// Shown on the button when a language change fails.
const CALLBACK_ERROR: &str = "❌ Error changing language";

impl Gateway {
    pub(super) async fn handle_update(&self, update: Update) {
        match update {
            Update::Message(incoming) => self.handle_message(incoming).await,
            Update::Callback(query) => self.handle_callback(query).await,
        }
    }

    fn command_context<'a>(&'a self, incoming: &'a IncomingMessage) -> CommandContext<'a> {
        CommandContext {
            store: &self.store,
            locales: &self.locales,
            scheduler: &self.scheduler,
            channel: self.channel.as_ref(),
            owner_chat_id: self.owner_chat_id,
            admins: &self.admins,
            sender_id: incoming.sender_id,
            chat_id: incoming.chat_id,
            text: &incoming.text,
        }
    }

    async fn handle_message(&self, incoming: IncomingMessage) {
        let ctx = self.command_context(&incoming);

        let reply = match Command::parse(&incoming.text) {
            Some(cmd) => {
                info!("{cmd:?} from {}", incoming.sender_id);
                match commands::handle(cmd, &ctx).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!("{cmd:?} from {} failed: {e}", incoming.sender_id);
                        let lang = commands::resolve_lang(&self.store, incoming.sender_id).await;
                        Some(commands::error_reply(&self.locales, lang))
                    }
                }
            }
            None => {
                let lang = commands::resolve_lang(&self.store, incoming.sender_id).await;
                if !is_habit_message(&incoming.text, lang) {
                    debug!("ignoring message from {}", incoming.sender_id);
                    return;
                }
                Some(commands::handle_habit(&ctx, lang).await)
            }
        };

        if let Some(reply) = reply {
            self.send_reply(&incoming, reply).await;
        }
    }

    async fn send_reply(&self, incoming: &IncomingMessage, reply: Reply) {
        let message = OutgoingMessage {
            chat_id: incoming.chat_id,
            text: reply.text,
            reply_to: Some(incoming.message_id),
            keyboard: reply.keyboard,
        };
        if let Err(e) = self.channel.send(message).await {
            error!("failed to reply to {}: {e}", incoming.sender_id);
        }
    }

    async fn handle_callback(&self, query: CallbackQuery) {
        if let Err(e) = self.apply_language_callback(&query).await {
            error!("language callback from {} failed: {e}", query.sender_id);
            if let Err(e) = self
                .channel
                .answer_callback(&query.id, Some(CALLBACK_ERROR))
                .await
            {
                warn!("failed to answer callback {}: {e}", query.id);
            }
        }
    }

    /// Update the language, replace the prompt with a confirmation, then
    /// acknowledge the button.
    async fn apply_language_callback(&self, query: &CallbackQuery) -> Result<(), HabitError> {
        let text = commands::handle_language_choice(
            &self.store,
            &self.locales,
            query.sender_id,
            &query.data,
        )
        .await;

        if let Some(message_id) = query.message_id {
            if let Err(e) = self.channel.delete_message(query.chat_id, message_id).await {
                debug!("could not delete language prompt: {e}");
            }
        }

        self.channel
            .send(OutgoingMessage::text(query.chat_id, text))
            .await?;
        self.channel.answer_callback(&query.id, None).await
    }
}
