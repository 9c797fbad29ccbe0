//! /export: the sender's entries as a CSV document.

use super::{CommandContext, Reply};
use crate::i18n::Category;
use habit_core::{error::HabitError, language::Language, message::Document};
use habit_memory::HabitEntry;
use tracing::info;

const CSV_HEADER: &str = "id,entry_date,created_at,notes";

pub(super) async fn handle_export(
    ctx: &CommandContext<'_>,
    lang: Language,
) -> Result<Option<Reply>, HabitError> {
    let entries = ctx.store.list_entries(ctx.sender_id).await?;
    if entries.is_empty() {
        return Ok(Some(Reply::text(ctx.locales.text(
            lang,
            Category::General,
            "export_empty",
            &[],
        ))));
    }

    let document = Document {
        filename: format!("habit_entries_{}.csv", ctx.store.today().format("%Y%m%d")),
        data: entries_csv(&entries).into_bytes(),
        caption: ctx
            .locales
            .text(lang, Category::General, "export_caption", &[]),
    };
    ctx.channel.send_document(ctx.chat_id, document).await?;
    info!(
        "exported {} entries for user {}",
        entries.len(),
        ctx.sender_id
    );
    Ok(None)
}

pub(super) fn entries_csv(entries: &[HabitEntry]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for entry in entries {
        out.push_str(&format!(
            "{},{},{},{}\n",
            entry.id,
            entry.entry_date,
            entry.created_at.to_rfc3339(),
            csv_field(entry.notes.as_deref().unwrap_or_default()),
        ));
    }
    out
}

/// Quote a field if it contains a separator, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
