//! Gateway: the receive loop connecting the channel, the store and the
//! scheduler.
//!
//! Updates are handled one at a time in arrival order. The scheduler runs in
//! its own task, so a slow handler never delays the daily message.

mod daily;
mod routing;

#[cfg(test)]
mod tests;

pub use daily::DailyMessage;

use crate::i18n::Locales;
use crate::scheduler::{format_run_time, Scheduler};
use habit_core::{config::TelegramConfig, traits::Channel};
use habit_memory::Store;
use std::sync::Arc;
use tracing::{info, warn};

/// The bot's event loop.
pub struct Gateway {
    pub(super) channel: Arc<dyn Channel>,
    pub(super) store: Store,
    pub(super) locales: Arc<Locales>,
    pub(super) scheduler: Scheduler,
    /// Chat that receives the daily message.
    pub(super) owner_chat_id: i64,
    /// Users allowed to use owner commands besides the owner chat.
    pub(super) admins: Vec<i64>,
}

impl Gateway {
    pub fn new(
        channel: Arc<dyn Channel>,
        store: Store,
        locales: Arc<Locales>,
        scheduler: Scheduler,
        config: &TelegramConfig,
    ) -> Self {
        Self {
            channel,
            store,
            locales,
            scheduler,
            owner_chat_id: config.chat_id,
            admins: config.allowed_users.clone(),
        }
    }

    /// Run until ctrl-c or until the channel closes, then shut down.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            "habitbot gateway running | channel: {} | owner chat: {}",
            self.channel.name(),
            self.owner_chat_id
        );

        self.scheduler.start().await;
        let schedule = self.scheduler.status().await;
        info!(
            "scheduler running: {} | next daily message: {}",
            schedule.running,
            format_run_time(&schedule.next_run)
        );

        let mut rx = match self.channel.start().await {
            Ok(rx) => rx,
            Err(e) => {
                self.shutdown().await;
                anyhow::bail!("failed to start channel {}: {e}", self.channel.name());
            }
        };
        info!("Channel started: {}", self.channel.name());

        loop {
            tokio::select! {
                update = rx.recv() => match update {
                    Some(update) => self.handle_update(update).await,
                    None => {
                        warn!("channel {} closed its update stream", self.channel.name());
                        break;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown().await;
        Ok(())
    }

    /// Stop the scheduler (bounded), the channel, then the store.
    async fn shutdown(&self) {
        info!("Shutting down...");
        self.scheduler.stop().await;
        if let Err(e) = self.channel.stop().await {
            warn!("failed to stop channel {}: {e}", self.channel.name());
        }
        self.store.close().await;
        info!("Shutdown complete.");
    }
}
