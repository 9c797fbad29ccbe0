mod commands;
mod gateway;
mod i18n;
mod scheduler;
#[cfg(test)]
mod testing;

use chrono::Utc;
use clap::{Parser, Subcommand};
use habit_channels::telegram::TelegramChannel;
use habit_core::{
    config::{self, shellexpand, Config},
    traits::Channel,
};
use habit_memory::Store;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use gateway::{DailyMessage, Gateway};
use i18n::{install_bundled_locales, Locales};
use scheduler::{format_run_time, next_run_time, Notifier, Scheduler, SchedulerSettings};

#[derive(Parser)]
#[command(
    name = "habitbot",
    version,
    about = "Habit awareness bot for Telegram"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Show the effective configuration and check it.
    Status,
    /// Print when the next daily message is due.
    Next,
    /// Write a default config file.
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => {
            let cfg = load_config(&cli.config)?;
            cfg.validate()?;

            let log_dir = Path::new(&shellexpand(&cfg.bot.data_dir)).join("logs");
            let _guard = init_tracing(&cfg.bot.log_level, Some(log_dir));
            start(cfg).await?;
        }
        Commands::Status => {
            let _guard = init_tracing("warn", None);
            let cfg = load_config(&cli.config)?;
            print_status(&cli.config, &cfg).await?;
        }
        Commands::Next => {
            let _guard = init_tracing("warn", None);
            let cfg = load_config(&cli.config)?;
            let settings = SchedulerSettings::from_config(&cfg.schedule)?;
            let next = next_run_time(settings.fire_time, settings.tz, Utc::now());
            println!("{}", format_run_time(&next));
        }
        Commands::Init => {
            if config::write_default(&cli.config)? {
                println!("Wrote default configuration to {}", cli.config);
                println!("Set telegram.bot_token and telegram.chat_id, then run: habitbot start");
            } else {
                println!("{} already exists, leaving it untouched", cli.config);
            }
        }
    }

    Ok(())
}

/// Config file plus environment overrides.
fn load_config(path: &str) -> anyhow::Result<Config> {
    let mut cfg = config::load(path)?;
    cfg.apply_env_overrides()?;
    Ok(cfg)
}

/// Log to stdout, and to `{log_dir}/habitbot.log` when given.
///
/// `RUST_LOG` takes precedence over `default_level`. The returned guard
/// flushes the file writer on drop.
fn init_tracing(default_level: &str, log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file = log_dir.and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        Builder::new()
            .rotation(Rotation::NEVER)
            .filename_prefix("habitbot")
            .filename_suffix("log")
            .build(&dir)
            .map_err(|e| eprintln!("file logging disabled: {e}"))
            .ok()
    });

    let (file_layer, guard) = match file {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    guard
}

/// Wire the store, channel, scheduler and gateway, then run until shutdown.
async fn start(cfg: Config) -> anyhow::Result<()> {
    info!("{} starting", cfg.bot.name);

    install_bundled_locales(&cfg.bot.data_dir);
    let locales = Arc::new(Locales::load(&cfg.bot.data_dir));

    let settings = SchedulerSettings::from_config(&cfg.schedule)?;
    let store = Store::new(&cfg.memory, settings.tz).await?;

    let telegram = TelegramChannel::new(cfg.telegram.clone());
    telegram
        .get_me()
        .await
        .map_err(|e| anyhow::anyhow!("Telegram connection check failed: {e}"))?;
    let channel: Arc<dyn Channel> = Arc::new(telegram);

    let chat_id = cfg.telegram.chat_id;
    let job = Arc::new(DailyMessage::new(
        channel.clone(),
        store.clone(),
        locales.clone(),
        chat_id,
        settings.tz,
        cfg.schedule.include_date,
    ));
    let notifier = Notifier::new(channel.clone(), chat_id, locales.clone());
    let scheduler = Scheduler::new(settings, job, notifier);

    let gw = Gateway::new(channel, store, locales, scheduler, &cfg.telegram);
    gw.run().await
}

async fn print_status(path: &str, cfg: &Config) -> anyhow::Result<()> {
    println!("habitbot status\n");
    println!("Config:     {path}");
    println!("Data dir:   {}", shellexpand(&cfg.bot.data_dir));

    let token = if cfg.telegram.bot_token.trim().is_empty() {
        "missing"
    } else {
        "configured"
    };
    println!("Bot token:  {token}");
    println!("Chat id:    {}", cfg.telegram.chat_id);
    if !cfg.telegram.allowed_users.is_empty() {
        println!("Allowed:    {:?}", cfg.telegram.allowed_users);
    }

    println!(
        "Schedule:   {} ({})",
        cfg.schedule.time, cfg.schedule.timezone
    );
    if let Ok(settings) = SchedulerSettings::from_config(&cfg.schedule) {
        let next = next_run_time(settings.fire_time, settings.tz, Utc::now());
        println!("Next run:   {}", format_run_time(&next));
    }

    let db = cfg.memory.db_file();
    if Path::new(&db).exists() {
        println!("Database:   {db}");
        match Store::new(&cfg.memory, chrono_tz::UTC).await {
            Ok(store) => {
                match store.recent_sent_messages(1).await {
                    Ok(sent) => match sent.first() {
                        Some(last) => println!(
                            "Last sent:  {} to {}: {}",
                            last.sent_at.format("%Y-%m-%d %H:%M UTC"),
                            last.chat_id,
                            last.message.lines().next().unwrap_or_default()
                        ),
                        None => println!("Last sent:  nothing yet"),
                    },
                    Err(e) => println!("Last sent:  unavailable ({e})"),
                }
                store.close().await;
            }
            Err(e) => println!("Database:   cannot open ({e})"),
        }
    } else {
        println!("Database:   {db} (not created yet)");
    }
    println!();

    match cfg.validate() {
        Ok(()) => println!("Configuration OK"),
        Err(e) => anyhow::bail!("{e}"),
    }
    Ok(())
}
