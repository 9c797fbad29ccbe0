mod defaults;


use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::HabitError;
use defaults::*;

/// Commented default configuration, written by `habitbot init`.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../../../config.example.toml");

/// Top-level habitbot configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Telegram bot config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Chat that receives the daily message and scheduler notices.
    #[serde(default)]
    pub chat_id: i64,
    /// Allowed Telegram user IDs. Empty = allow all.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

/// Daily message schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Wall-clock fire time, `HH:MM` (24-hour).
    #[serde(default = "default_schedule_time")]
    pub time: String,
    /// IANA timezone name.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Prefix the daily message with the date and an awareness line.
    #[serde(default = "default_true")]
    pub include_date: bool,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: default_schedule_time(),
            timezone: default_timezone(),
            include_date: true,
            retry_attempts: default_retry_attempts(),
            retry_delay_secs: default_retry_delay(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ScheduleConfig {
    /// Parsed fire time.
    pub fn fire_time(&self) -> Result<NaiveTime, HabitError> {
        parse_fire_time(&self.time)
    }

    /// Parsed timezone.
    pub fn tz(&self) -> Result<Tz, HabitError> {
        parse_timezone(&self.timezone)
    }
}

/// Persistence config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// SQLite file path or `sqlite:` URL.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl MemoryConfig {
    /// Filesystem path of the database, with any `sqlite:` scheme stripped
    /// and `~` expanded.
    pub fn db_file(&self) -> String {
        let raw = self.db_path.trim();
        let path = raw
            .strip_prefix("sqlite://")
            .or_else(|| raw.strip_prefix("sqlite:"))
            .unwrap_or(raw);
        shellexpand(path)
    }
}

impl Config {
    /// Apply `TELEGRAM_BOT_TOKEN`, `TELEGRAM_CHAT_ID` and `DATABASE_URL`.
    pub fn apply_env_overrides(&mut self) -> Result<(), HabitError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), HabitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.telegram.bot_token = token.trim().to_string();
        }
        if let Some(chat) = lookup("TELEGRAM_CHAT_ID").filter(|v| !v.trim().is_empty()) {
            self.telegram.chat_id = chat.trim().parse().map_err(|e| {
                HabitError::Config(format!("TELEGRAM_CHAT_ID '{chat}' is not an integer: {e}"))
            })?;
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.memory.db_path = url.trim().to_string();
        }
        Ok(())
    }

    /// Check every required setting, reporting all problems at once.
    pub fn validate(&self) -> Result<(), HabitError> {
        let mut errors = Vec::new();

        if self.telegram.bot_token.trim().is_empty() {
            errors.push("bot token is required".to_string());
        }
        if self.telegram.chat_id == 0 {
            errors.push("chat id is required".to_string());
        }
        if let Err(e) = self.schedule.fire_time() {
            errors.push(strip_prefix(e));
        }
        if let Err(e) = self.schedule.tz() {
            errors.push(strip_prefix(e));
        }
        if self.schedule.retry_attempts < 1 {
            errors.push("retry_attempts must be at least 1".to_string());
        }
        if self.schedule.poll_interval_secs == 0 {
            errors.push("poll_interval_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(HabitError::Config(format!(
                "validation failed: {}",
                errors.join("; ")
            )))
        }
    }
}

fn strip_prefix(e: HabitError) -> String {
    match e {
        HabitError::Config(msg) => msg,
        other => other.to_string(),
    }
}

/// Parse a 24-hour `HH:MM` wall-clock time.
pub fn parse_fire_time(value: &str) -> Result<NaiveTime, HabitError> {
    let invalid = || HabitError::Config(format!("schedule time '{value}' must be HH:MM (24-hour)"));

    let (h, m) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Parse an IANA timezone name.
pub fn parse_timezone(value: &str) -> Result<Tz, HabitError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|e| HabitError::Config(format!("unknown timezone '{value}': {e}")))
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, HabitError> {
    let path = Path::new(path);
    if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| HabitError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| HabitError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}

/// Write the default config to `path` unless a file already exists.
///
/// Returns `true` if a file was written.
pub fn write_default(path: &str) -> Result<bool, HabitError> {
    let path = Path::new(path);
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG_TOML)?;
    info!("Default configuration written to {}", path.display());
    Ok(true)
}
