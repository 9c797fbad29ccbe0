//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Habit Awareness Bot".to_string()
}

pub fn default_data_dir() -> String {
    "~/.habitbot".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_schedule_time() -> String {
    "09:00".to_string()
}

pub fn default_timezone() -> String {
    "UTC".to_string()
}

pub fn default_retry_attempts() -> u32 {
    3
}

pub fn default_retry_delay() -> u64 {
    60
}

pub fn default_poll_interval() -> u64 {
    30
}

pub fn default_db_path() -> String {
    "~/.habitbot/data/habits.db".to_string()
}
