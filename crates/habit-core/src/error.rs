use thiserror::Error;

/// Top-level error type for habitbot.
#[derive(Debug, Error)]
pub enum HabitError {
    /// Missing or invalid settings. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),

    /// Connection or query failure in the persistence layer.
    #[error("storage error: {0}")]
    Storage(String),

    /// Transport send/receive failure.
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
