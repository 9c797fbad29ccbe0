//! SQLite-backed habit store.
//!
//! Split into focused submodules:
//! - `entries`: habit entry recording, counts, and derived stats
//! - `users`: per-user language preference
//! - `sent`: rolling log of messages the bot pushed to the owner chat
//!
//! The store holds a single connection behind a mutex. Every operation
//! pings it first and reconnects once if the ping fails.

mod entries;
mod sent;
mod users;

pub use entries::{HabitEntry, UserStats};
pub use sent::{SentMessage, SENT_LOG_LIMIT};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use habit_core::{config::MemoryConfig, error::HabitError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{ConnectOptions, Connection};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{info, warn};

/// Persistent habit store backed by SQLite.
#[derive(Clone)]
pub struct Store {
    options: SqliteConnectOptions,
    conn: Arc<Mutex<Option<SqliteConnection>>>,
    /// Timezone that defines "today" for entry dates.
    tz: Tz,
    /// Makes the next liveness ping fail.
    #[cfg(test)]
    fail_ping: Arc<std::sync::atomic::AtomicBool>,
}

impl Store {
    /// Open the database, creating the file and schema on first use.
    pub async fn new(config: &MemoryConfig, tz: Tz) -> Result<Self, HabitError> {
        let db_path = config.db_file();

        // Ensure parent directory exists.
        if let Some(parent) = Path::new(&db_path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| HabitError::Storage(format!("failed to create data dir: {e}")))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| HabitError::Storage(format!("invalid db path: {e}")))?
            .create_if_missing(true);

        let store = Self::open(options, tz).await?;
        info!("Habit store initialized at {db_path}");
        Ok(store)
    }

    async fn open(options: SqliteConnectOptions, tz: Tz) -> Result<Self, HabitError> {
        let mut conn = options
            .connect()
            .await
            .map_err(|e| HabitError::Storage(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&mut conn).await?;

        Ok(Self {
            options,
            conn: Arc::new(Mutex::new(Some(conn))),
            tz,
            #[cfg(test)]
            fail_ping: Arc::default(),
        })
    }

    /// Lock the connection, verifying it is alive.
    ///
    /// A missing connection is opened; a connection that fails its ping is
    /// replaced exactly once. A failed reconnect is a storage error.
    async fn conn(&self) -> Result<MappedMutexGuard<'_, SqliteConnection>, HabitError> {
        let mut guard = self.conn.lock().await;

        let alive = match guard.as_mut() {
            Some(conn) => match self.ping(conn).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("database ping failed, reconnecting: {e}");
                    false
                }
            },
            None => false,
        };

        if !alive {
            // Drop the dead handle without a graceful close; it may hang.
            guard.take();
            let fresh = self
                .options
                .connect()
                .await
                .map_err(|e| HabitError::Storage(format!("database reconnect failed: {e}")))?;
            *guard = Some(fresh);
            info!("database connection established");
        }

        MutexGuard::try_map(guard, |c| c.as_mut())
            .map_err(|_| HabitError::Storage("database connection unavailable".into()))
    }

    async fn ping(&self, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
        #[cfg(test)]
        if self
            .fail_ping
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(sqlx::Error::WorkerCrashed);
        }
        conn.ping().await
    }

    /// Close the connection. The next operation reopens it.
    pub async fn close(&self) {
        if let Some(conn) = self.conn.lock().await.take() {
            if let Err(e) = conn.close().await {
                warn!("error closing database: {e}");
            }
        }
    }

    /// Today's date in the store's timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(conn: &mut SqliteConnection) -> Result<(), HabitError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(&mut *conn)
        .await
        .map_err(|e| HabitError::Storage(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[
            ("001_init", include_str!("../../migrations/001_init.sql")),
            ("002_sent_messages", include_str!("../../migrations/002_sent_messages.sql")),
        ];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(|e| {
                        HabitError::Storage(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| HabitError::Storage(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    HabitError::Storage(format!("failed to record migration {name}: {e}"))
                })?;
        }
        Ok(())
    }
}
