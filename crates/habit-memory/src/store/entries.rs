//! Habit entries and derived statistics.

use super::Store;
use chrono::{DateTime, NaiveDate, Utc};
use habit_core::error::HabitError;
use serde::Serialize;
use tracing::{debug, warn};

/// One reported habit occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct HabitEntry {
    pub id: i64,
    pub user_id: i64,
    /// Calendar day of the occurrence in the configured timezone.
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Stats derived from a user's entries. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub last_entry: Option<HabitEntry>,
    pub total_count: i64,
    /// Whole days between the last entry and today; `None` with no entries.
    pub days_since_last: Option<i64>,
}

const ENTRY_COLUMNS: &str = "id, user_id, entry_date, created_at, notes";

impl Store {
    /// Record a habit occurrence dated today.
    pub async fn record_entry(
        &self,
        user_id: i64,
        notes: Option<&str>,
    ) -> Result<HabitEntry, HabitError> {
        let entry = self.insert_entry(user_id, self.today(), notes).await?;
        debug!("recorded habit entry {} for user {user_id}", entry.id);
        Ok(entry)
    }

    pub(super) async fn insert_entry(
        &self,
        user_id: i64,
        entry_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<HabitEntry, HabitError> {
        let sql = format!(
            "INSERT INTO habit_entries (user_id, entry_date, created_at, notes) \
             VALUES (?, ?, ?, ?) RETURNING {ENTRY_COLUMNS}"
        );
        let mut conn = self.conn().await?;
        let entry = sqlx::query_as::<_, HabitEntry>(&sql)
            .bind(user_id)
            .bind(entry_date)
            .bind(Utc::now())
            .bind(notes)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| HabitError::Storage(format!("insert entry failed: {e}")))?;
        Ok(entry)
    }

    /// Most recent entry by date, then insertion time.
    pub async fn get_last_entry(&self, user_id: i64) -> Result<Option<HabitEntry>, HabitError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM habit_entries WHERE user_id = ? \
             ORDER BY entry_date DESC, created_at DESC, id DESC LIMIT 1"
        );
        let mut conn = self.conn().await?;
        let entry = sqlx::query_as::<_, HabitEntry>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| HabitError::Storage(format!("query last entry failed: {e}")))?;
        Ok(entry)
    }

    /// All of a user's entries, oldest first.
    pub async fn list_entries(&self, user_id: i64) -> Result<Vec<HabitEntry>, HabitError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM habit_entries WHERE user_id = ? \
             ORDER BY entry_date ASC, created_at ASC, id ASC"
        );
        let mut conn = self.conn().await?;
        let entries = sqlx::query_as::<_, HabitEntry>(&sql)
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| HabitError::Storage(format!("list entries failed: {e}")))?;
        Ok(entries)
    }

    pub async fn get_total_count(&self, user_id: i64) -> Result<i64, HabitError> {
        let mut conn = self.conn().await?;
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM habit_entries WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| HabitError::Storage(format!("count entries failed: {e}")))?;
        Ok(count)
    }

    /// Days between the last entry and today, or `None` with no entries.
    pub async fn get_days_since_last(&self, user_id: i64) -> Result<Option<i64>, HabitError> {
        let last = self.get_last_entry(user_id).await?;
        Ok(last.as_ref().map(|e| self.days_since(e)))
    }

    fn days_since(&self, entry: &HabitEntry) -> i64 {
        (self.today() - entry.entry_date).num_days()
    }

    /// Last entry, total and days-since together.
    ///
    /// Any failing part yields `None` for the whole result.
    pub async fn get_user_stats(&self, user_id: i64) -> Option<UserStats> {
        match self.try_user_stats(user_id).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("failed to compute stats for user {user_id}: {e}");
                None
            }
        }
    }

    async fn try_user_stats(&self, user_id: i64) -> Result<UserStats, HabitError> {
        let last_entry = self.get_last_entry(user_id).await?;
        let total_count = self.get_total_count(user_id).await?;
        let days_since_last = last_entry.as_ref().map(|e| self.days_since(e));
        Ok(UserStats {
            last_entry,
            total_count,
            days_since_last,
        })
    }
}
