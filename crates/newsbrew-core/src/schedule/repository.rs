//! Schedule storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::cron::CronExpression;
use super::model::{Schedule, ScheduleId, SummaryLength};
use crate::Result;

/// Repository for schedule storage and run bookkeeping.
pub struct ScheduleRepository {
    pool: SqlitePool,
}

impl ScheduleRepository {
    /// Create a repository over an existing pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS digest_schedules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                topics TEXT NOT NULL,
                cron TEXT NOT NULL,
                delivery_email TEXT NOT NULL,
                summary_length TEXT NOT NULL DEFAULT 'medium',
                include_links INTEGER NOT NULL DEFAULT 1,
                custom_prompt TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                last_run_at TEXT,
                next_run_at TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_digest_schedules_next_run
            ON digest_schedules(next_run_at)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_digest_schedules_active
            ON digest_schedules(is_active)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a validated schedule and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn create(&self, schedule: &Schedule) -> Result<ScheduleId> {
        let topics_json = serde_json::to_string(&schedule.topics)?;

        let result = sqlx::query(
            r"
            INSERT INTO digest_schedules
                (name, topics, cron, delivery_email, summary_length,
                 include_links, custom_prompt, is_active, last_run_at, next_run_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&schedule.name)
        .bind(topics_json)
        .bind(schedule.cron.as_str())
        .bind(&schedule.delivery_email)
        .bind(schedule.summary_length.as_str())
        .bind(schedule.include_links)
        .bind(&schedule.custom_prompt)
        .bind(schedule.is_active)
        .bind(schedule.last_run_at.map(|t| t.to_rfc3339()))
        .bind(schedule.next_run_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ScheduleId(result.last_insert_rowid()))
    }

    /// Get a schedule by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: ScheduleId) -> Result<Option<Schedule>> {
        let row = sqlx::query(&select_sql("WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(schedule_from_row))
    }

    /// All schedules, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<Schedule>> {
        let rows = sqlx::query(&select_sql("ORDER BY created_at DESC, id DESC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(schedule_from_row).collect())
    }

    /// Active schedules whose next firing time has passed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>> {
        let rows = sqlx::query(&select_sql("WHERE is_active = 1 AND next_run_at <= ?"))
            .bind(now.to_rfc3339())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(schedule_from_row).collect())
    }

    /// Replace a schedule's definition fields.
    ///
    /// The caller re-validates before updating; run bookkeeping has its
    /// own methods.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn update(&self, id: ScheduleId, schedule: &Schedule) -> Result<()> {
        let topics_json = serde_json::to_string(&schedule.topics)?;

        sqlx::query(
            r"
            UPDATE digest_schedules SET
                name = ?, topics = ?, cron = ?, delivery_email = ?,
                summary_length = ?, include_links = ?, custom_prompt = ?,
                is_active = ?, next_run_at = ?, updated_at = datetime('now')
            WHERE id = ?
            ",
        )
        .bind(&schedule.name)
        .bind(topics_json)
        .bind(schedule.cron.as_str())
        .bind(&schedule.delivery_email)
        .bind(schedule.summary_length.as_str())
        .bind(schedule.include_links)
        .bind(&schedule.custom_prompt)
        .bind(schedule.is_active)
        .bind(schedule.next_run_at.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Enable or disable automatic firing without touching anything else.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn set_active(&self, id: ScheduleId, is_active: bool) -> Result<()> {
        sqlx::query(
            r"
            UPDATE digest_schedules SET is_active = ?, updated_at = datetime('now')
            WHERE id = ?
            ",
        )
        .bind(is_active)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record an automatic firing: both bookkeeping fields move forward.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record_automatic_run(
        &self,
        id: ScheduleId,
        fired_at: DateTime<Utc>,
        next_run_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE digest_schedules
            SET last_run_at = ?, next_run_at = ?, updated_at = datetime('now')
            WHERE id = ?
            ",
        )
        .bind(fired_at.to_rfc3339())
        .bind(next_run_at.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a manual firing: only `last_run_at` moves.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record_manual_run(&self, id: ScheduleId, fired_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r"
            UPDATE digest_schedules
            SET last_run_at = ?, updated_at = datetime('now')
            WHERE id = ?
            ",
        )
        .bind(fired_at.to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a schedule. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: ScheduleId) -> Result<bool> {
        let result = sqlx::query(r"DELETE FROM digest_schedules WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Build the shared SELECT with a clause appended.
fn select_sql(clause: &str) -> String {
    format!(
        "SELECT id, name, topics, cron, delivery_email, summary_length, \
         include_links, custom_prompt, is_active, last_run_at, next_run_at \
         FROM digest_schedules {clause}"
    )
}

/// Map a row to a model, skipping rows with unreadable stored fields.
fn schedule_from_row(row: &SqliteRow) -> Option<Schedule> {
    let cron = CronExpression::parse(&row.get::<String, _>("cron")).ok()?;

    let next_run_at_str: String = row.get("next_run_at");
    let next_run_at = DateTime::parse_from_rfc3339(&next_run_at_str)
        .ok()?
        .with_timezone(&Utc);
    let last_run_at = row
        .get::<Option<String>, _>("last_run_at")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc));

    let topics = serde_json::from_str(&row.get::<String, _>("topics")).ok()?;

    Some(Schedule {
        id: Some(ScheduleId(row.get::<i64, _>("id"))),
        name: row.get("name"),
        topics,
        cron,
        delivery_email: row.get("delivery_email"),
        summary_length: SummaryLength::parse(&row.get::<String, _>("summary_length")),
        include_links: row.get::<bool, _>("include_links"),
        custom_prompt: row.get("custom_prompt"),
        is_active: row.get::<bool, _>("is_active"),
        last_run_at,
        next_run_at,
    })
}
