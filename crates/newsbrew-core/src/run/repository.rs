//! Processing run ledger repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{DigestArtifacts, ProcessingRun, RunId, RunStatus};
use crate::Result;
use crate::newsletter::NewsletterId;
use crate::schedule::ScheduleId;

/// Repository for the processing run ledger.
pub struct RunRepository {
    pool: SqlitePool,
}

impl RunRepository {
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
            CREATE TABLE IF NOT EXISTS processing_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                triggered_at TEXT NOT NULL,
                completed_at TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                newsletter_count INTEGER NOT NULL DEFAULT 0,
                newsletter_ids TEXT NOT NULL DEFAULT '[]',
                summary_text TEXT,
                summary_html TEXT,
                sent_to_email TEXT,
                provider_message_id TEXT,
                error_message TEXT,
                schedule_id INTEGER
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_processing_runs_status
            ON processing_runs(status)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Open a run in `processing` state for the given newsletter set.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn begin(
        &self,
        newsletter_ids: &[NewsletterId],
        schedule_id: Option<ScheduleId>,
    ) -> Result<RunId> {
        let ids_json = serde_json::to_string(newsletter_ids)?;
        let count = i64::try_from(newsletter_ids.len()).unwrap_or(i64::MAX);

        let result = sqlx::query(
            r"
            INSERT INTO processing_runs
                (triggered_at, status, newsletter_count, newsletter_ids, schedule_id)
            VALUES (?, 'processing', ?, ?, ?)
            ",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(count)
        .bind(ids_json)
        .bind(schedule_id.map(|s| s.0))
        .execute(&self.pool)
        .await?;

        Ok(RunId(result.last_insert_rowid()))
    }

    /// Record a digest run that ran to completion, in one insert.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn insert_completed_digest(
        &self,
        schedule_id: Option<ScheduleId>,
        newsletter_ids: &[NewsletterId],
        artifacts: &DigestArtifacts,
    ) -> Result<RunId> {
        let ids_json = serde_json::to_string(newsletter_ids)?;
        let count = i64::try_from(newsletter_ids.len()).unwrap_or(i64::MAX);
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            INSERT INTO processing_runs
                (triggered_at, completed_at, status, newsletter_count, newsletter_ids,
                 summary_text, summary_html, sent_to_email, provider_message_id, schedule_id)
            VALUES (?, ?, 'completed', ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&now)
        .bind(&now)
        .bind(count)
        .bind(ids_json)
        .bind(&artifacts.summary_text)
        .bind(&artifacts.summary_html)
        .bind(&artifacts.sent_to_email)
        .bind(&artifacts.provider_message_id)
        .bind(schedule_id.map(|s| s.0))
        .execute(&self.pool)
        .await?;

        Ok(RunId(result.last_insert_rowid()))
    }

    /// Record a run that failed before any work completed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn insert_failed(
        &self,
        schedule_id: Option<ScheduleId>,
        newsletter_ids: &[NewsletterId],
        error_message: &str,
    ) -> Result<RunId> {
        let ids_json = serde_json::to_string(newsletter_ids)?;
        let count = i64::try_from(newsletter_ids.len()).unwrap_or(i64::MAX);
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r"
            INSERT INTO processing_runs
                (triggered_at, completed_at, status, newsletter_count, newsletter_ids,
                 error_message, schedule_id)
            VALUES (?, ?, 'failed', ?, ?, ?, ?)
            ",
        )
        .bind(&now)
        .bind(&now)
        .bind(count)
        .bind(ids_json)
        .bind(error_message)
        .bind(schedule_id.map(|s| s.0))
        .execute(&self.pool)
        .await?;

        Ok(RunId(result.last_insert_rowid()))
    }

    /// Drive an open run to `completed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_completed(&self, id: RunId) -> Result<()> {
        sqlx::query(
            r"
            UPDATE processing_runs SET status = 'completed', completed_at = ?
            WHERE id = ? AND status = 'processing'
            ",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Drive an open run to `failed` with the error recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_failed(&self, id: RunId, error_message: &str) -> Result<()> {
        sqlx::query(
            r"
            UPDATE processing_runs SET status = 'failed', error_message = ?, completed_at = ?
            WHERE id = ? AND status = 'processing'
            ",
        )
        .bind(error_message)
        .bind(Utc::now().to_rfc3339())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a run by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: RunId) -> Result<Option<ProcessingRun>> {
        let row = sqlx::query(&select_sql("WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(run_from_row))
    }

    /// The most recently triggered run, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn latest(&self) -> Result<Option<ProcessingRun>> {
        let row = sqlx::query(&select_sql("ORDER BY triggered_at DESC, id DESC LIMIT 1"))
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(run_from_row))
    }

    /// The most recent run still in `processing` state, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn in_flight(&self) -> Result<Option<ProcessingRun>> {
        let row = sqlx::query(&select_sql(
            "WHERE status = 'processing' ORDER BY triggered_at DESC, id DESC LIMIT 1",
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(run_from_row))
    }

    /// Recent runs, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history(&self, limit: u32) -> Result<Vec<ProcessingRun>> {
        let rows = sqlx::query(&select_sql("ORDER BY triggered_at DESC, id DESC LIMIT ?"))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(run_from_row).collect())
    }

    /// Recent runs for one schedule, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn history_for_schedule(
        &self,
        schedule_id: ScheduleId,
        limit: u32,
    ) -> Result<Vec<ProcessingRun>> {
        let rows = sqlx::query(&select_sql(
            "WHERE schedule_id = ? ORDER BY triggered_at DESC, id DESC LIMIT ?",
        ))
        .bind(schedule_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(run_from_row).collect())
    }
}

/// Build the shared SELECT with a clause appended.
fn select_sql(clause: &str) -> String {
    format!(
        "SELECT id, triggered_at, completed_at, status, newsletter_count, newsletter_ids, \
         summary_text, summary_html, sent_to_email, provider_message_id, error_message, \
         schedule_id \
         FROM processing_runs {clause}"
    )
}

/// Map a row to a model, skipping rows with unreadable timestamps.
fn run_from_row(row: &SqliteRow) -> Option<ProcessingRun> {
    let triggered_at_str: String = row.get("triggered_at");
    let triggered_at = DateTime::parse_from_rfc3339(&triggered_at_str)
        .ok()?
        .with_timezone(&Utc);
    let completed_at = row
        .get::<Option<String>, _>("completed_at")
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|t| t.with_timezone(&Utc));

    let newsletter_ids: Vec<NewsletterId> =
        serde_json::from_str(&row.get::<String, _>("newsletter_ids")).unwrap_or_default();

    Some(ProcessingRun {
        id: Some(RunId(row.get::<i64, _>("id"))),
        triggered_at,
        completed_at,
        status: RunStatus::parse(&row.get::<String, _>("status")),
        newsletter_count: row.get::<i64, _>("newsletter_count").try_into().unwrap_or(0),
        newsletter_ids,
        summary_text: row.get("summary_text"),
        summary_html: row.get("summary_html"),
        sent_to_email: row.get("sent_to_email"),
        provider_message_id: row.get("provider_message_id"),
        error_message: row.get("error_message"),
        schedule_id: row
            .get::<Option<i64>, _>("schedule_id")
            .map(ScheduleId::new),
    })
}
