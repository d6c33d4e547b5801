//! Newsletter storage repository.

use chrono::{DateTime, Utc};
use newsbrew_llm::ExtractedContent;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use super::model::{Newsletter, NewsletterId, NewsletterPage};
use crate::Result;

/// Repository for newsletter storage and retrieval.
pub struct NewsletterRepository {
    pool: SqlitePool,
}

impl NewsletterRepository {
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
            CREATE TABLE IF NOT EXISTS newsletters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_id TEXT UNIQUE NOT NULL,
                from_address TEXT NOT NULL,
                from_name TEXT,
                subject TEXT NOT NULL,
                received_at TEXT NOT NULL,
                raw_text TEXT,
                raw_html TEXT,
                extracted_content TEXT,
                topics TEXT,
                is_processed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_newsletters_received_at
            ON newsletters(received_at DESC)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_newsletters_is_processed
            ON newsletters(is_processed)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a newly synced newsletter.
    ///
    /// Rows are unique on the provider message id: inserting a message
    /// that already exists is a no-op and returns `None`, so replaying a
    /// provider page never duplicates rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn insert(&self, newsletter: &Newsletter) -> Result<Option<NewsletterId>> {
        let result = sqlx::query(
            r"
            INSERT INTO newsletters
                (provider_id, from_address, from_name, subject, received_at, raw_text, raw_html)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(provider_id) DO NOTHING
            ",
        )
        .bind(&newsletter.provider_id)
        .bind(&newsletter.from_address)
        .bind(&newsletter.from_name)
        .bind(&newsletter.subject)
        .bind(newsletter.received_at.to_rfc3339())
        .bind(&newsletter.raw_text)
        .bind(&newsletter.raw_html)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(NewsletterId(result.last_insert_rowid())))
    }

    /// Refresh the raw body fields of an existing row (forced re-sync).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn update_bodies(
        &self,
        provider_id: &str,
        raw_text: Option<&str>,
        raw_html: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE newsletters SET raw_text = ?, raw_html = ?
            WHERE provider_id = ?
            ",
        )
        .bind(raw_text)
        .bind(raw_html)
        .bind(provider_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a newsletter by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: NewsletterId) -> Result<Option<Newsletter>> {
        let row = sqlx::query(&select_sql("WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(newsletter_from_row))
    }

    /// Get a newsletter by its provider message id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get_by_provider_id(&self, provider_id: &str) -> Result<Option<Newsletter>> {
        let row = sqlx::query(&select_sql("WHERE provider_id = ?"))
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().and_then(newsletter_from_row))
    }

    /// List one page of newsletters, newest first, with the total count.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_page(
        &self,
        page: u32,
        limit: u32,
        unprocessed_only: bool,
    ) -> Result<NewsletterPage> {
        let filter = if unprocessed_only {
            "WHERE is_processed = 0"
        } else {
            ""
        };
        let offset = page.saturating_sub(1) * limit;

        let count_row = sqlx::query(&format!("SELECT COUNT(*) as count FROM newsletters {filter}"))
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = count_row.get("count");

        let rows = sqlx::query(&select_sql(&format!(
            "{filter} ORDER BY received_at DESC LIMIT ? OFFSET ?"
        )))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(NewsletterPage {
            newsletters: rows.iter().filter_map(newsletter_from_row).collect(),
            total: total.try_into().unwrap_or(0),
        })
    }

    /// All newsletters received at or after the cutoff, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn received_since(&self, cutoff: DateTime<Utc>) -> Result<Vec<Newsletter>> {
        let rows = sqlx::query(&select_sql(
            "WHERE received_at >= ? ORDER BY received_at DESC",
        ))
        .bind(cutoff.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(newsletter_from_row).collect())
    }

    /// All newsletters not yet consumed by a processing pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn unprocessed(&self) -> Result<Vec<Newsletter>> {
        let rows = sqlx::query(&select_sql(
            "WHERE is_processed = 0 ORDER BY received_at DESC",
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(newsletter_from_row).collect())
    }

    /// All newsletters, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn all(&self) -> Result<Vec<Newsletter>> {
        let rows = sqlx::query(&select_sql("ORDER BY received_at DESC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().filter_map(newsletter_from_row).collect())
    }

    /// Newsletters with the given ids, newest first. Unknown ids are
    /// silently absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn by_ids(&self, ids: &[NewsletterId]) -> Result<Vec<Newsletter>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = select_sql(&format!(
            "WHERE id IN ({placeholders}) ORDER BY received_at DESC"
        ));
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.0);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().filter_map(newsletter_from_row).collect())
    }

    /// Persist a successful extraction.
    ///
    /// Content and the topics derived from it are written in one update
    /// so the two can never diverge.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn store_extraction(
        &self,
        id: NewsletterId,
        content: &ExtractedContent,
    ) -> Result<()> {
        let content_json = serde_json::to_string(content)?;
        let topics_json = serde_json::to_string(&content.topics)?;

        sqlx::query(
            r"
            UPDATE newsletters SET extracted_content = ?, topics = ?
            WHERE id = ?
            ",
        )
        .bind(content_json)
        .bind(topics_json)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a newsletter as consumed by a processing pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn mark_processed(&self, id: NewsletterId) -> Result<()> {
        sqlx::query(r"UPDATE newsletters SET is_processed = 1 WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete a newsletter. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: NewsletterId) -> Result<bool> {
        let result = sqlx::query(r"DELETE FROM newsletters WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Build the shared SELECT with a clause appended.
fn select_sql(clause: &str) -> String {
    format!(
        "SELECT id, provider_id, from_address, from_name, subject, received_at, \
         raw_text, raw_html, extracted_content, topics, is_processed \
         FROM newsletters {clause}"
    )
}

/// Map a row to a model, skipping rows with unreadable timestamps.
fn newsletter_from_row(row: &SqliteRow) -> Option<Newsletter> {
    let received_at_str: String = row.get("received_at");
    let received_at = DateTime::parse_from_rfc3339(&received_at_str)
        .ok()?
        .with_timezone(&Utc);

    let extracted = row
        .get::<Option<String>, _>("extracted_content")
        .and_then(|json| serde_json::from_str(&json).ok());
    let topics = row
        .get::<Option<String>, _>("topics")
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default();

    Some(Newsletter {
        id: Some(NewsletterId(row.get::<i64, _>("id"))),
        provider_id: row.get("provider_id"),
        from_address: row.get("from_address"),
        from_name: row.get("from_name"),
        subject: row.get("subject"),
        received_at,
        raw_text: row.get("raw_text"),
        raw_html: row.get("raw_html"),
        extracted,
        topics,
        is_processed: row.get::<bool, _>("is_processed"),
    })
}
