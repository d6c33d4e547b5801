//! Preferences storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::Preferences;
use crate::Result;
use crate::schedule::SummaryLength;

/// Repository for the single-row preferences record.
pub struct PreferencesRepository {
    pool: SqlitePool,
}

impl PreferencesRepository {
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
            CREATE TABLE IF NOT EXISTS preferences (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                delivery_email TEXT NOT NULL,
                interests TEXT NOT NULL DEFAULT '[]',
                format_preference TEXT NOT NULL DEFAULT 'digest',
                summary_length TEXT NOT NULL DEFAULT 'medium',
                include_links INTEGER NOT NULL DEFAULT 1,
                custom_prompt TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The stored preferences, if any have been set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self) -> Result<Option<Preferences>> {
        let row = sqlx::query(
            r"
            SELECT delivery_email, interests, format_preference, summary_length,
                   include_links, custom_prompt
            FROM preferences WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Preferences {
            delivery_email: row.get("delivery_email"),
            interests: serde_json::from_str(&row.get::<String, _>("interests"))
                .unwrap_or_default(),
            format_preference: row.get("format_preference"),
            summary_length: SummaryLength::parse(&row.get::<String, _>("summary_length")),
            include_links: row.get::<bool, _>("include_links"),
            custom_prompt: row.get("custom_prompt"),
        }))
    }

    /// Create or replace the preferences row.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database query fails.
    pub async fn upsert(&self, preferences: &Preferences) -> Result<()> {
        let interests_json = serde_json::to_string(&preferences.interests)?;

        sqlx::query(
            r"
            INSERT INTO preferences
                (id, delivery_email, interests, format_preference, summary_length,
                 include_links, custom_prompt, updated_at)
            VALUES (1, ?, ?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                delivery_email = excluded.delivery_email,
                interests = excluded.interests,
                format_preference = excluded.format_preference,
                summary_length = excluded.summary_length,
                include_links = excluded.include_links,
                custom_prompt = excluded.custom_prompt,
                updated_at = datetime('now')
            ",
        )
        .bind(&preferences.delivery_email)
        .bind(interests_json)
        .bind(&preferences.format_preference)
        .bind(preferences.summary_length.as_str())
        .bind(preferences.include_links)
        .bind(&preferences.custom_prompt)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
