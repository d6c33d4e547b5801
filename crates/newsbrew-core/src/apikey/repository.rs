//! API key storage and verification.

use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{ApiKey, GeneratedKey};
use crate::Result;

const KEY_PREFIX: &str = "nb_";
const KEY_BYTES: usize = 32;

/// Repository for API key storage and verification.
pub struct ApiKeyRepository {
    pool: SqlitePool,
}

impl ApiKeyRepository {
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
            CREATE TABLE IF NOT EXISTS api_keys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key_hash TEXT UNIQUE NOT NULL,
                name TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                last_used_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Generate a new key, store its hash, and return the plaintext once.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn generate(&self, name: Option<&str>) -> Result<GeneratedKey> {
        let mut bytes = [0u8; KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let key = format!("{KEY_PREFIX}{}", hex::encode(bytes));

        let result = sqlx::query(r"INSERT INTO api_keys (key_hash, name) VALUES (?, ?)")
            .bind(hash_key(&key))
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(GeneratedKey {
            id: result.last_insert_rowid(),
            key,
        })
    }

    /// Check a presented key and touch its `last_used_at` on success.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn verify(&self, key: &str) -> Result<bool> {
        let key_hash = hash_key(key);
        let result = sqlx::query(
            r"UPDATE api_keys SET last_used_at = ? WHERE key_hash = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(&key_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of keys issued.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query(r"SELECT COUNT(*) as count FROM api_keys")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("count"))
    }

    /// All issued keys (metadata only), newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<ApiKey>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, created_at, last_used_at
            FROM api_keys ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ApiKey {
                id: row.get("id"),
                name: row.get("name"),
                created_at: parse_timestamp(row.get("created_at")),
                last_used_at: row
                    .get::<Option<String>, _>("last_used_at")
                    .and_then(parse_timestamp_opt),
            })
            .collect())
    }
}

/// SHA-256 hex digest of a plaintext key.
fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

fn parse_timestamp(s: String) -> Option<DateTime<Utc>> {
    parse_timestamp_opt(s)
}

/// Accepts both RFC3339 and sqlite's `datetime('now')` format.
fn parse_timestamp_opt(s: String) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|t| t.and_utc())
        })
}
