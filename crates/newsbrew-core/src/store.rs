//! Shared database handle and repository access.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::Result;
use crate::apikey::ApiKeyRepository;
use crate::newsletter::NewsletterRepository;
use crate::prefs::PreferencesRepository;
use crate::run::RunRepository;
use crate::schedule::ScheduleRepository;

/// One explicitly constructed database handle owning the connection pool
/// and every repository over it.
///
/// Opened once at startup and passed to the orchestrator; closing it is
/// an explicit resource scope rather than process teardown.
pub struct Store {
    pool: SqlitePool,
    newsletters: NewsletterRepository,
    schedules: ScheduleRepository,
    runs: RunRepository,
    preferences: PreferencesRepository,
    api_keys: ApiKeyRepository,
}

impl Store {
    /// Open (creating if needed) the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails.
    pub async fn open(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;

        Self::from_pool(pool).await
    }

    /// Create an in-memory store for testing.
    ///
    /// A single connection is pinned so every repository sees the same
    /// database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self {
            newsletters: NewsletterRepository::new(pool.clone()),
            schedules: ScheduleRepository::new(pool.clone()),
            runs: RunRepository::new(pool.clone()),
            preferences: PreferencesRepository::new(pool.clone()),
            api_keys: ApiKeyRepository::new(pool.clone()),
            pool,
        };

        store.newsletters.initialize().await?;
        store.schedules.initialize().await?;
        store.runs.initialize().await?;
        store.preferences.initialize().await?;
        store.api_keys.initialize().await?;

        Ok(store)
    }

    /// Newsletter rows.
    #[must_use]
    pub const fn newsletters(&self) -> &NewsletterRepository {
        &self.newsletters
    }

    /// Digest schedules.
    #[must_use]
    pub const fn schedules(&self) -> &ScheduleRepository {
        &self.schedules
    }

    /// Processing run ledger.
    #[must_use]
    pub const fn runs(&self) -> &RunRepository {
        &self.runs
    }

    /// Single-row preferences.
    #[must_use]
    pub const fn preferences(&self) -> &PreferencesRepository {
        &self.preferences
    }

    /// API keys.
    #[must_use]
    pub const fn api_keys(&self) -> &ApiKeyRepository {
        &self.api_keys
    }

    /// Close the pool, waiting for in-flight queries to finish.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
