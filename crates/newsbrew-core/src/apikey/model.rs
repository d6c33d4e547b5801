//! API key data models.

use chrono::{DateTime, Utc};

/// A stored API key. Only the hash is persisted.
#[derive(Debug, Clone)]
pub struct ApiKey {
    /// Unique identifier.
    pub id: i64,
    /// Optional label chosen at generation time.
    pub name: Option<String>,
    /// When the key was generated.
    pub created_at: Option<DateTime<Utc>>,
    /// When the key last authenticated a request.
    pub last_used_at: Option<DateTime<Utc>>,
}

/// A freshly generated key, shown to the caller exactly once.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    /// Row id of the stored hash.
    pub id: i64,
    /// The plaintext key. Not recoverable after this.
    pub key: String,
}
