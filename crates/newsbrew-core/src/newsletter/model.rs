//! Newsletter data models.

use chrono::{DateTime, Utc};
use newsbrew_llm::ExtractedContent;
use serde::{Deserialize, Serialize};

/// Unique identifier for a newsletter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NewsletterId(pub i64);

impl NewsletterId {
    /// Create a new newsletter ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NewsletterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One ingested newsletter message.
///
/// The sync path owns creation and the raw body fields; the orchestrator
/// owns `extracted`, `topics`, and `is_processed`. `extracted` and
/// `topics` are only ever written together from the same extraction
/// result, so a row with content always carries the topics derived from
/// that content.
#[derive(Debug, Clone)]
pub struct Newsletter {
    /// Unique identifier (None for unsaved rows).
    pub id: Option<NewsletterId>,
    /// Provider-assigned message id (unique, immutable).
    pub provider_id: String,
    /// Sender email address.
    pub from_address: String,
    /// Sender display name, if known.
    pub from_name: Option<String>,
    /// Subject line.
    pub subject: String,
    /// When the provider received the message.
    pub received_at: DateTime<Utc>,
    /// Plain text body, if the message had one.
    pub raw_text: Option<String>,
    /// HTML body, if the message had one.
    pub raw_html: Option<String>,
    /// Structured content from the last successful extraction.
    pub extracted: Option<ExtractedContent>,
    /// Topics derived by that extraction; empty until extracted.
    pub topics: Vec<String>,
    /// Whether a processing pass has consumed this row.
    pub is_processed: bool,
}

impl Newsletter {
    /// Creates a newsletter as the sync path ingests it: no extraction
    /// state yet.
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        from_address: impl Into<String>,
        from_name: Option<String>,
        subject: impl Into<String>,
        received_at: DateTime<Utc>,
        raw_text: Option<String>,
        raw_html: Option<String>,
    ) -> Self {
        Self {
            id: None,
            provider_id: provider_id.into(),
            from_address: from_address.into(),
            from_name,
            subject: subject.into(),
            received_at,
            raw_text,
            raw_html,
            extracted: None,
            topics: Vec::new(),
            is_processed: false,
        }
    }

    /// Whether structured content has been extracted for this row.
    #[must_use]
    pub const fn is_extracted(&self) -> bool {
        self.extracted.is_some()
    }
}

/// One page of a newsletter listing plus the total row count.
#[derive(Debug, Clone)]
pub struct NewsletterPage {
    /// Rows on this page, newest first.
    pub newsletters: Vec<Newsletter>,
    /// Total rows matching the filter.
    pub total: u64,
}
