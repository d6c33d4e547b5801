//! Processing run data models.

use chrono::{DateTime, Utc};

use crate::newsletter::NewsletterId;
use crate::schedule::ScheduleId;

/// Unique identifier for a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub i64);

impl RunId {
    /// Create a new run ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    /// Created but not yet picked up.
    #[default]
    Pending,
    /// Work is in flight.
    Processing,
    /// Terminal: the run finished.
    Completed,
    /// Terminal: the run aborted; `error_message` says why.
    Failed,
}

impl RunStatus {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the run can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One recorded digest or extraction attempt.
///
/// Rows reach a terminal status exactly once and are immutable after
/// that; the ledger doubles as the history feed.
#[derive(Debug, Clone)]
pub struct ProcessingRun {
    /// Unique identifier (None for unsaved rows).
    pub id: Option<RunId>,
    /// When the attempt was accepted.
    pub triggered_at: DateTime<Utc>,
    /// When it reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Lifecycle state.
    pub status: RunStatus,
    /// Number of newsletters involved.
    pub newsletter_count: u32,
    /// The newsletters involved.
    pub newsletter_ids: Vec<NewsletterId>,
    /// Plain text rendering of the digest, for digest runs.
    pub summary_text: Option<String>,
    /// HTML rendering of the digest, for digest runs.
    pub summary_html: Option<String>,
    /// Address the digest was delivered to.
    pub sent_to_email: Option<String>,
    /// Provider confirmation id for the delivery.
    pub provider_message_id: Option<String>,
    /// Failure detail, for failed runs.
    pub error_message: Option<String>,
    /// Originating schedule; `None` for ad-hoc runs.
    pub schedule_id: Option<ScheduleId>,
}

/// Everything a successful digest run records beyond the newsletter set.
#[derive(Debug, Clone)]
pub struct DigestArtifacts {
    /// HTML rendering that was sent.
    pub summary_html: String,
    /// Plain text rendering that was sent.
    pub summary_text: String,
    /// Delivery address actually used.
    pub sent_to_email: String,
    /// Provider confirmation id.
    pub provider_message_id: Option<String>,
}
