//! Schedule data models.

use chrono::{DateTime, Utc};

use super::cron::CronExpression;
use crate::{Error, Result};

/// Unique identifier for a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId(pub i64);

impl ScheduleId {
    /// Create a new schedule ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How long digest summaries should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryLength {
    /// A sentence or two per newsletter.
    Short,
    /// A paragraph per newsletter.
    #[default]
    Medium,
    /// Detailed multi-paragraph summaries.
    Long,
}

impl SummaryLength {
    /// Parse from database string representation.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "short" => Self::Short,
            "long" => Self::Long,
            _ => Self::Medium,
        }
    }

    /// Convert to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

/// A named recurring digest definition.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Unique identifier (None for unsaved schedules).
    pub id: Option<ScheduleId>,
    /// Display name; also used as the digest email title.
    pub name: String,
    /// Topic filter; a newsletter qualifies if any of its topics matches
    /// any of these.
    pub topics: Vec<String>,
    /// Recurrence rule.
    pub cron: CronExpression,
    /// Where the digest is delivered.
    pub delivery_email: String,
    /// Summary length option passed to the generator.
    pub summary_length: SummaryLength,
    /// Whether the generator should include links.
    pub include_links: bool,
    /// Optional free-form instructions for the generator.
    pub custom_prompt: Option<String>,
    /// Whether automatic firing is enabled.
    pub is_active: bool,
    /// When the schedule last fired (automatic or manual).
    pub last_run_at: Option<DateTime<Utc>>,
    /// Next automatic firing time.
    pub next_run_at: DateTime<Utc>,
}

impl Schedule {
    /// Whether any newsletter topic matches this schedule's filter.
    ///
    /// Matching is case-insensitive and uses bidirectional substring
    /// containment: a filter topic matches a newsletter topic if either
    /// string contains the other after lowercasing. Deliberately loose,
    /// to tolerate phrasing variance from the extractor.
    #[must_use]
    pub fn matches_topics(&self, newsletter_topics: &[String]) -> bool {
        self.topics.iter().any(|topic| {
            newsletter_topics
                .iter()
                .any(|candidate| topic_pair_matches(topic, candidate))
        })
    }
}

/// Unvalidated schedule fields, as they arrive from the API boundary.
///
/// Validation happens here, before any state mutation: the orchestrator
/// and repositories only ever see a well-formed [`Schedule`].
#[derive(Debug, Clone)]
pub struct ScheduleDraft {
    /// Display name.
    pub name: String,
    /// Topic filter.
    pub topics: Vec<String>,
    /// Five-field cron expression text.
    pub cron: String,
    /// Delivery address.
    pub delivery_email: String,
    /// Summary length option.
    pub summary_length: SummaryLength,
    /// Whether to include links.
    pub include_links: bool,
    /// Optional generator instructions.
    pub custom_prompt: Option<String>,
}

impl ScheduleDraft {
    /// Validate the draft and build a schedule whose first firing is the
    /// next occurrence after `now`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing name, empty topic list,
    /// implausible email address, or malformed cron expression.
    pub fn into_schedule(self, now: DateTime<Utc>) -> Result<Schedule> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("schedule name is required".to_string()));
        }
        if self.topics.iter().all(|t| t.trim().is_empty()) {
            return Err(Error::Validation(
                "at least one topic is required".to_string(),
            ));
        }
        if !is_plausible_email(&self.delivery_email) {
            return Err(Error::Validation(format!(
                "invalid delivery email: {:?}",
                self.delivery_email
            )));
        }

        let cron = CronExpression::parse(&self.cron)?;
        let next_run_at = cron.next_after(now).ok_or_else(|| {
            Error::Validation(format!("cron expression never fires: {:?}", self.cron))
        })?;

        Ok(Schedule {
            id: None,
            name: self.name,
            topics: self.topics,
            cron,
            delivery_email: self.delivery_email,
            summary_length: self.summary_length,
            include_links: self.include_links,
            custom_prompt: self.custom_prompt,
            is_active: true,
            last_run_at: None,
            next_run_at,
        })
    }
}

/// Case-insensitive bidirectional substring containment.
fn topic_pair_matches(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a.contains(&b) || b.contains(&a)
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain.
fn is_plausible_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !address.chars().any(char::is_whitespace)
}
