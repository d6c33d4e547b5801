//! Preferences data model.

use crate::schedule::{ScheduleDraft, SummaryLength};

/// User-wide defaults applied when a schedule does not say otherwise.
///
/// Persisted as a single row; there is exactly one user per deployment.
#[derive(Debug, Clone)]
pub struct Preferences {
    /// Default delivery address.
    pub delivery_email: String,
    /// Interests shown as topic suggestions for new schedules.
    pub interests: Vec<String>,
    /// Preferred output format (currently always "digest").
    pub format_preference: String,
    /// Default summary length.
    pub summary_length: SummaryLength,
    /// Default for including links.
    pub include_links: bool,
    /// Default generator instructions.
    pub custom_prompt: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            delivery_email: String::new(),
            interests: Vec::new(),
            format_preference: "digest".to_string(),
            summary_length: SummaryLength::Medium,
            include_links: true,
            custom_prompt: None,
        }
    }
}

impl Preferences {
    /// Prefill a schedule draft with these defaults.
    ///
    /// The caller supplies what preferences cannot: a name and a
    /// recurrence rule. Interests become the draft's topic filter.
    #[must_use]
    pub fn schedule_draft(&self, name: impl Into<String>, cron: impl Into<String>) -> ScheduleDraft {
        ScheduleDraft {
            name: name.into(),
            topics: self.interests.clone(),
            cron: cron.into(),
            delivery_email: self.delivery_email.clone(),
            summary_length: self.summary_length,
            include_links: self.include_links,
            custom_prompt: self.custom_prompt.clone(),
        }
    }
}
