//! Scheduled digest evaluation and the digest pipeline.

use chrono::{Duration, Utc};
use newsbrew_llm::ExtractedContent;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::{Orchestrator, sanitize};
use crate::newsletter::{Newsletter, NewsletterId};
use crate::run::DigestArtifacts;
use crate::schedule::{Schedule, ScheduleId};

/// A digest run failed. Business failures (`NoCandidates`, `NoMatches`)
/// are user-actionable; the rest are infrastructure.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The trailing candidate window contained no newsletters at all.
    #[error("no newsletters received in the last {0} days")]
    NoCandidates(i64),

    /// Newsletters exist, but none matched the schedule's topics.
    /// Broadening the topic filter is the usual fix.
    #[error("no newsletters matching topics for {0:?}")]
    NoMatches(String),

    /// The digest generator call failed.
    #[error("digest generation failed: {0}")]
    Generator(String),

    /// The rendered digest could not be delivered.
    #[error("digest delivery failed: {0}")]
    Delivery(String),

    /// A store operation failed mid-run.
    #[error(transparent)]
    Store(#[from] crate::Error),
}

/// What a successful digest run reports back.
#[derive(Debug, Clone, Copy)]
pub struct DigestOutcome {
    /// Ledger row recording the run.
    pub run_id: crate::run::RunId,
    /// How many newsletters made it into the digest.
    pub newsletter_count: usize,
}

/// One entry of the generator's input batch.
#[derive(Serialize)]
struct BatchEntry<'a> {
    id: i64,
    #[serde(flatten)]
    content: &'a ExtractedContent,
}

impl Orchestrator {
    /// Evaluate every due schedule once.
    ///
    /// Schedules are independent: one failing run is logged, recorded in
    /// the ledger, and never blocks the others. Whatever the outcome,
    /// the schedule's bookkeeping advances (`last_run_at` to now,
    /// `next_run_at` to the next occurrence), so a persistently failing
    /// schedule moves forward in time instead of spinning.
    ///
    /// # Errors
    ///
    /// Returns an error only if the due-schedule query itself fails;
    /// per-schedule failures are swallowed here.
    pub async fn evaluate_due_schedules(&self) -> crate::Result<()> {
        let now = Utc::now();
        let due = self.store.schedules().due(now).await?;
        if due.is_empty() {
            return Ok(());
        }

        info!(count = due.len(), "evaluating due schedules");
        for schedule in due {
            let Some(id) = schedule.id else { continue };

            match self.run_digest_for_schedule(&schedule).await {
                Ok(outcome) => info!(
                    schedule = %schedule.name,
                    run_id = %outcome.run_id,
                    newsletters = outcome.newsletter_count,
                    "scheduled digest completed",
                ),
                Err(e) => error!(schedule = %schedule.name, error = %e, "scheduled digest failed"),
            }

            self.advance_schedule(id, &schedule).await;
        }

        Ok(())
    }

    /// Fire one schedule on demand.
    ///
    /// Updates `last_run_at` on success but never touches `next_run_at`:
    /// a manual firing does not move the automatic cadence.
    ///
    /// # Errors
    ///
    /// Returns the digest failure, or a store error if the schedule does
    /// not exist.
    pub async fn trigger_schedule(&self, id: ScheduleId) -> Result<DigestOutcome, DigestError> {
        let schedule = self
            .store
            .schedules()
            .get(id)
            .await
            .map_err(DigestError::Store)?
            .ok_or(DigestError::Store(crate::Error::ScheduleNotFound(id.0)))?;

        let outcome = self.run_digest_for_schedule(&schedule).await?;
        self.store
            .schedules()
            .record_manual_run(id, Utc::now())
            .await?;

        Ok(outcome)
    }

    /// Run the digest pipeline for one schedule.
    ///
    /// The pipeline's final step writes a `completed` ledger row; on any
    /// failure a `failed` ledger row records the reason instead, so no
    /// outcome is ever silent. Schedule bookkeeping is the caller's
    /// business.
    ///
    /// # Errors
    ///
    /// Returns the tagged run failure; see [`DigestError`].
    pub async fn run_digest_for_schedule(
        &self,
        schedule: &Schedule,
    ) -> Result<DigestOutcome, DigestError> {
        match self.digest_pipeline(schedule).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.record_failed_digest(schedule.id, &e).await;
                Err(e)
            }
        }
    }

    async fn digest_pipeline(&self, schedule: &Schedule) -> Result<DigestOutcome, DigestError> {
        let window_days = self.config.candidate_window_days;
        let cutoff = Utc::now() - Duration::days(window_days);

        let candidates = self
            .store
            .newsletters()
            .received_since(cutoff)
            .await
            .map_err(DigestError::Store)?;
        if candidates.is_empty() {
            return Err(DigestError::NoCandidates(window_days));
        }

        // Extraction is cached on the row and shared across schedules;
        // a newsletter that fails here is dropped from this run only.
        let mut extracted: Vec<(NewsletterId, ExtractedContent)> = Vec::new();
        for newsletter in &candidates {
            let Some(id) = newsletter.id else { continue };
            if let Some(content) = self.content_for(newsletter, id).await? {
                extracted.push((id, content));
            }
        }

        let matched: Vec<(NewsletterId, ExtractedContent)> = extracted
            .into_iter()
            .filter(|(_, content)| schedule.matches_topics(&content.topics))
            .collect();
        if matched.is_empty() {
            return Err(DigestError::NoMatches(schedule.name.clone()));
        }

        let entries: Vec<BatchEntry<'_>> = matched
            .iter()
            .map(|(id, content)| BatchEntry { id: id.0, content })
            .collect();
        let payload = serde_json::to_string(&entries).map_err(crate::Error::Serde)?;

        let digest = self
            .generator
            .generate(
                &payload,
                &schedule.topics,
                schedule.summary_length,
                schedule.include_links,
                schedule.custom_prompt.as_deref(),
            )
            .await
            .map_err(|e| DigestError::Generator(e.to_string()))?;

        let html = super::render::digest_html(&digest, &schedule.name);
        let text = super::render::digest_text(&digest, &schedule.name);
        let subject = format!("{} - {}", schedule.name, digest.period_covered);

        let sent = self
            .mailbox
            .send(&schedule.delivery_email, &subject, &html, &text)
            .await
            .map_err(|e| DigestError::Delivery(e.to_string()))?;

        let ids: Vec<NewsletterId> = matched.iter().map(|(id, _)| *id).collect();
        let run_id = self
            .store
            .runs()
            .insert_completed_digest(
                schedule.id,
                &ids,
                &DigestArtifacts {
                    summary_html: html,
                    summary_text: text,
                    sent_to_email: schedule.delivery_email.clone(),
                    provider_message_id: Some(sent.message_id),
                },
            )
            .await
            .map_err(DigestError::Store)?;

        Ok(DigestOutcome {
            run_id,
            newsletter_count: ids.len(),
        })
    }

    /// Structured content for a candidate: the cached extraction if
    /// present, otherwise a fresh extraction persisted immediately.
    /// `None` means this newsletter sits out the current run.
    pub(super) async fn content_for(
        &self,
        newsletter: &Newsletter,
        id: NewsletterId,
    ) -> crate::Result<Option<ExtractedContent>> {
        if let Some(content) = &newsletter.extracted {
            return Ok(Some(content.clone()));
        }

        let body = sanitize::newsletter_body(
            newsletter.raw_text.as_deref(),
            newsletter.raw_html.as_deref(),
        );
        if body.len() < self.config.min_body_chars {
            debug!(newsletter = %id, "skipping extraction: insufficient content");
            return Ok(None);
        }

        let capped = sanitize::truncate_chars(&body, self.config.max_body_chars);
        match self
            .extractor
            .extract(&newsletter.subject, capped, &newsletter.from_address)
            .await
        {
            Ok(content) => {
                self.store.newsletters().store_extraction(id, &content).await?;
                Ok(Some(content))
            }
            Err(e) => {
                warn!(newsletter = %id, error = %e, "extraction failed; excluding from run");
                Ok(None)
            }
        }
    }

    /// Advance a schedule's bookkeeping after an automatic attempt,
    /// success or failure.
    async fn advance_schedule(&self, id: ScheduleId, schedule: &Schedule) {
        let now = Utc::now();
        match schedule.cron.next_after(now) {
            Some(next) => {
                if let Err(e) = self
                    .store
                    .schedules()
                    .record_automatic_run(id, now, next)
                    .await
                {
                    error!(schedule = %schedule.name, error = %e, "failed to advance schedule");
                } else {
                    debug!(schedule = %schedule.name, next_run = %next, "schedule advanced");
                }
            }
            None => {
                // A rule with no future occurrence would re-fire every
                // tick; park it instead.
                error!(schedule = %schedule.name, "recurrence has no future occurrence; deactivating");
                if let Err(e) = self.store.schedules().set_active(id, false).await {
                    error!(schedule = %schedule.name, error = %e, "failed to deactivate schedule");
                }
            }
        }
    }

    /// Ledger entry for a failed digest run. Recording is best-effort;
    /// a second failure here only logs.
    async fn record_failed_digest(&self, schedule_id: Option<ScheduleId>, error: &DigestError) {
        if let Err(e) = self
            .store
            .runs()
            .insert_failed(schedule_id, &[], &error.to_string())
            .await
        {
            warn!(error = %e, "failed to record failed digest run");
        }
    }
}
