//! Ad-hoc extraction processing.
//!
//! Distinct from scheduled digests: this path brings extraction state up
//! to date for a set of newsletters without topic filtering and without
//! sending mail, tracked by its own ledger row.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::Orchestrator;
use crate::newsletter::{Newsletter, NewsletterId};
use crate::run::RunId;

/// Which newsletters an ad-hoc processing request covers.
#[derive(Debug, Clone)]
pub enum ProcessingSelection {
    /// Exactly these rows.
    Ids(Vec<NewsletterId>),
    /// Every row not yet consumed by a processing pass (the default).
    Unprocessed,
    /// Every row, regardless of processed state.
    All,
}

/// An ad-hoc processing request failed to start.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// The resolved newsletter set was empty.
    #[error("no newsletters to process")]
    NothingToProcess,

    /// Another ad-hoc batch is still in flight.
    #[error("a processing run is already in flight")]
    InFlight,

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] crate::Error),
}

/// What an accepted ad-hoc request reports back immediately.
#[derive(Debug, Clone, Copy)]
pub struct ProcessingOutcome {
    /// Ledger row tracking the batch.
    pub run_id: RunId,
    /// Number of newsletters in the batch.
    pub newsletter_count: usize,
}

/// Releases the single-flight guard when the batch finishes (or the
/// accepting call bails out early).
struct ProcessingPermit {
    orchestrator: Arc<Orchestrator>,
}

impl Drop for ProcessingPermit {
    fn drop(&mut self) {
        self.orchestrator
            .processing_active
            .store(false, Ordering::SeqCst);
    }
}

impl Orchestrator {
    /// Start an ad-hoc extraction batch.
    ///
    /// Creates the ledger row synchronously and returns its id at once;
    /// extraction continues in a background task. At most one batch is
    /// in flight at a time; overlapping requests are rejected rather
    /// than queued.
    ///
    /// # Errors
    ///
    /// [`ProcessingError::NothingToProcess`] if the selection resolves
    /// to zero newsletters, [`ProcessingError::InFlight`] if a batch is
    /// already running, or a store error.
    pub async fn process_newsletters(
        self: &Arc<Self>,
        selection: ProcessingSelection,
        force_reprocess: bool,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        if self
            .processing_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ProcessingError::InFlight);
        }
        let permit = ProcessingPermit {
            orchestrator: Arc::clone(self),
        };

        let newsletters = match selection {
            ProcessingSelection::Ids(ids) => self.store.newsletters().by_ids(&ids).await?,
            ProcessingSelection::Unprocessed => self.store.newsletters().unprocessed().await?,
            ProcessingSelection::All => self.store.newsletters().all().await?,
        };
        if newsletters.is_empty() {
            return Err(ProcessingError::NothingToProcess);
        }

        let ids: Vec<NewsletterId> = newsletters.iter().filter_map(|n| n.id).collect();
        let run_id = self.store.runs().begin(&ids, None).await?;
        let count = newsletters.len();

        info!(run_id = %run_id, newsletters = count, "processing started");

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = permit;
            orchestrator
                .run_extraction_batch(run_id, newsletters, force_reprocess)
                .await;
        });

        Ok(ProcessingOutcome {
            run_id,
            newsletter_count: count,
        })
    }

    /// Drive one batch to a terminal ledger state.
    async fn run_extraction_batch(
        &self,
        run_id: RunId,
        newsletters: Vec<Newsletter>,
        force_reprocess: bool,
    ) {
        match self.extract_batch(&newsletters, force_reprocess).await {
            Ok(processed) => {
                info!(
                    run_id = %run_id,
                    processed,
                    total = newsletters.len(),
                    "processing complete",
                );
                if let Err(e) = self.store.runs().mark_completed(run_id).await {
                    error!(run_id = %run_id, error = %e, "failed to complete processing run");
                }
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "processing batch failed");
                if let Err(mark_err) = self.store.runs().mark_failed(run_id, &e.to_string()).await {
                    error!(run_id = %run_id, error = %mark_err, "failed to record batch failure");
                }
            }
        }
    }

    /// Extract each newsletter in turn. Per-item extraction failures are
    /// logged and skipped; only a store failure escapes and fails the
    /// whole batch.
    async fn extract_batch(
        &self,
        newsletters: &[Newsletter],
        force_reprocess: bool,
    ) -> crate::Result<usize> {
        let mut processed = 0usize;

        for newsletter in newsletters {
            let Some(id) = newsletter.id else { continue };

            if newsletter.is_extracted() && !force_reprocess {
                // Cached extraction still counts as consumed by this pass.
                self.store.newsletters().mark_processed(id).await?;
                processed += 1;
                continue;
            }

            let body = super::sanitize::newsletter_body(
                newsletter.raw_text.as_deref(),
                newsletter.raw_html.as_deref(),
            );
            if body.len() < self.config.min_body_chars {
                debug!(newsletter = %id, "skipping: insufficient content");
                continue;
            }

            let capped = super::sanitize::truncate_chars(&body, self.config.max_body_chars);
            match self
                .extractor
                .extract(&newsletter.subject, capped, &newsletter.from_address)
                .await
            {
                Ok(content) => {
                    self.store.newsletters().store_extraction(id, &content).await?;
                    self.store.newsletters().mark_processed(id).await?;
                    debug!(newsletter = %id, topics = ?content.topics, "extracted");
                    processed += 1;
                }
                Err(e) => {
                    warn!(newsletter = %id, error = %e, "extraction failed; skipping");
                }
            }
        }

        Ok(processed)
    }
}
