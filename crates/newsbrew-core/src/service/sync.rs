//! Mailbox synchronization.

use std::sync::Arc;

use newsbrew_mail::MessageAddress;
use tracing::{debug, info, warn};

use super::{Orchestrator, ProcessingError, ProcessingSelection};
use crate::newsletter::Newsletter;

/// Counters for one sync pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOutcome {
    /// New newsletter rows inserted.
    pub synced: usize,
    /// Existing rows whose bodies were refreshed (forced sync only).
    pub updated: usize,
    /// Messages skipped: already known, or echoes of our own sends.
    pub skipped: usize,
}

impl Orchestrator {
    /// Pull new messages from the provider into the newsletter store.
    ///
    /// Pages sequentially through the inbox. Echoes of the service's own
    /// outbound mail and already-known provider ids are skipped; `force`
    /// refreshes the raw bodies of known rows instead of skipping them.
    /// Each new message is fetched in full before first persistence,
    /// falling back to the preview fields if the detail fetch fails.
    ///
    /// After a pass that inserted anything, ad-hoc processing is
    /// triggered automatically; its failures (including "nothing to
    /// process" and an already-running batch) are swallowed.
    ///
    /// # Errors
    ///
    /// Returns an error if a list call or a store operation fails.
    pub async fn sync_mailbox(self: &Arc<Self>, force: bool) -> crate::Result<SyncOutcome> {
        let mut outcome = SyncOutcome::default();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.mailbox.list_messages(page_token.as_deref()).await?;

            for preview in page.messages {
                let sender = MessageAddress::parse(&preview.from);
                if sender
                    .address
                    .eq_ignore_ascii_case(&self.config.inbox_address)
                {
                    debug!(message = %preview.message_id, "skipping own outgoing message");
                    outcome.skipped += 1;
                    continue;
                }

                let existing = self
                    .store
                    .newsletters()
                    .get_by_provider_id(&preview.message_id)
                    .await?;
                if existing.is_some() && !force {
                    outcome.skipped += 1;
                    continue;
                }

                // List responses are previews; always try for the full body.
                let full = match self.mailbox.get_message(&preview.message_id).await {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(
                            message = %preview.message_id,
                            error = %e,
                            "detail fetch failed; using preview fields",
                        );
                        preview
                    }
                };

                let raw_text = full.text_or_preview().map(ToString::to_string);
                if existing.is_some() {
                    self.store
                        .newsletters()
                        .update_bodies(&full.message_id, raw_text.as_deref(), full.html.as_deref())
                        .await?;
                    outcome.updated += 1;
                    continue;
                }

                let sender = MessageAddress::parse(&full.from);
                let subject = if full.subject.is_empty() {
                    "(No subject)".to_string()
                } else {
                    full.subject.clone()
                };
                let newsletter = Newsletter::new(
                    full.message_id.clone(),
                    sender.address,
                    sender.name,
                    subject,
                    full.timestamp,
                    raw_text,
                    full.html.clone(),
                );

                match self.store.newsletters().insert(&newsletter).await? {
                    Some(_) => outcome.synced += 1,
                    None => outcome.skipped += 1,
                }
            }

            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        info!(
            synced = outcome.synced,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "mailbox sync finished",
        );

        if outcome.synced > 0 {
            self.trigger_post_sync_processing().await;
        }

        Ok(outcome)
    }

    /// Kick off extraction for whatever the sync brought in. Everything
    /// here is best-effort; an empty backlog is the expected case when
    /// every new message was too short to extract.
    async fn trigger_post_sync_processing(self: &Arc<Self>) {
        match self
            .process_newsletters(ProcessingSelection::Unprocessed, false)
            .await
        {
            Ok(outcome) => info!(
                run_id = %outcome.run_id,
                newsletters = outcome.newsletter_count,
                "post-sync processing triggered",
            ),
            Err(ProcessingError::NothingToProcess | ProcessingError::InFlight) => {
                debug!("post-sync processing not started");
            }
            Err(e) => warn!(error = %e, "post-sync processing failed to start"),
        }
    }
}
