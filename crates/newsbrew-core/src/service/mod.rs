//! Orchestration services.
//!
//! The [`Orchestrator`] owns every write to the run ledger and the
//! schedules' run bookkeeping, plus the extraction fields on newsletter
//! rows. It is driven by the background timer loops and by on-demand
//! calls from the API boundary.

mod adapters;
mod digest;
mod processing;
pub mod render;
pub mod sanitize;
mod sync;
mod timer;

pub use adapters::{AdapterError, AdapterResult, ContentExtractor, DigestGenerator, Mailbox};
pub use digest::{DigestError, DigestOutcome};
pub use processing::{ProcessingError, ProcessingOutcome, ProcessingSelection};
pub use sync::SyncOutcome;
pub use timer::{TimerConfig, spawn_schedule_loop, spawn_sync_loop};

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::store::Store;

/// Tunables for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// The service's own inbox address; sync skips messages it sent.
    pub inbox_address: String,
    /// Trailing window, in days, for digest candidate selection.
    pub candidate_window_days: i64,
    /// Bodies shorter than this carry too little signal to extract.
    pub min_body_chars: usize,
    /// Character budget for extraction input.
    pub max_body_chars: usize,
}

impl OrchestratorConfig {
    /// Defaults for the given inbox address.
    #[must_use]
    pub fn new(inbox_address: impl Into<String>) -> Self {
        Self {
            inbox_address: inbox_address.into(),
            candidate_window_days: 7,
            min_body_chars: 50,
            max_body_chars: 15_000,
        }
    }
}

/// The digest orchestration engine.
///
/// Construct once at startup with an opened [`Store`] and the three
/// collaborators, wrap in an [`Arc`], and drive from the timer loops.
pub struct Orchestrator {
    store: Arc<Store>,
    extractor: Arc<dyn ContentExtractor>,
    generator: Arc<dyn DigestGenerator>,
    mailbox: Arc<dyn Mailbox>,
    config: OrchestratorConfig,
    /// Single-flight guard for ad-hoc processing. In-process state, not
    /// derived from the ledger: a `processing` row orphaned by a crash
    /// must not wedge the path after restart.
    processing_active: AtomicBool,
}

impl Orchestrator {
    /// Build an orchestrator over the given store and collaborators.
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        extractor: Arc<dyn ContentExtractor>,
        generator: Arc<dyn DigestGenerator>,
        mailbox: Arc<dyn Mailbox>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            extractor,
            generator,
            mailbox,
            config,
            processing_active: AtomicBool::new(false),
        }
    }

    /// The store this orchestrator writes to.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}
