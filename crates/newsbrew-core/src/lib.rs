//! # newsbrew-core
//!
//! Core business logic for the newsbrew newsletter digest service.
//!
//! This crate provides:
//! - Newsletter storage and extraction state (`SQLite`)
//! - Digest schedules with five-field cron recurrence
//! - The processing run ledger (history and idempotency record)
//! - **Digest Orchestrator** - due-schedule evaluation, topic matching,
//!   digest generation and delivery
//! - **Ad-hoc Processing** - extraction batches outside the schedule
//!   mechanism
//! - **Mailbox Sync** - paginated ingestion from the mail provider
//! - Background timer loops driving the above

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod apikey;
mod error;
pub mod newsletter;
pub mod prefs;
pub mod run;
pub mod schedule;
pub mod service;
mod store;

pub use apikey::{ApiKey, ApiKeyRepository, GeneratedKey};
pub use error::{Error, Result};
pub use newsletter::{Newsletter, NewsletterId, NewsletterPage, NewsletterRepository};
pub use prefs::{Preferences, PreferencesRepository};
pub use run::{DigestArtifacts, ProcessingRun, RunId, RunRepository, RunStatus};
pub use schedule::{
    CronExpression, Schedule, ScheduleDraft, ScheduleId, ScheduleRepository, SummaryLength,
};
pub use service::{
    AdapterError, ContentExtractor, DigestError, DigestGenerator, DigestOutcome, Mailbox,
    Orchestrator, OrchestratorConfig, ProcessingError, ProcessingOutcome, ProcessingSelection,
    SyncOutcome, TimerConfig, spawn_schedule_loop, spawn_sync_loop,
};
pub use store::Store;
