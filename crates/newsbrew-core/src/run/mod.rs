//! Processing run ledger: one row per digest or extraction attempt.

mod model;
mod repository;

pub use model::{DigestArtifacts, ProcessingRun, RunId, RunStatus};
pub use repository::RunRepository;
