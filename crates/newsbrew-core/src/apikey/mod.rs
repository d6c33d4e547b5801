//! API keys for the HTTP boundary.

mod model;
mod repository;

pub use model::{ApiKey, GeneratedKey};
pub use repository::ApiKeyRepository;
