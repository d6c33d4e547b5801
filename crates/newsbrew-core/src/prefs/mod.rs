//! Single-row user preferences used as schedule defaults.

mod model;
mod repository;

pub use model::Preferences;
pub use repository::PreferencesRepository;
