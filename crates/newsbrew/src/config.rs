//! Environment-driven service configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use newsbrew_core::TimerConfig;
use newsbrew_llm::LlmConfig;

/// Everything the service needs to start, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the sqlite database file.
    pub database_path: String,
    /// Mail provider API key.
    pub mail_api_key: String,
    /// The inbox newsletters arrive in; also the sending address.
    pub inbox_address: String,
    /// Override for the provider API base URL.
    pub mail_base_url: Option<String>,
    /// LLM client configuration.
    pub llm: LlmConfig,
    /// Background loop cadences.
    pub timers: TimerConfig,
}

impl Config {
    /// Resolve configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or the default
    /// data directory cannot be created.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_path = match env_opt("NEWSBREW_DATABASE_PATH") {
            Some(path) => path,
            None => default_database_path()?,
        };

        let mail_api_key =
            env_opt("NEWSBREW_MAIL_API_KEY").context("NEWSBREW_MAIL_API_KEY not set")?;
        let inbox_address = env_opt("NEWSBREW_INBOX").context("NEWSBREW_INBOX not set")?;

        let mut llm = LlmConfig::default();
        if let Some(endpoint) = env_opt("NEWSBREW_LLM_ENDPOINT") {
            llm.endpoint = endpoint;
        }
        if let Some(api_key) = env_opt("NEWSBREW_LLM_API_KEY") {
            llm.api_key = api_key;
        }
        if let Some(model) = env_opt("NEWSBREW_LLM_MODEL") {
            llm.model = model;
        }

        let defaults = TimerConfig::default();
        let timers = TimerConfig {
            schedule_check_interval: env_duration_secs(
                "NEWSBREW_SCHEDULE_INTERVAL_SECS",
                defaults.schedule_check_interval,
            ),
            sync_interval: env_duration_secs("NEWSBREW_SYNC_INTERVAL_SECS", defaults.sync_interval),
            startup_sync_delay: env_duration_secs(
                "NEWSBREW_STARTUP_SYNC_DELAY_SECS",
                defaults.startup_sync_delay,
            ),
        };

        Ok(Self {
            database_path,
            mail_api_key,
            inbox_address,
            mail_base_url: env_opt("NEWSBREW_MAIL_BASE_URL"),
            llm,
            timers,
        })
    }
}

/// A set, non-empty environment variable.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_duration_secs(name: &str, default: Duration) -> Duration {
    env_opt(name)
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

/// `<data dir>/newsbrew/newsbrew.db`, creating the directory if needed.
fn default_database_path() -> anyhow::Result<String> {
    let mut dir: PathBuf = dirs::data_dir().context("no data directory on this platform")?;
    dir.push("newsbrew");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating data directory {}", dir.display()))?;
    dir.push("newsbrew.db");
    Ok(dir.to_string_lossy().into_owned())
}
