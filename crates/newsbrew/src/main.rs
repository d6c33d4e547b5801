//! newsbrew - newsletter ingestion and digest delivery service.
//!
//! Pulls mail from the hosted inbox, extracts structured content with an
//! LLM, and delivers topic-filtered digests on cron schedules.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;

use std::sync::Arc;

use newsbrew_core::{
    ContentExtractor, DigestGenerator, Mailbox, Orchestrator, OrchestratorConfig, Store,
    spawn_schedule_loop, spawn_sync_loop,
};
use newsbrew_llm::LlmClient;
use newsbrew_mail::MailClient;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first: it may carry RUST_LOG as well as credentials.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsbrew=info,newsbrew_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(database = %config.database_path, "starting newsbrew");

    let store = Arc::new(Store::open(&config.database_path).await?);

    let mut mail = MailClient::new(&config.mail_api_key, &config.inbox_address);
    if let Some(base_url) = &config.mail_base_url {
        mail = mail.with_base_url(base_url);
    }
    let mail = Arc::new(mail);
    let llm = Arc::new(LlmClient::new(config.llm.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&store),
        Arc::clone(&llm) as Arc<dyn ContentExtractor>,
        llm as Arc<dyn DigestGenerator>,
        mail as Arc<dyn Mailbox>,
        OrchestratorConfig::new(&config.inbox_address),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let schedule_loop = spawn_schedule_loop(
        Arc::clone(&orchestrator),
        config.timers.schedule_check_interval,
        shutdown_rx.clone(),
    );
    let sync_loop = spawn_sync_loop(
        orchestrator,
        config.timers.sync_interval,
        config.timers.startup_sync_delay,
        shutdown_rx,
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(schedule_loop, sync_loop);
    store.close().await;

    info!("shutdown complete");
    Ok(())
}
