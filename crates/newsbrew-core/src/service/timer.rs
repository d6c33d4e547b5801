//! Background timer loops.
//!
//! Two independent periodic tasks drive the orchestrator: schedule
//! evaluation on a short cadence and mailbox sync on a long one. Each
//! loop has its own period and listens on a shared shutdown channel, so
//! the binary can stop them cleanly and tests can run the loop bodies
//! directly without waiting on wall-clock timers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::Orchestrator;

/// Cadences for the background loops.
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// How often due schedules are evaluated.
    pub schedule_check_interval: Duration,
    /// How often the mailbox is synced.
    pub sync_interval: Duration,
    /// Grace period before the first sync after startup.
    pub startup_sync_delay: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            schedule_check_interval: Duration::from_secs(60),
            sync_interval: Duration::from_secs(3600),
            startup_sync_delay: Duration::from_secs(10),
        }
    }
}

/// Spawn the schedule-evaluation loop. The first tick fires immediately.
pub fn spawn_schedule_loop(
    orchestrator: Arc<Orchestrator>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "schedule loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = orchestrator.evaluate_due_schedules().await {
                        error!(error = %e, "schedule evaluation tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("schedule loop stopping");
                    break;
                }
            }
        }
    })
}

/// Spawn the mailbox-sync loop. The first sync runs after
/// `startup_delay`, then on every period boundary.
pub fn spawn_sync_loop(
    orchestrator: Arc<Orchestrator>,
    period: Duration,
    startup_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = tokio::time::sleep(startup_delay) => {}
            _ = shutdown.changed() => {
                info!("sync loop stopping before first sync");
                return;
            }
        }

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "sync loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = orchestrator.sync_mailbox(false).await {
                        error!(error = %e, "mailbox sync tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("sync loop stopping");
                    break;
                }
            }
        }
    })
}
