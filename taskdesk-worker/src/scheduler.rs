//! Job scheduler
//!
//! Drives the background jobs on fixed cadences: the deadline check every
//! 15 minutes, the external sync every 30 minutes, and the digest and
//! cleanup once a day at fixed hours. Each job runs in its own loop so a
//! failing job delays only itself, and every loop honors the shutdown
//! token so the worker stops cleanly.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::jobs;
use crate::mailer::Mailer;

/// Scheduler cadences, overridable for tests
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often the deadline check runs
    pub deadline_interval: Duration,

    /// How often the external sync runs
    pub sync_interval: Duration,

    /// UTC hour at which the daily digest goes out
    pub digest_hour: u32,

    /// UTC hour at which retention cleanup runs
    pub cleanup_hour: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            deadline_interval: Duration::from_secs(15 * 60),
            sync_interval: Duration::from_secs(30 * 60),
            digest_hour: 9,
            cleanup_hour: 3,
        }
    }
}

/// Owns the job loops and the shutdown token
pub struct Scheduler {
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    sync_sources: Arc<Vec<Box<dyn jobs::sync::SyncSource>>>,
    config: SchedulerConfig,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        pool: PgPool,
        mailer: Arc<dyn Mailer>,
        sync_sources: Vec<Box<dyn jobs::sync::SyncSource>>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            pool,
            mailer,
            sync_sources: Arc::new(sync_sources),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token callers can cancel to stop every job loop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs all job loops until the shutdown token fires
    pub async fn run(&self) {
        info!(
            deadline_interval_secs = self.config.deadline_interval.as_secs(),
            sync_interval_secs = self.config.sync_interval.as_secs(),
            digest_hour = self.config.digest_hour,
            cleanup_hour = self.config.cleanup_hour,
            "Scheduler starting"
        );

        tokio::join!(
            self.deadline_loop(),
            self.sync_loop(),
            self.digest_loop(),
            self.cleanup_loop(),
        );

        info!("Scheduler stopped");
    }

    async fn deadline_loop(&self) {
        let mut ticker = interval(self.config.deadline_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match jobs::deadline::run(&self.pool, self.mailer.as_ref()).await {
                        Ok(sent) if sent > 0 => info!(sent, "Deadline check sent reminders"),
                        Ok(_) => {}
                        Err(err) => error!(error = %err, "Deadline check failed"),
                    }
                }
            }
        }
    }

    async fn sync_loop(&self) {
        let mut ticker = interval(self.config.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match jobs::sync::run(&self.pool, &self.sync_sources).await {
                        Ok(imported) if imported > 0 => info!(imported, "External sync imported tasks"),
                        Ok(_) => {}
                        Err(err) => error!(error = %err, "External sync failed"),
                    }
                }
            }
        }
    }

    async fn digest_loop(&self) {
        loop {
            let wait = until_next_hour(Utc::now(), self.config.digest_hour);
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = sleep(wait) => {
                    match jobs::digest::run(&self.pool, self.mailer.as_ref()).await {
                        Ok(sent) => info!(sent, "Daily digest sent"),
                        Err(err) => error!(error = %err, "Daily digest failed"),
                    }
                }
            }
        }
    }

    async fn cleanup_loop(&self) {
        loop {
            let wait = until_next_hour(Utc::now(), self.config.cleanup_hour);
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = sleep(wait) => {
                    if let Err(err) = jobs::cleanup::run(&self.pool).await {
                        error!(error = %err, "Retention cleanup failed");
                    }
                }
            }
        }
    }
}

/// Time until the next occurrence of `hour:00` UTC, always in the future
/// so daily loops never fire twice in one day
fn until_next_hour(now: DateTime<Utc>, hour: u32) -> Duration {
    let today_target = now
        .date_naive()
        .and_hms_opt(hour, 0, 0)
        .map(|naive| naive.and_utc());

    let target = match today_target {
        Some(t) if t > now => t,
        Some(t) => t + chrono::Duration::days(1),
        // Unreachable for hour < 24; fall back to a day from now.
        None => now + chrono::Duration::days(1),
    };

    (target - now).to_std().unwrap_or(Duration::from_secs(60))
}
