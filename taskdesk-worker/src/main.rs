//! # Taskdesk Worker
//!
//! Entry point for the background worker. Connects to the database, runs
//! pending migrations, and starts the job scheduler:
//!
//! - Deadline reminders every 15 minutes
//! - Daily digest at 09:00 UTC
//! - External task sync every 30 minutes
//! - Retention cleanup at 03:00 UTC
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskdesk-worker
//! ```

use std::sync::Arc;

use taskdesk_shared::db;
use taskdesk_worker::mailer::LogMailer;
use taskdesk_worker::scheduler::{Scheduler, SchedulerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdesk_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Taskdesk worker v{} starting", env!("CARGO_PKG_VERSION"));

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);

    let pool = db::pool::create_pool(db::pool::DatabaseConfig {
        url: database_url,
        max_connections,
        ..Default::default()
    })
    .await?;
    db::migrations::run_migrations(&pool).await?;

    // No real transport is configured yet; deliveries go to the log.
    let scheduler = Scheduler::new(
        pool.clone(),
        Arc::new(LogMailer::new()),
        Vec::new(),
        SchedulerConfig::default(),
    );
    let shutdown = scheduler.shutdown_token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    scheduler.run().await;
    db::pool::close_pool(pool).await;
    tracing::info!("Worker exited cleanly");

    Ok(())
}
