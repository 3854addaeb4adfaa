//! Shard Sweeper
//!
//! Background service running the expiry notification sweeps: the 3-day,
//! 1-day and expired thresholds plus the independent legacy 2-day sweep.
//! Sweeps run on a fixed interval and shut down cooperatively, with a
//! bounded grace period before the process exits.

mod config;
mod notifier;

use std::sync::Arc;
use std::time::Duration;

use shard_db::Repositories;
use shard_subscription_core::NotificationSweeper;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::notifier::TelegramNotifier;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("sweeper=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Shard Sweeper");

    let config = Config::from_env()?;
    tracing::info!(
        interval = ?config.core.sweep_interval,
        "Configuration loaded"
    );

    let pool = shard_db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    let repos = Repositories::new(pool);
    let notifier = Arc::new(TelegramNotifier::new(&config.bot_token));
    let sweeper = Arc::new(NotificationSweeper::new(
        config.core.clone(),
        Arc::new(repos.subscribers),
        notifier,
    ));

    let shutdown = CancellationToken::new();
    let task = tokio::spawn({
        let sweeper = sweeper.clone();
        let shutdown = shutdown.clone();
        async move { sweeper.run(shutdown).await }
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.cancel();

    // Give the in-flight sweep a bounded window to finish.
    if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
        tracing::warn!("Sweep task did not stop within grace period");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
