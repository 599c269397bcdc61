//! sharesync daemon — loads configuration, opens the SQLite state store,
//! refreshes the cron scheduler from persisted `sync_config` rows, and runs
//! dispatch until `SIGINT`/`SIGTERM`.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sharesync_audit::TaskLogger;
use sharesync_cache::{DatabasePool, SqliteStateRepository};
use sharesync_core::config::Config;
use sharesync_core::domain::SyncConfigId;
use sharesync_providers::DriveManager;
use sharesync_scheduler::{CronScheduler, SyncRunner};
use sharesync_sync::SyncExecutor;

/// Adapts [`SyncExecutor`] to the scheduler's [`SyncRunner`] port so
/// `sharesync-scheduler` never needs to depend on `sharesync-sync`.
struct ExecutorRunner {
    executor: SyncExecutor,
}

#[async_trait]
impl SyncRunner for ExecutorRunner {
    async fn execute_sync(&self, config_id: SyncConfigId) {
        match self.executor.run(config_id).await {
            Ok(task) => {
                tracing::info!(%config_id, task_id = %task.id(), status = ?task.status(), "sync run finished");
            }
            Err(err) => {
                tracing::error!(%config_id, error = %err, "failed to persist sync task");
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load_or_default(&Config::default_path());
    init_logging(&config.logging);

    if let Err(errors) = validate_or_report(&config) {
        for err in errors {
            tracing::error!(%err, "invalid configuration");
        }
        anyhow::bail!("configuration validation failed");
    }

    tracing::info!(path = %config.database.path.display(), "opening state store");
    let pool = DatabasePool::new(&config.database.path, config.database.max_connections)
        .await
        .context("failed to open database pool")?;
    let state: Arc<SqliteStateRepository> = Arc::new(SqliteStateRepository::new(pool.pool().clone()));

    let drive_manager = Arc::new(DriveManager::new(
        std::time::Duration::from_secs(config.providers.client_max_idle_secs),
        std::time::Duration::from_secs(config.providers.client_cleanup_interval_secs),
    ));

    let executor = SyncExecutor::new(
        Arc::clone(&drive_manager),
        Arc::clone(&state) as _,
        Arc::clone(&state) as _,
        TaskLogger::new(Arc::clone(&state) as _),
        Arc::clone(&state) as _,
    );

    let scheduler = Arc::new(CronScheduler::new());
    let configs = sharesync_core::ports::SyncConfigRepository::list_all(state.as_ref())
        .await
        .context("failed to load sync configs")?;
    let report = scheduler.refresh_from(&configs);
    tracing::info!(
        total = report.total,
        added = report.added,
        skipped = report.skipped,
        errored = report.errored,
        "scheduler refreshed from persisted configs"
    );

    let runner: Arc<dyn SyncRunner> = Arc::new(ExecutorRunner { executor });
    let cancel = CancellationToken::new();

    let run_loop = {
        let scheduler = Arc::clone(&scheduler);
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(runner, cancel).await })
    };

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping scheduler");
    cancel.cancel();
    run_loop.await.context("scheduler loop panicked")?;

    Ok(())
}

fn init_logging(logging: &sharesync_core::config::LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn validate_or_report(config: &Config) -> Result<(), Vec<sharesync_core::config::ValidationError>> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
