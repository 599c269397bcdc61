//! Sync command - Run and inspect scheduled share-to-disk sync jobs
//!
//! Provides the `sharesync sync` CLI subcommands which:
//! 1. `exec`   - Runs one `SyncConfig` to completion, the same entry point
//!    the daemon's scheduler dispatches into.
//! 2. `status` - Lists configured sync jobs, or the task history for one.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use sharesync_audit::TaskLogger;
use sharesync_core::config::Config;
use sharesync_core::domain::newtypes::{SyncConfigId, SyncTaskId};
use sharesync_core::ports::{AccountRepository, FileCacheRepository, SyncConfigRepository, SyncTaskRepository};
use sharesync_providers::DriveManager;
use sharesync_sync::SyncExecutor;

use crate::commands::open_state;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum SyncCommand {
    /// Run one sync config to completion
    Exec(ExecArgs),
    /// Show configured sync jobs or one job's run history
    Status(StatusArgs),
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Id of the `SyncConfig` to run
    #[arg(long)]
    pub config_id: SyncConfigId,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Show run history for this config instead of the full job list
    #[arg(long)]
    pub config_id: Option<SyncConfigId>,

    /// Show one task in detail, including its per-item outcomes
    #[arg(long)]
    pub task_id: Option<SyncTaskId>,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            SyncCommand::Exec(args) => args.execute(format).await,
            SyncCommand::Status(args) => args.execute(format).await,
        }
    }
}

impl ExecArgs {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let config = Config::load_or_default(&Config::default_path());
        let state = open_state().await?;

        let drive_manager = Arc::new(DriveManager::new(
            std::time::Duration::from_secs(config.providers.client_max_idle_secs),
            std::time::Duration::from_secs(config.providers.client_cleanup_interval_secs),
        ));
        let executor = SyncExecutor::new(
            drive_manager,
            Arc::clone(&state) as Arc<dyn AccountRepository>,
            Arc::clone(&state) as Arc<dyn SyncConfigRepository>,
            TaskLogger::new(Arc::clone(&state) as Arc<dyn SyncTaskRepository>),
            Arc::clone(&state) as Arc<dyn FileCacheRepository>,
        );

        info!(config_id = %self.config_id, "running sync config");
        let task = executor
            .run(self.config_id)
            .await
            .context("failed to persist sync task")?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "task_id": task.id().to_string(),
                "config_id": task.config_id().to_string(),
                "status": format!("{:?}", task.status()),
                "duration_ms": task.dura_time_ms(),
                "error": task.err_msg(),
                "counters": task.task_num(),
            }));
        } else {
            formatter.success(&format!("Sync run finished: {:?}", task.status()));
            formatter.info(&format!("Task:     {}", task.id()));
            if let Some(ms) = task.dura_time_ms() {
                formatter.info(&format!("Duration: {ms} ms"));
            }
            let counters = task.task_num();
            formatter.info(&format!(
                "Added:    {} ok / {} failed",
                counters.added_success, counters.added_fail
            ));
            formatter.info(&format!(
                "Deleted:  {} ok / {} failed",
                counters.deleted_success, counters.deleted_fail
            ));
            if let Some(err) = task.err_msg() {
                formatter.error(err);
            }
        }

        Ok(())
    }
}

impl StatusArgs {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let state = open_state().await?;

        if let Some(task_id) = self.task_id {
            let task = SyncTaskRepository::get_task(state.as_ref(), task_id)
                .await
                .context("failed to query task")?
                .with_context(|| format!("no task with id {task_id}"))?;
            let items = SyncTaskRepository::list_items_for_task(state.as_ref(), task_id)
                .await
                .context("failed to query task items")?;

            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({
                    "task_id": task.id().to_string(),
                    "config_id": task.config_id().to_string(),
                    "status": format!("{:?}", task.status()),
                    "counters": task.task_num(),
                    "items": items.iter().map(|item| serde_json::json!({
                        "op_type": format!("{:?}", item.op_type()),
                        "src_path": item.src_path(),
                        "dst_path": item.dst_path(),
                        "status": format!("{:?}", item.status()),
                        "error": item.err_msg(),
                    })).collect::<Vec<_>>(),
                }));
            } else {
                formatter.success(&format!("Task {} ({:?})", task.id(), task.status()));
                for item in &items {
                    let line = format!(
                        "  [{:?}] {:?} {} -> {}",
                        item.status(),
                        item.op_type(),
                        item.src_path(),
                        item.dst_path()
                    );
                    formatter.info(&line);
                }
            }
            return Ok(());
        }

        if let Some(config_id) = self.config_id {
            let tasks = SyncTaskRepository::list_tasks_for_config(state.as_ref(), config_id)
                .await
                .context("failed to query task history")?;

            if matches!(format, OutputFormat::Json) {
                let json_tasks: Vec<_> = tasks
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "task_id": t.id().to_string(),
                            "status": format!("{:?}", t.status()),
                            "start_time": t.start_time().to_rfc3339(),
                            "duration_ms": t.dura_time_ms(),
                        })
                    })
                    .collect();
                formatter.print_json(&serde_json::json!({ "config_id": config_id.to_string(), "tasks": json_tasks }));
            } else {
                formatter.success(&format!("Run history for {config_id}"));
                for t in &tasks {
                    formatter.info(&format!(
                        "  {} [{:?}] started {}",
                        t.id(),
                        t.status(),
                        t.start_time().format("%Y-%m-%d %H:%M:%S UTC")
                    ));
                }
            }
            return Ok(());
        }

        let configs = SyncConfigRepository::list_all(state.as_ref())
            .await
            .context("failed to query sync configs")?;

        if matches!(format, OutputFormat::Json) {
            let json_configs: Vec<_> = configs
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id().to_string(),
                        "drive_type": c.drive_type().as_wire(),
                        "src_path": c.src_path(),
                        "dst_path": c.dst_path(),
                        "enable": c.enable(),
                        "cron": c.cron(),
                        "last_sync": c.last_sync().map(|t| t.to_rfc3339()),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({ "configs": json_configs }));
        } else {
            formatter.success(&format!("{} sync job(s) configured", configs.len()));
            for c in &configs {
                let state = if c.enable() { "enabled" } else { "disabled" };
                formatter.info(&format!(
                    "  {} [{}] {} -> {} ({})",
                    c.id(),
                    state,
                    c.src_path(),
                    c.dst_path(),
                    c.cron().unwrap_or("no schedule")
                ));
            }
        }

        Ok(())
    }
}
