//! Scheduler command - Validate cron expressions and inspect the would-be
//! schedule derived from persisted sync configs.
//!
//! The daemon owns the live, long-running [`sharesync_scheduler::CronScheduler`]
//! instance; this CLI is a one-shot process, so `refresh`/`status` build a
//! throwaway scheduler from the current database contents rather than
//! reaching into a running daemon.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use sharesync_core::ports::SyncConfigRepository;
use sharesync_scheduler::CronScheduler;

use crate::commands::open_state;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum SchedulerCommand {
    /// Recompute the schedule from persisted sync configs
    Refresh,
    /// Validate a cron expression and show its next fire time
    Validate(ValidateArgs),
    /// Show which configs would be scheduled right now
    Status,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// A 5-field cron expression (minute hour day-of-month month day-of-week)
    pub expression: String,
}

impl SchedulerCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        match self {
            SchedulerCommand::Refresh | SchedulerCommand::Status => {
                let state = open_state().await?;
                let configs = SyncConfigRepository::list_all(state.as_ref())
                    .await
                    .context("failed to query sync configs")?;

                let scheduler = CronScheduler::new();
                let report = scheduler.refresh_from(&configs);
                let status = scheduler.status();

                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({
                        "total": report.total,
                        "added": report.added,
                        "skipped": report.skipped,
                        "errored": report.errored,
                        "scheduled_config_ids": status.scheduled_config_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                    }));
                } else {
                    formatter.success(&format!(
                        "{} config(s): {} scheduled, {} skipped, {} errored",
                        report.total, report.added, report.skipped, report.errored
                    ));
                    for id in &status.scheduled_config_ids {
                        formatter.info(&format!("  {id}"));
                    }
                }
            }

            SchedulerCommand::Validate(args) => match CronScheduler::validate(&args.expression) {
                Ok(next) => {
                    if matches!(format, OutputFormat::Json) {
                        formatter.print_json(&serde_json::json!({
                            "valid": true,
                            "expression": args.expression,
                            "next_fire": next.to_rfc3339(),
                        }));
                    } else {
                        formatter.success(&format!("Valid: {}", args.expression));
                        formatter.info(&format!("Next fire: {}", next.format("%Y-%m-%d %H:%M:%S UTC")));
                    }
                }
                Err(err) => {
                    if matches!(format, OutputFormat::Json) {
                        formatter.print_json(&serde_json::json!({
                            "valid": false,
                            "expression": args.expression,
                            "error": err.to_string(),
                        }));
                    } else {
                        formatter.error(&format!("Invalid cron expression: {err}"));
                    }
                }
            },
        }

        Ok(())
    }
}
