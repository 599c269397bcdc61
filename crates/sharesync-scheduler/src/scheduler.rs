//! The cron scheduler (C7): turns each enabled `SyncConfig.cron` expression
//! into a recurring dispatch of that config's sync run.
//!
//! Grounded on `SyncTaskScheduler` (`sync_scheduler.py`), reimplemented over
//! a genuine `cron` crate rather than Celery Beat: `add`/`update`/`remove`
//! mutate an in-memory task map, `refresh_from` atomically replaces the
//! whole map (the "resync from DB" operation), and `run` drives dispatch.
//! A config already mid-run has its tick dropped, never queued, matching
//! the "one concurrent run per config_id" contract.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use sharesync_core::domain::{SyncConfig, SyncConfigId};

use crate::error::SchedulerError;

/// Implemented by whatever actually executes a sync run (C6 Sync Executor).
/// Kept as a trait here so the scheduler doesn't depend on `sharesync-sync`.
#[async_trait::async_trait]
pub trait SyncRunner: Send + Sync {
    async fn execute_sync(&self, config_id: SyncConfigId);
}

struct ScheduledEntry {
    schedule: Schedule,
    next_fire: DateTime<Utc>,
    in_flight: Arc<AtomicBool>,
}

/// How often the scheduler wakes to check for due tasks.
const TICK_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// Report returned by [`CronScheduler::refresh_from`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub total: usize,
    pub added: usize,
    pub skipped: usize,
    pub errored: usize,
}

/// A snapshot of the scheduler's current task map.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStatus {
    pub scheduled_config_ids: Vec<SyncConfigId>,
}

/// In-memory cron scheduler. One process-wide instance is shared between
/// the daemon's admin surface (`add`/`remove`/`status`) and its run loop.
#[derive(Default)]
pub struct CronScheduler {
    tasks: DashMap<SyncConfigId, ScheduledEntry>,
}

impl CronScheduler {
    pub fn new() -> Self {
        Self { tasks: DashMap::new() }
    }

    /// Parses a 5-field `minute hour day month weekday` expression into a
    /// [`Schedule`]. The `cron` crate's own grammar expects a leading
    /// seconds field, so a literal `0` is prepended.
    pub fn parse_cron(expr: &str) -> Result<Schedule, SchedulerError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(SchedulerError::WrongFieldCount(expr.to_string()));
        }

        let with_seconds = format!("0 {expr}");
        Schedule::from_str(&with_seconds)
            .map_err(|e| SchedulerError::InvalidExpression(expr.to_string(), e.to_string()))
    }

    /// Validates a cron expression and, if valid, returns its next
    /// scheduled fire time.
    pub fn validate(expr: &str) -> Result<DateTime<Utc>, SchedulerError> {
        let schedule = Self::parse_cron(expr)?;
        schedule
            .after(&Utc::now())
            .next()
            .ok_or_else(|| SchedulerError::InvalidExpression(expr.to_string(), "no upcoming fire time".to_string()))
    }

    /// Adds `config` to the schedule. Fails if the config is disabled, has
    /// no cron expression, or the expression doesn't parse.
    pub fn add(&self, config: &SyncConfig) -> Result<(), SchedulerError> {
        if !config.enable() {
            return Err(SchedulerError::Disabled(config.id().to_string()));
        }
        let cron_expr = config
            .cron()
            .ok_or_else(|| SchedulerError::MissingCron(config.id().to_string()))?;
        let schedule = Self::parse_cron(cron_expr)?;
        let next_fire = schedule.after(&Utc::now()).next().unwrap_or_else(far_future);

        self.tasks.insert(
            config.id(),
            ScheduledEntry { schedule, next_fire, in_flight: Arc::new(AtomicBool::new(false)) },
        );
        debug!(config_id = %config.id(), cron = cron_expr, "scheduled sync config");
        Ok(())
    }

    pub fn remove(&self, config_id: SyncConfigId) {
        self.tasks.remove(&config_id);
    }

    pub fn update(&self, config: &SyncConfig) -> Result<(), SchedulerError> {
        self.remove(config.id());
        self.add(config)
    }

    pub fn clear(&self) {
        self.tasks.clear();
    }

    /// Atomically replaces the whole schedule with `configs`'s enabled,
    /// cron-bearing entries.
    pub fn refresh_from(&self, configs: &[SyncConfig]) -> RefreshReport {
        self.clear();
        let mut report = RefreshReport { total: configs.len(), ..Default::default() };

        for config in configs {
            if !config.enable() || config.cron().is_none() {
                report.skipped += 1;
                continue;
            }
            match self.add(config) {
                Ok(()) => report.added += 1,
                Err(_) => report.errored += 1,
            }
        }

        info!(total = report.total, added = report.added, skipped = report.skipped, errored = report.errored, "refreshed scheduler from config list");
        report
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus { scheduled_config_ids: self.tasks.iter().map(|e| *e.key()).collect() }
    }

    /// Drives dispatch until `cancel` fires.
    pub async fn run(&self, runner: Arc<dyn SyncRunner>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("scheduler loop shutting down");
                    return;
                }
                _ = interval.tick() => {
                    self.dispatch_due(&runner);
                }
            }
        }
    }

    fn dispatch_due(&self, runner: &Arc<dyn SyncRunner>) {
        let now = Utc::now();

        for mut entry in self.tasks.iter_mut() {
            if entry.next_fire > now {
                continue;
            }
            let config_id = *entry.key();
            entry.next_fire = entry.schedule.after(&now).next().unwrap_or_else(far_future);

            if entry.in_flight.swap(true, Ordering::SeqCst) {
                debug!(%config_id, "previous run still in flight, dropping tick");
                continue;
            }

            let runner = Arc::clone(runner);
            let in_flight = Arc::clone(&entry.in_flight);
            tokio::spawn(async move {
                runner.execute_sync(config_id).await;
                in_flight.store(false, Ordering::SeqCst);
            });
        }
    }
}

fn far_future() -> DateTime<Utc> {
    Utc::now() + chrono::Duration::days(365 * 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharesync_core::domain::{AccountId, DriveType, SourceMeta, SourceType, SyncConfig, SyncMethod};

    fn test_config(cron: Option<&str>, enable: bool) -> SyncConfig {
        let src_meta = SourceMeta { source_type: SourceType::Friend, source_id: "s1".to_string(), ext_params: Default::default() };
        let mut config = SyncConfig::new(DriveType::BaiduDrive, AccountId::new(), "/shared", src_meta, "/local", SyncMethod::Incremental);
        config.set_enable(enable);
        if let Some(cron) = cron {
            config = SyncConfig::with_id(
                config.id(),
                config.drive_type(),
                config.account_id(),
                config.enable(),
                config.src_path().to_string(),
                config.src_meta().clone(),
                config.dst_path().to_string(),
                config.dst_meta().clone(),
                config.method(),
                config.recursion_speed(),
                Some(cron.to_string()),
                config.end_time(),
                config.exclude().to_vec(),
                config.rename().to_vec(),
                config.last_sync(),
            );
        }
        config
    }

    #[test]
    fn parse_cron_rejects_wrong_field_count() {
        let err = CronScheduler::parse_cron("* * *").unwrap_err();
        assert!(matches!(err, SchedulerError::WrongFieldCount(_)));
    }

    #[test]
    fn parse_cron_accepts_five_field_expression() {
        assert!(CronScheduler::parse_cron("*/5 * * * *").is_ok());
    }

    #[test]
    fn validate_returns_next_fire_time() {
        let next = CronScheduler::validate("0 0 * * *").unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn add_rejects_disabled_config() {
        let scheduler = CronScheduler::new();
        let config = test_config(Some("*/5 * * * *"), false);
        assert!(matches!(scheduler.add(&config), Err(SchedulerError::Disabled(_))));
    }

    #[test]
    fn add_rejects_missing_cron() {
        let scheduler = CronScheduler::new();
        let config = test_config(None, true);
        assert!(matches!(scheduler.add(&config), Err(SchedulerError::MissingCron(_))));
    }

    #[test]
    fn add_then_status_reports_config() {
        let scheduler = CronScheduler::new();
        let config = test_config(Some("*/5 * * * *"), true);
        scheduler.add(&config).unwrap();
        assert_eq!(scheduler.status().scheduled_config_ids, vec![config.id()]);
    }

    #[test]
    fn remove_drops_config_from_status() {
        let scheduler = CronScheduler::new();
        let config = test_config(Some("*/5 * * * *"), true);
        scheduler.add(&config).unwrap();
        scheduler.remove(config.id());
        assert!(scheduler.status().scheduled_config_ids.is_empty());
    }

    #[test]
    fn refresh_from_skips_disabled_and_cronless_configs() {
        let scheduler = CronScheduler::new();
        let configs = vec![
            test_config(Some("*/5 * * * *"), true),
            test_config(None, true),
            test_config(Some("*/5 * * * *"), false),
        ];
        let report = scheduler.refresh_from(&configs);
        assert_eq!(report.total, 3);
        assert_eq!(report.added, 1);
        assert_eq!(report.skipped, 2);
    }
}
