use thiserror::Error;

/// Errors raised by the cron scheduler itself, distinct from errors a sync
/// run produces (those live inside the run's `SyncTask.err_msg`).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("cron expression must have 5 fields (minute hour day month weekday): '{0}'")]
    WrongFieldCount(String),

    #[error("invalid cron expression '{0}': {1}")]
    InvalidExpression(String, String),

    #[error("sync config {0} has no cron expression")]
    MissingCron(String),

    #[error("sync config {0} is disabled")]
    Disabled(String),
}
