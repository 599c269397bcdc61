//! Cron scheduler for sharesync (C7)
//!
//! Turns each enabled `SyncConfig.cron` expression into a recurring trigger
//! of that config's sync run, refreshable from the persisted config list
//! without restarting the daemon.

pub mod error;
pub mod scheduler;

pub use error::SchedulerError;
pub use scheduler::{CronScheduler, RefreshReport, SchedulerStatus, SyncRunner};
