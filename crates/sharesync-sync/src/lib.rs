//! Diff engine (C5) and sync executor (C6) for sharesync.
//!
//! [`diff::compare`] reconciles a source listing against a target listing
//! into the operations needed to bring the target in line; [`SyncExecutor`]
//! runs those operations against a [`sharesync_providers::DriveManager`]
//! client and records the outcome as a `SyncTask`.

pub mod diff;
pub mod executor;

pub use diff::{AddItem, DiffResult};
pub use executor::{ExecutorError, SyncExecutor};
