//! Persistence layer for sharesync
//!
//! SQLite-based storage for:
//! - Accounts (C8 `accounts` table)
//! - Sync configs, the scheduler's source of truth (C8 `sync_configs` table)
//! - Sync tasks/items, an append-only run history (C6/C9 audit trail)
//! - The file-info cache backing C3's fast-recursion mode

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteStateRepository;

use thiserror::Error;

/// Errors raised by the persistence layer itself, distinct from the
/// `anyhow::Result` the `StateRepository` port methods return: these cover
/// failures in connecting to or migrating the database, and in decoding a
/// row into its domain type.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("failed to run schema migration: {0}")]
    MigrationFailed(String),

    #[error("failed to decode stored row: {0}")]
    SerializationError(String),
}
