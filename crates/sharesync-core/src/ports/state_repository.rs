//! Persistence port (C8) — typed repositories for accounts, sync configs,
//! tasks/items, and cache entries.
//!
//! Uses `anyhow::Result` because storage errors are adapter-specific
//! (SQLite today) and don't need domain-level classification at this
//! boundary; callers that need the §7 taxonomy wrap these behind a
//! use case that does the classification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    newtypes::{AccountId, SyncConfigId, SyncTaskId},
    Account, FileCache, SyncConfig, SyncTask, SyncTaskItem,
};

/// Repository for `Account` rows (`drive_account` table).
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn save(&self, account: &Account) -> anyhow::Result<()>;
    async fn get(&self, id: AccountId) -> anyhow::Result<Option<Account>>;
    async fn list(&self) -> anyhow::Result<Vec<Account>>;
    async fn delete(&self, id: AccountId) -> anyhow::Result<()>;
}

/// Repository for `SyncConfig` rows (`sync_config` table).
#[async_trait]
pub trait SyncConfigRepository: Send + Sync {
    async fn save(&self, config: &SyncConfig) -> anyhow::Result<()>;
    async fn get(&self, id: SyncConfigId) -> anyhow::Result<Option<SyncConfig>>;
    /// Every row, for `refresh_from_db`.
    async fn list_all(&self) -> anyhow::Result<Vec<SyncConfig>>;
    async fn delete(&self, id: SyncConfigId) -> anyhow::Result<()>;
    async fn record_last_sync(&self, id: SyncConfigId, at: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Repository for `SyncTask`/`SyncTaskItem` rows (append-only per run).
#[async_trait]
pub trait SyncTaskRepository: Send + Sync {
    async fn save_task(&self, task: &SyncTask) -> anyhow::Result<()>;
    async fn get_task(&self, id: SyncTaskId) -> anyhow::Result<Option<SyncTask>>;
    async fn list_tasks_for_config(&self, config_id: SyncConfigId) -> anyhow::Result<Vec<SyncTask>>;
    async fn save_item(&self, item: &mut SyncTaskItem) -> anyhow::Result<()>;
    async fn list_items_for_task(&self, task_id: SyncTaskId) -> anyhow::Result<Vec<SyncTaskItem>>;
}

/// Repository for `FileCache` rows (C3's persistent store).
#[async_trait]
pub trait FileCacheRepository: Send + Sync {
    async fn get_by_file_id(&self, account: AccountId, file_id: &str) -> anyhow::Result<Option<FileCache>>;
    async fn get_by_path(&self, account: AccountId, file_path: &str) -> anyhow::Result<Option<FileCache>>;
    async fn list_children(
        &self,
        account: AccountId,
        parent_id: &str,
        only_valid: bool,
    ) -> anyhow::Result<Vec<FileCache>>;
    async fn batch_upsert(&self, files: &[FileCache], version: &str) -> anyhow::Result<()>;
    /// Update only rows whose comparison key changed; insert rows with no
    /// matching `(account, file_id)`; leave the rest untouched unless
    /// `force`.
    async fn smart_upsert(&self, files: &[FileCache], version: &str, force: bool) -> anyhow::Result<()>;
    async fn invalidate(&self, account: AccountId, version: Option<&str>) -> anyhow::Result<()>;
    async fn clear(&self, account: AccountId, version: Option<&str>) -> anyhow::Result<()>;
    /// `true` iff at least one valid child of `parent_id` was updated
    /// within `max_age_hours`.
    async fn is_fresh(&self, account: AccountId, parent_id: &str, max_age_hours: i64) -> anyhow::Result<bool>;
}

/// One facade over the four repositories above, implemented by the cache
/// crate's SQLite-backed type and handed to the sync executor/scheduler.
pub trait StateRepository:
    AccountRepository + SyncConfigRepository + SyncTaskRepository + FileCacheRepository
{
}

impl<T> StateRepository for T where
    T: AccountRepository + SyncConfigRepository + SyncTaskRepository + FileCacheRepository
{
}
