//! SQLite implementation of the C8 persistence port.
//!
//! One `SqliteStateRepository` implements all four repository traits
//! (`AccountRepository`, `SyncConfigRepository`, `SyncTaskRepository`,
//! `FileCacheRepository`); `StateRepository` is their blanket union.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use sharesync_core::domain::drive_type::DriveType;
use sharesync_core::domain::newtypes::{AccountId, FileCacheId, SyncConfigId, SyncTaskId, SyncTaskItemId};
use sharesync_core::domain::rules::{ExclusionRule, RenameRule};
use sharesync_core::domain::sync_config::{DestMeta, RecursionSpeed, SourceMeta, SyncMethod};
use sharesync_core::domain::sync_task::{ItemOpType, ItemStatus, TaskCounters, TaskStatus};
use sharesync_core::domain::{Account, FileCache, SyncConfig, SyncTask, SyncTaskItem};
use sharesync_core::ports::{AccountRepository, FileCacheRepository, SyncConfigRepository, SyncTaskRepository};

use crate::CacheError;

/// SQLite-based implementation of the C8 persistence port.
pub struct SqliteStateRepository {
    pool: SqlitePool,
}

impl SqliteStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CacheError::SerializationError(format!("invalid timestamp '{s}': {e}")))
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

fn task_status_to_string(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Running => "running",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn task_status_from_string(s: &str) -> Result<TaskStatus, CacheError> {
    match s {
        "pending" => Ok(TaskStatus::Pending),
        "running" => Ok(TaskStatus::Running),
        "completed" => Ok(TaskStatus::Completed),
        "failed" => Ok(TaskStatus::Failed),
        "cancelled" => Ok(TaskStatus::Cancelled),
        other => Err(CacheError::SerializationError(format!("unknown task status: {other}"))),
    }
}

fn item_op_type_to_string(op: ItemOpType) -> &'static str {
    match op {
        ItemOpType::Create => "create",
        ItemOpType::Copy => "copy",
        ItemOpType::Move => "move",
        ItemOpType::Delete => "delete",
        ItemOpType::Rename => "rename",
    }
}

fn item_op_type_from_string(s: &str) -> Result<ItemOpType, CacheError> {
    match s {
        "create" => Ok(ItemOpType::Create),
        "copy" => Ok(ItemOpType::Copy),
        "move" => Ok(ItemOpType::Move),
        "delete" => Ok(ItemOpType::Delete),
        "rename" => Ok(ItemOpType::Rename),
        other => Err(CacheError::SerializationError(format!("unknown item op type: {other}"))),
    }
}

fn item_status_to_string(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Pending => "pending",
        ItemStatus::Running => "running",
        ItemStatus::Completed => "completed",
        ItemStatus::Failed => "failed",
    }
}

fn item_status_from_string(s: &str) -> Result<ItemStatus, CacheError> {
    match s {
        "pending" => Ok(ItemStatus::Pending),
        "running" => Ok(ItemStatus::Running),
        "completed" => Ok(ItemStatus::Completed),
        "failed" => Ok(ItemStatus::Failed),
        other => Err(CacheError::SerializationError(format!("unknown item status: {other}"))),
    }
}

fn method_to_string(method: SyncMethod) -> &'static str {
    match method {
        SyncMethod::Incremental => "incremental",
        SyncMethod::Full => "full",
        SyncMethod::Overwrite => "overwrite",
    }
}

fn method_from_string(s: &str) -> Result<SyncMethod, CacheError> {
    match s {
        "incremental" => Ok(SyncMethod::Incremental),
        "full" => Ok(SyncMethod::Full),
        "overwrite" => Ok(SyncMethod::Overwrite),
        other => Err(CacheError::SerializationError(format!("unknown sync method: {other}"))),
    }
}

fn speed_to_string(speed: RecursionSpeed) -> &'static str {
    match speed {
        RecursionSpeed::Normal => "normal",
        RecursionSpeed::Slow => "slow",
        RecursionSpeed::Fast => "fast",
    }
}

fn speed_from_string(s: &str) -> Result<RecursionSpeed, CacheError> {
    match s {
        "normal" => Ok(RecursionSpeed::Normal),
        "slow" => Ok(RecursionSpeed::Slow),
        "fast" => Ok(RecursionSpeed::Fast),
        other => Err(CacheError::SerializationError(format!("unknown recursion speed: {other}"))),
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn account_from_row(row: &SqliteRow) -> Result<Account, CacheError> {
    let id_str: String = row.get("id");
    let drive_type_str: String = row.get("drive_type");
    let remote_user_id: String = row.get("remote_user_id");
    let display_name: String = row.get("display_name");
    let credentials: String = row.get("credentials");
    let quota_used: i64 = row.get("quota_used");
    let quota_total: i64 = row.get("quota_total");
    let is_vip: i64 = row.get("is_vip");
    let is_supervip: i64 = row.get("is_supervip");
    let is_valid: i64 = row.get("is_valid");
    let created_at_str: String = row.get("created_at");

    let id = id_str
        .parse::<AccountId>()
        .map_err(|e| CacheError::SerializationError(format!("invalid account id '{id_str}': {e}")))?;
    let drive_type = DriveType::from_wire(&drive_type_str)
        .map_err(|e| CacheError::SerializationError(format!("invalid drive type: {e}")))?;
    let created_at = parse_datetime(&created_at_str)?;

    Ok(Account::with_id(
        id,
        drive_type,
        remote_user_id,
        display_name,
        credentials,
        quota_used as u64,
        quota_total as u64,
        is_vip != 0,
        is_supervip != 0,
        is_valid != 0,
        created_at,
    ))
}

fn sync_config_from_row(row: &SqliteRow) -> Result<SyncConfig, CacheError> {
    let id_str: String = row.get("id");
    let drive_type_str: String = row.get("drive_type");
    let account_id_str: String = row.get("account_id");
    let enable: i64 = row.get("enable");
    let src_path: String = row.get("src_path");
    let src_meta_str: String = row.get("src_meta");
    let dst_path: String = row.get("dst_path");
    let dst_meta_str: String = row.get("dst_meta");
    let method_str: String = row.get("method");
    let recursion_speed_str: String = row.get("recursion_speed");
    let cron: Option<String> = row.get("cron");
    let end_time_str: Option<String> = row.get("end_time");
    let exclude_str: String = row.get("exclude");
    let rename_str: String = row.get("rename");
    let last_sync_str: Option<String> = row.get("last_sync");

    let id = id_str
        .parse::<SyncConfigId>()
        .map_err(|e| CacheError::SerializationError(format!("invalid sync config id '{id_str}': {e}")))?;
    let drive_type = DriveType::from_wire(&drive_type_str)
        .map_err(|e| CacheError::SerializationError(format!("invalid drive type: {e}")))?;
    let account_id = account_id_str
        .parse::<AccountId>()
        .map_err(|e| CacheError::SerializationError(format!("invalid account id '{account_id_str}': {e}")))?;
    let src_meta: SourceMeta = serde_json::from_str(&src_meta_str)
        .map_err(|e| CacheError::SerializationError(format!("invalid src_meta JSON: {e}")))?;
    let dst_meta: DestMeta = serde_json::from_str(&dst_meta_str)
        .map_err(|e| CacheError::SerializationError(format!("invalid dst_meta JSON: {e}")))?;
    let exclude: Vec<ExclusionRule> = serde_json::from_str(&exclude_str)
        .map_err(|e| CacheError::SerializationError(format!("invalid exclude JSON: {e}")))?;
    let rename: Vec<RenameRule> = serde_json::from_str(&rename_str)
        .map_err(|e| CacheError::SerializationError(format!("invalid rename JSON: {e}")))?;
    let method = method_from_string(&method_str)?;
    let recursion_speed = speed_from_string(&recursion_speed_str)?;
    let end_time = parse_optional_datetime(end_time_str)?;
    let last_sync = parse_optional_datetime(last_sync_str)?;

    Ok(SyncConfig::with_id(
        id,
        drive_type,
        account_id,
        enable != 0,
        src_path,
        src_meta,
        dst_path,
        dst_meta,
        method,
        recursion_speed,
        cron,
        end_time,
        exclude,
        rename,
        last_sync,
    ))
}

fn sync_task_from_row(row: &SqliteRow) -> Result<SyncTask, CacheError> {
    let id_str: String = row.get("id");
    let config_id_str: String = row.get("config_id");
    let status_str: String = row.get("status");
    let start_time_str: String = row.get("start_time");
    let dura_time_ms: Option<i64> = row.get("dura_time_ms");
    let err_msg: Option<String> = row.get("err_msg");
    let task_num_str: String = row.get("task_num");

    let id = id_str
        .parse::<SyncTaskId>()
        .map_err(|e| CacheError::SerializationError(format!("invalid sync task id '{id_str}': {e}")))?;
    let config_id = config_id_str
        .parse::<SyncConfigId>()
        .map_err(|e| CacheError::SerializationError(format!("invalid sync config id '{config_id_str}': {e}")))?;
    let status = task_status_from_string(&status_str)?;
    let start_time = parse_datetime(&start_time_str)?;
    let task_num: TaskCounters = serde_json::from_str(&task_num_str)
        .map_err(|e| CacheError::SerializationError(format!("invalid task_num JSON: {e}")))?;

    Ok(SyncTask::with_id(
        id,
        config_id,
        status,
        start_time,
        dura_time_ms.map(|d| d as u64),
        err_msg,
        task_num,
    ))
}

fn sync_task_item_from_row(row: &SqliteRow) -> Result<SyncTaskItem, CacheError> {
    let id: i64 = row.get("id");
    let task_id_str: String = row.get("task_id");
    let op_type_str: String = row.get("op_type");
    let src_path: String = row.get("src_path");
    let dst_path: String = row.get("dst_path");
    let file_name: String = row.get("file_name");
    let file_size: i64 = row.get("file_size");
    let status_str: String = row.get("status");
    let err_msg: Option<String> = row.get("err_msg");

    let task_id = task_id_str
        .parse::<SyncTaskId>()
        .map_err(|e| CacheError::SerializationError(format!("invalid sync task id '{task_id_str}': {e}")))?;
    let op_type = item_op_type_from_string(&op_type_str)?;
    let status = item_status_from_string(&status_str)?;

    Ok(SyncTaskItem::with_id(
        SyncTaskItemId::new(id),
        task_id,
        op_type,
        src_path,
        dst_path,
        file_name,
        file_size as u64,
        status,
        err_msg,
    ))
}

fn file_cache_from_row(row: &SqliteRow) -> Result<FileCache, CacheError> {
    let id: i64 = row.get("id");
    let drive_account_id_str: String = row.get("drive_account_id");
    let file_id: String = row.get("file_id");
    let file_name: String = row.get("file_name");
    let file_path: String = row.get("file_path");
    let parent_id: Option<String> = row.get("parent_id");
    let is_folder: i64 = row.get("is_folder");
    let file_size: i64 = row.get("file_size");
    let file_created_at_str: Option<String> = row.get("file_created_at");
    let file_updated_at_str: Option<String> = row.get("file_updated_at");
    let file_ext_str: String = row.get("file_ext");
    let cache_version: String = row.get("cache_version");

    let drive_account_id = drive_account_id_str.parse::<AccountId>().map_err(|e| {
        CacheError::SerializationError(format!("invalid account id '{drive_account_id_str}': {e}"))
    })?;
    let file_created_at = parse_optional_datetime(file_created_at_str)?;
    let file_updated_at = parse_optional_datetime(file_updated_at_str)?;
    let file_ext: serde_json::Value = serde_json::from_str(&file_ext_str)
        .map_err(|e| CacheError::SerializationError(format!("invalid file_ext JSON: {e}")))?;

    let mut cache = FileCache::new(
        drive_account_id,
        file_id,
        file_name,
        file_path,
        parent_id,
        is_folder != 0,
        file_size as u64,
        file_created_at,
        file_updated_at,
        file_ext,
        cache_version,
    );
    cache.assign_id(FileCacheId::new(id));
    Ok(cache)
}

// ============================================================================
// AccountRepository
// ============================================================================

#[async_trait::async_trait]
impl AccountRepository for SqliteStateRepository {
    async fn save(&self, account: &Account) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO accounts \
             (id, drive_type, remote_user_id, display_name, credentials, \
              quota_used, quota_total, is_vip, is_supervip, is_valid, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               drive_type = excluded.drive_type, \
               remote_user_id = excluded.remote_user_id, \
               display_name = excluded.display_name, \
               credentials = excluded.credentials, \
               quota_used = excluded.quota_used, \
               quota_total = excluded.quota_total, \
               is_vip = excluded.is_vip, \
               is_supervip = excluded.is_supervip, \
               is_valid = excluded.is_valid",
        )
        .bind(account.id().to_string())
        .bind(account.drive_type().as_wire())
        .bind(account.remote_user_id())
        .bind(account.display_name())
        .bind(account.credentials())
        .bind(account.quota_used() as i64)
        .bind(account.quota_total() as i64)
        .bind(account.is_vip() as i64)
        .bind(account.is_supervip() as i64)
        .bind(account.is_valid() as i64)
        .bind(account.created_at().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::trace!(account_id = %account.id(), "saved account");
        Ok(())
    }

    async fn get(&self, id: AccountId) -> anyhow::Result<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(account_from_row).transpose().map_err(Into::into)
    }

    async fn list(&self) -> anyhow::Result<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(account_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn delete(&self, id: AccountId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// SyncConfigRepository
// ============================================================================

#[async_trait::async_trait]
impl SyncConfigRepository for SqliteStateRepository {
    async fn save(&self, config: &SyncConfig) -> anyhow::Result<()> {
        let src_meta = serde_json::to_string(config.src_meta())?;
        let dst_meta = serde_json::to_string(config.dst_meta())?;
        let exclude = serde_json::to_string(config.exclude())?;
        let rename = serde_json::to_string(config.rename())?;

        sqlx::query(
            "INSERT INTO sync_configs \
             (id, drive_type, account_id, enable, src_path, src_meta, dst_path, dst_meta, \
              method, recursion_speed, cron, end_time, exclude, rename, last_sync) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               enable = excluded.enable, \
               src_path = excluded.src_path, \
               src_meta = excluded.src_meta, \
               dst_path = excluded.dst_path, \
               dst_meta = excluded.dst_meta, \
               method = excluded.method, \
               recursion_speed = excluded.recursion_speed, \
               cron = excluded.cron, \
               end_time = excluded.end_time, \
               exclude = excluded.exclude, \
               rename = excluded.rename, \
               last_sync = excluded.last_sync",
        )
        .bind(config.id().to_string())
        .bind(config.drive_type().as_wire())
        .bind(config.account_id().to_string())
        .bind(config.enable() as i64)
        .bind(config.src_path())
        .bind(&src_meta)
        .bind(config.dst_path())
        .bind(&dst_meta)
        .bind(method_to_string(config.method()))
        .bind(speed_to_string(config.recursion_speed()))
        .bind(config.cron())
        .bind(config.end_time().map(|d| d.to_rfc3339()))
        .bind(&exclude)
        .bind(&rename)
        .bind(config.last_sync().map(|d| d.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        tracing::trace!(config_id = %config.id(), "saved sync config");
        Ok(())
    }

    async fn get(&self, id: SyncConfigId) -> anyhow::Result<Option<SyncConfig>> {
        let row = sqlx::query("SELECT * FROM sync_configs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(sync_config_from_row).transpose().map_err(Into::into)
    }

    async fn list_all(&self) -> anyhow::Result<Vec<SyncConfig>> {
        let rows = sqlx::query("SELECT * FROM sync_configs").fetch_all(&self.pool).await?;

        rows.iter().map(sync_config_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn delete(&self, id: SyncConfigId) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sync_configs WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn record_last_sync(&self, id: SyncConfigId, at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE sync_configs SET last_sync = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// SyncTaskRepository
// ============================================================================

#[async_trait::async_trait]
impl SyncTaskRepository for SqliteStateRepository {
    async fn save_task(&self, task: &SyncTask) -> anyhow::Result<()> {
        let task_num = serde_json::to_string(&task.task_num())?;

        sqlx::query(
            "INSERT INTO sync_tasks \
             (id, config_id, status, start_time, dura_time_ms, err_msg, task_num) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               status = excluded.status, \
               dura_time_ms = excluded.dura_time_ms, \
               err_msg = excluded.err_msg, \
               task_num = excluded.task_num",
        )
        .bind(task.id().to_string())
        .bind(task.config_id().to_string())
        .bind(task_status_to_string(task.status()))
        .bind(task.start_time().to_rfc3339())
        .bind(task.dura_time_ms().map(|d| d as i64))
        .bind(task.err_msg())
        .bind(&task_num)
        .execute(&self.pool)
        .await?;

        tracing::trace!(task_id = %task.id(), status = ?task.status(), "saved sync task");
        Ok(())
    }

    async fn get_task(&self, id: SyncTaskId) -> anyhow::Result<Option<SyncTask>> {
        let row = sqlx::query("SELECT * FROM sync_tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(sync_task_from_row).transpose().map_err(Into::into)
    }

    async fn list_tasks_for_config(&self, config_id: SyncConfigId) -> anyhow::Result<Vec<SyncTask>> {
        let rows = sqlx::query("SELECT * FROM sync_tasks WHERE config_id = ? ORDER BY start_time DESC")
            .bind(config_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(sync_task_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn save_item(&self, item: &mut SyncTaskItem) -> anyhow::Result<()> {
        match item.id() {
            Some(id) => {
                sqlx::query(
                    "UPDATE sync_task_items SET op_type = ?, src_path = ?, dst_path = ?, \
                     file_name = ?, file_size = ?, status = ?, err_msg = ? WHERE id = ?",
                )
                .bind(item_op_type_to_string(item.op_type()))
                .bind(item.src_path())
                .bind(item.dst_path())
                .bind(item.file_name())
                .bind(item.file_size() as i64)
                .bind(item_status_to_string(item.status()))
                .bind(item.err_msg())
                .bind(id.as_i64())
                .execute(&self.pool)
                .await?;
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO sync_task_items \
                     (task_id, op_type, src_path, dst_path, file_name, file_size, status, err_msg) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(item.task_id().to_string())
                .bind(item_op_type_to_string(item.op_type()))
                .bind(item.src_path())
                .bind(item.dst_path())
                .bind(item.file_name())
                .bind(item.file_size() as i64)
                .bind(item_status_to_string(item.status()))
                .bind(item.err_msg())
                .execute(&self.pool)
                .await?;

                item.assign_id(SyncTaskItemId::new(result.last_insert_rowid()));
            }
        }

        Ok(())
    }

    async fn list_items_for_task(&self, task_id: SyncTaskId) -> anyhow::Result<Vec<SyncTaskItem>> {
        let rows = sqlx::query("SELECT * FROM sync_task_items WHERE task_id = ? ORDER BY id ASC")
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(sync_task_item_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }
}

// ============================================================================
// FileCacheRepository
// ============================================================================

#[async_trait::async_trait]
impl FileCacheRepository for SqliteStateRepository {
    async fn get_by_file_id(&self, account: AccountId, file_id: &str) -> anyhow::Result<Option<FileCache>> {
        let row = sqlx::query("SELECT * FROM file_cache WHERE drive_account_id = ? AND file_id = ?")
            .bind(account.to_string())
            .bind(file_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(file_cache_from_row).transpose().map_err(Into::into)
    }

    async fn get_by_path(&self, account: AccountId, file_path: &str) -> anyhow::Result<Option<FileCache>> {
        let row = sqlx::query("SELECT * FROM file_cache WHERE drive_account_id = ? AND file_path = ?")
            .bind(account.to_string())
            .bind(file_path)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(file_cache_from_row).transpose().map_err(Into::into)
    }

    async fn list_children(
        &self,
        account: AccountId,
        parent_id: &str,
        only_valid: bool,
    ) -> anyhow::Result<Vec<FileCache>> {
        let sql = if only_valid {
            "SELECT * FROM file_cache WHERE drive_account_id = ? AND parent_id = ? AND is_valid = 1"
        } else {
            "SELECT * FROM file_cache WHERE drive_account_id = ? AND parent_id = ?"
        };

        let rows = sqlx::query(sql)
            .bind(account.to_string())
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(file_cache_from_row).collect::<Result<_, _>>().map_err(Into::into)
    }

    async fn batch_upsert(&self, files: &[FileCache], version: &str) -> anyhow::Result<()> {
        let cached_at = Utc::now().to_rfc3339();

        for file in files {
            let file_ext = serde_json::to_string(file.file_ext())?;

            sqlx::query(
                "INSERT INTO file_cache \
                 (drive_account_id, file_id, file_name, file_path, parent_id, is_folder, \
                  file_size, file_created_at, file_updated_at, file_ext, cache_version, is_valid, cached_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?) \
                 ON CONFLICT(drive_account_id, file_id) DO UPDATE SET \
                   file_name = excluded.file_name, \
                   file_path = excluded.file_path, \
                   parent_id = excluded.parent_id, \
                   is_folder = excluded.is_folder, \
                   file_size = excluded.file_size, \
                   file_created_at = excluded.file_created_at, \
                   file_updated_at = excluded.file_updated_at, \
                   file_ext = excluded.file_ext, \
                   cache_version = excluded.cache_version, \
                   is_valid = 1, \
                   cached_at = excluded.cached_at",
            )
            .bind(file.drive_account_id().to_string())
            .bind(file.file_id())
            .bind(file.file_name())
            .bind(file.file_path())
            .bind(file.parent_id())
            .bind(file.is_folder() as i64)
            .bind(file.file_size() as i64)
            .bind(file.file_created_at().map(|d| d.to_rfc3339()))
            .bind(file.file_updated_at().map(|d| d.to_rfc3339()))
            .bind(&file_ext)
            .bind(version)
            .bind(&cached_at)
            .execute(&self.pool)
            .await?;
        }

        tracing::debug!(count = files.len(), version, "batch upserted file cache rows");
        Ok(())
    }

    async fn smart_upsert(&self, files: &[FileCache], version: &str, force: bool) -> anyhow::Result<()> {
        let mut updated = 0usize;
        let mut inserted = 0usize;

        for file in files {
            let existing = self.get_by_file_id(file.drive_account_id(), file.file_id()).await?;

            match existing {
                Some(row) if !force && row.comparison_key() == file.comparison_key() => {
                    continue;
                }
                _ => {
                    self.batch_upsert(std::slice::from_ref(file), version).await?;
                    if existing.is_some() {
                        updated += 1;
                    } else {
                        inserted += 1;
                    }
                }
            }
        }

        tracing::debug!(inserted, updated, version, "smart upserted file cache rows");
        Ok(())
    }

    async fn invalidate(&self, account: AccountId, version: Option<&str>) -> anyhow::Result<()> {
        match version {
            Some(v) => {
                sqlx::query("UPDATE file_cache SET is_valid = 0 WHERE drive_account_id = ? AND cache_version = ?")
                    .bind(account.to_string())
                    .bind(v)
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                sqlx::query("UPDATE file_cache SET is_valid = 0 WHERE drive_account_id = ?")
                    .bind(account.to_string())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn clear(&self, account: AccountId, version: Option<&str>) -> anyhow::Result<()> {
        match version {
            Some(v) => {
                sqlx::query("DELETE FROM file_cache WHERE drive_account_id = ? AND cache_version = ?")
                    .bind(account.to_string())
                    .bind(v)
                    .execute(&self.pool)
                    .await?;
            }
            None => {
                sqlx::query("DELETE FROM file_cache WHERE drive_account_id = ?")
                    .bind(account.to_string())
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn is_fresh(&self, account: AccountId, parent_id: &str, max_age_hours: i64) -> anyhow::Result<bool> {
        let cutoff = (Utc::now() - chrono::Duration::hours(max_age_hours)).to_rfc3339();

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM file_cache \
             WHERE drive_account_id = ? AND parent_id = ? AND is_valid = 1 AND cached_at > ?)",
        )
        .bind(account.to_string())
        .bind(parent_id)
        .bind(&cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
