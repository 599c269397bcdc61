//! Integration tests for `SqliteStateRepository`
//!
//! Each test creates a fresh in-memory database to ensure isolation.

use chrono::Utc;

use sharesync_cache::{DatabasePool, SqliteStateRepository};
use sharesync_core::domain::{
    Account, DestMeta, DriveType, FileCache, ItemOpType, ItemStatus, SourceMeta, SourceType, SyncConfig,
    SyncMethod, SyncTask, SyncTaskItem, TaskCounters, TaskStatus,
};
use sharesync_core::ports::{AccountRepository, FileCacheRepository, SyncConfigRepository, SyncTaskRepository};

async fn setup() -> SqliteStateRepository {
    let pool = DatabasePool::in_memory().await.expect("failed to create in-memory database");
    SqliteStateRepository::new(pool.pool().clone())
}

async fn create_test_account(repo: &SqliteStateRepository) -> Account {
    let account = Account::new(DriveType::BaiduDrive, "remote-user-1", "Test Account", "cookie=abc123");
    repo.save(&account).await.unwrap();
    account
}

fn create_test_config(account_id: sharesync_core::domain::AccountId) -> SyncConfig {
    let src_meta = SourceMeta {
        source_type: SourceType::Friend,
        source_id: "share-link-id".to_string(),
        ext_params: Default::default(),
    };
    SyncConfig::new(
        DriveType::BaiduDrive,
        account_id,
        "/shared/incoming",
        src_meta,
        "/local/mirror",
        SyncMethod::Incremental,
    )
}

fn create_test_file(account_id: sharesync_core::domain::AccountId, file_id: &str, parent_id: Option<&str>) -> FileCache {
    FileCache::new(
        account_id,
        file_id,
        format!("{file_id}.txt"),
        format!("/shared/incoming/{file_id}.txt"),
        parent_id.map(str::to_string),
        false,
        1024,
        Some(Utc::now()),
        Some(Utc::now()),
        serde_json::json!({}),
        "v1",
    )
}

// ============================================================================
// AccountRepository
// ============================================================================

#[tokio::test]
async fn save_and_get_account_round_trips() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;

    let retrieved = repo.get(*account.id()).await.unwrap();
    assert!(retrieved.is_some());

    let retrieved = retrieved.unwrap();
    assert_eq!(retrieved.remote_user_id(), "remote-user-1");
    assert_eq!(retrieved.display_name(), "Test Account");
    assert_eq!(retrieved.credentials(), "cookie=abc123");
    assert_eq!(retrieved.drive_type(), DriveType::BaiduDrive);
    assert!(retrieved.is_valid());
}

#[tokio::test]
async fn get_missing_account_returns_none() {
    let repo = setup().await;
    let id = sharesync_core::domain::AccountId::new();
    assert!(repo.get(id).await.unwrap().is_none());
}

#[tokio::test]
async fn save_is_upsert_on_conflicting_id() {
    let repo = setup().await;
    let mut account = create_test_account(&repo).await;

    account.update_quota(500, 1000);
    account.update_vip_flags(true, false);
    repo.save(&account).await.unwrap();

    let retrieved = repo.get(*account.id()).await.unwrap().unwrap();
    assert_eq!(retrieved.quota_used(), 500);
    assert_eq!(retrieved.quota_total(), 1000);
    assert!(retrieved.is_vip());
}

#[tokio::test]
async fn list_accounts_returns_all_saved() {
    let repo = setup().await;
    create_test_account(&repo).await;
    let second = Account::new(DriveType::QuarkDrive, "remote-user-2", "Second Account", "token=xyz");
    repo.save(&second).await.unwrap();

    let all = repo.list().await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn delete_account_removes_it() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;

    repo.delete(*account.id()).await.unwrap();
    assert!(repo.get(*account.id()).await.unwrap().is_none());
}

// ============================================================================
// SyncConfigRepository
// ============================================================================

#[tokio::test]
async fn save_and_get_sync_config_round_trips() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config = create_test_config(*account.id());

    repo.save(&config).await.unwrap();

    let retrieved = SyncConfigRepository::get(&repo, config.id()).await.unwrap().unwrap();
    assert_eq!(retrieved.src_path(), "/shared/incoming");
    assert_eq!(retrieved.dst_path(), "/local/mirror");
    assert_eq!(retrieved.method(), SyncMethod::Incremental);
    assert!(retrieved.enable());
    assert!(retrieved.cron().is_none());
}

#[tokio::test]
async fn sync_config_with_dst_meta_round_trips() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let mut config = create_test_config(*account.id());
    config.set_dst_meta(DestMeta { file_id: Some("dst-folder-id".to_string()) });

    repo.save(&config).await.unwrap();
    let retrieved = SyncConfigRepository::get(&repo, config.id()).await.unwrap().unwrap();
    assert_eq!(retrieved.dst_meta().file_id.as_deref(), Some("dst-folder-id"));
}

#[tokio::test]
async fn list_all_sync_configs_returns_all_saved() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    repo.save(&create_test_config(*account.id())).await.unwrap();
    repo.save(&create_test_config(*account.id())).await.unwrap();

    let all = SyncConfigRepository::list_all(&repo).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn delete_sync_config_removes_it() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config = create_test_config(*account.id());
    repo.save(&config).await.unwrap();

    SyncConfigRepository::delete(&repo, config.id()).await.unwrap();
    assert!(SyncConfigRepository::get(&repo, config.id()).await.unwrap().is_none());
}

#[tokio::test]
async fn record_last_sync_updates_timestamp() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config = create_test_config(*account.id());
    repo.save(&config).await.unwrap();

    let now = Utc::now();
    repo.record_last_sync(config.id(), now).await.unwrap();

    let retrieved = SyncConfigRepository::get(&repo, config.id()).await.unwrap().unwrap();
    assert!(retrieved.last_sync().is_some());
}

// ============================================================================
// SyncTaskRepository
// ============================================================================

#[tokio::test]
async fn save_and_get_sync_task_round_trips() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config = create_test_config(*account.id());
    repo.save(&config).await.unwrap();

    let task = SyncTask::start(config.id());
    SyncTaskRepository::save_task(&repo, &task).await.unwrap();

    let retrieved = repo.get_task(task.id()).await.unwrap().unwrap();
    assert_eq!(retrieved.status(), TaskStatus::Running);
    assert_eq!(retrieved.config_id(), config.id());
}

#[tokio::test]
async fn save_task_upserts_completion_state() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config = create_test_config(*account.id());
    repo.save(&config).await.unwrap();

    let mut task = SyncTask::start(config.id());
    SyncTaskRepository::save_task(&repo, &task).await.unwrap();

    let counters = TaskCounters {
        added_success: 3,
        added_fail: 0,
        deleted_success: 1,
        deleted_fail: 0,
        renamed_success: 0,
        renamed_fail: 0,
    };
    task.complete(counters);
    SyncTaskRepository::save_task(&repo, &task).await.unwrap();

    let retrieved = repo.get_task(task.id()).await.unwrap().unwrap();
    assert_eq!(retrieved.status(), TaskStatus::Completed);
    assert_eq!(retrieved.task_num().total(), 4);
}

#[tokio::test]
async fn list_tasks_for_config_returns_only_matching() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config_a = create_test_config(*account.id());
    let config_b = create_test_config(*account.id());
    repo.save(&config_a).await.unwrap();
    repo.save(&config_b).await.unwrap();

    let task_a = SyncTask::start(config_a.id());
    let task_b = SyncTask::start(config_b.id());
    SyncTaskRepository::save_task(&repo, &task_a).await.unwrap();
    SyncTaskRepository::save_task(&repo, &task_b).await.unwrap();

    let for_a = repo.list_tasks_for_config(config_a.id()).await.unwrap();
    assert_eq!(for_a.len(), 1);
    assert_eq!(for_a[0].id(), task_a.id());
}

#[tokio::test]
async fn save_item_assigns_id_on_first_insert() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config = create_test_config(*account.id());
    repo.save(&config).await.unwrap();
    let task = SyncTask::start(config.id());
    SyncTaskRepository::save_task(&repo, &task).await.unwrap();

    let mut item = SyncTaskItem::new(
        task.id(),
        ItemOpType::Create,
        "/shared/incoming/a.txt",
        "/local/mirror/a.txt",
        "a.txt",
        128,
    );
    assert!(item.id().is_none());

    repo.save_item(&mut item).await.unwrap();
    assert!(item.id().is_some());
}

#[tokio::test]
async fn save_item_updates_in_place_on_second_save() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config = create_test_config(*account.id());
    repo.save(&config).await.unwrap();
    let task = SyncTask::start(config.id());
    SyncTaskRepository::save_task(&repo, &task).await.unwrap();

    let mut item = SyncTaskItem::new(
        task.id(),
        ItemOpType::Create,
        "/shared/incoming/a.txt",
        "/local/mirror/a.txt",
        "a.txt",
        128,
    );
    repo.save_item(&mut item).await.unwrap();
    let assigned_id = item.id().unwrap();

    item.mark_completed();
    repo.save_item(&mut item).await.unwrap();
    assert_eq!(item.id().unwrap(), assigned_id);

    let items = repo.list_items_for_task(task.id()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].status(), ItemStatus::Completed);
}

#[tokio::test]
async fn list_items_for_task_preserves_insertion_order() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let config = create_test_config(*account.id());
    repo.save(&config).await.unwrap();
    let task = SyncTask::start(config.id());
    SyncTaskRepository::save_task(&repo, &task).await.unwrap();

    for name in ["a.txt", "b.txt", "c.txt"] {
        let mut item = SyncTaskItem::new(
            task.id(),
            ItemOpType::Create,
            format!("/shared/incoming/{name}"),
            format!("/local/mirror/{name}"),
            name,
            10,
        );
        repo.save_item(&mut item).await.unwrap();
    }

    let items = repo.list_items_for_task(task.id()).await.unwrap();
    let names: Vec<&str> = items.iter().map(SyncTaskItem::file_name).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
}

// ============================================================================
// FileCacheRepository
// ============================================================================

#[tokio::test]
async fn batch_upsert_then_get_by_file_id() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));

    repo.batch_upsert(std::slice::from_ref(&file), "v1").await.unwrap();

    let retrieved = repo.get_by_file_id(*account.id(), "file-1").await.unwrap().unwrap();
    assert_eq!(retrieved.file_path(), "/shared/incoming/file-1.txt");
    assert_eq!(retrieved.cache_version(), "v1");
}

#[tokio::test]
async fn batch_upsert_overwrites_on_conflict() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));
    repo.batch_upsert(std::slice::from_ref(&file), "v1").await.unwrap();

    let renamed = FileCache::new(
        *account.id(),
        "file-1",
        "renamed.txt",
        "/shared/incoming/renamed.txt",
        Some("root".to_string()),
        false,
        2048,
        file.file_created_at(),
        Some(Utc::now()),
        serde_json::json!({}),
        "v2",
    );
    repo.batch_upsert(std::slice::from_ref(&renamed), "v2").await.unwrap();

    let retrieved = repo.get_by_file_id(*account.id(), "file-1").await.unwrap().unwrap();
    assert_eq!(retrieved.file_name(), "renamed.txt");
    assert_eq!(retrieved.file_size(), 2048);
    assert_eq!(retrieved.cache_version(), "v2");
}

#[tokio::test]
async fn get_by_path_finds_matching_row() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));
    repo.batch_upsert(std::slice::from_ref(&file), "v1").await.unwrap();

    let retrieved = repo.get_by_path(*account.id(), "/shared/incoming/file-1.txt").await.unwrap();
    assert!(retrieved.is_some());
}

#[tokio::test]
async fn list_children_filters_by_parent() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let files = vec![
        create_test_file(*account.id(), "file-1", Some("folder-a")),
        create_test_file(*account.id(), "file-2", Some("folder-a")),
        create_test_file(*account.id(), "file-3", Some("folder-b")),
    ];
    repo.batch_upsert(&files, "v1").await.unwrap();

    let children = repo.list_children(*account.id(), "folder-a", false).await.unwrap();
    assert_eq!(children.len(), 2);
}

#[tokio::test]
async fn smart_upsert_skips_unchanged_rows() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));
    repo.smart_upsert(std::slice::from_ref(&file), "v1", false).await.unwrap();

    let before = repo.get_by_file_id(*account.id(), "file-1").await.unwrap().unwrap();
    repo.smart_upsert(std::slice::from_ref(&file), "v2", false).await.unwrap();
    let after = repo.get_by_file_id(*account.id(), "file-1").await.unwrap().unwrap();

    assert_eq!(before.cache_version(), after.cache_version());
}

#[tokio::test]
async fn smart_upsert_applies_rows_whose_comparison_key_changed() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));
    repo.smart_upsert(std::slice::from_ref(&file), "v1", false).await.unwrap();

    let grown = FileCache::new(
        *account.id(),
        "file-1",
        file.file_name().to_string(),
        file.file_path().to_string(),
        Some("root".to_string()),
        false,
        file.file_size() + 1,
        file.file_created_at(),
        file.file_updated_at(),
        serde_json::json!({}),
        "v2",
    );
    repo.smart_upsert(std::slice::from_ref(&grown), "v2", false).await.unwrap();

    let after = repo.get_by_file_id(*account.id(), "file-1").await.unwrap().unwrap();
    assert_eq!(after.cache_version(), "v2");
    assert_eq!(after.file_size(), file.file_size() + 1);
}

#[tokio::test]
async fn smart_upsert_force_reapplies_unchanged_rows() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));
    repo.smart_upsert(std::slice::from_ref(&file), "v1", false).await.unwrap();
    repo.smart_upsert(std::slice::from_ref(&file), "v2", true).await.unwrap();

    let after = repo.get_by_file_id(*account.id(), "file-1").await.unwrap().unwrap();
    assert_eq!(after.cache_version(), "v2");
}

#[tokio::test]
async fn invalidate_marks_rows_invalid_without_deleting() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));
    repo.batch_upsert(std::slice::from_ref(&file), "v1").await.unwrap();

    repo.invalidate(*account.id(), None).await.unwrap();

    let children = repo.list_children(*account.id(), "root", true).await.unwrap();
    assert!(children.is_empty());
    let children_all = repo.list_children(*account.id(), "root", false).await.unwrap();
    assert_eq!(children_all.len(), 1);
}

#[tokio::test]
async fn clear_deletes_rows_for_version() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));
    repo.batch_upsert(std::slice::from_ref(&file), "v1").await.unwrap();

    repo.clear(*account.id(), Some("v1")).await.unwrap();
    assert!(repo.get_by_file_id(*account.id(), "file-1").await.unwrap().is_none());
}

#[tokio::test]
async fn is_fresh_true_just_after_upsert() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;
    let file = create_test_file(*account.id(), "file-1", Some("root"));
    repo.batch_upsert(std::slice::from_ref(&file), "v1").await.unwrap();

    assert!(repo.is_fresh(*account.id(), "root", 24).await.unwrap());
}

#[tokio::test]
async fn is_fresh_false_for_unknown_parent() {
    let repo = setup().await;
    let account = create_test_account(&repo).await;

    assert!(!repo.is_fresh(*account.id(), "unknown-parent", 24).await.unwrap());
}
