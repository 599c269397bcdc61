//! `SyncTask` / `SyncTaskItem` — the append-only audit trail of one sync run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{SyncConfigId, SyncTaskId, SyncTaskItemId};

/// Lifecycle of one `SyncTask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// `true` for `completed`/`failed`/`cancelled` — the task will never
    /// transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Counters summarizing one run, persisted as `task_num` JSON.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounters {
    pub added_success: u64,
    pub added_fail: u64,
    pub deleted_success: u64,
    pub deleted_fail: u64,
    pub renamed_success: u64,
    pub renamed_fail: u64,
}

impl TaskCounters {
    pub fn total(&self) -> u64 {
        self.added_success
            + self.added_fail
            + self.deleted_success
            + self.deleted_fail
            + self.renamed_success
            + self.renamed_fail
    }
}

/// One execution of a `SyncConfig`: created `running` at the start of a run,
/// terminal at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTask {
    id: SyncTaskId,
    config_id: SyncConfigId,
    status: TaskStatus,
    start_time: DateTime<Utc>,
    dura_time_ms: Option<u64>,
    err_msg: Option<String>,
    task_num: TaskCounters,
}

impl SyncTask {
    /// Start a new task for `config_id`, status `running`.
    pub fn start(config_id: SyncConfigId) -> Self {
        Self {
            id: SyncTaskId::new(),
            config_id,
            status: TaskStatus::Running,
            start_time: Utc::now(),
            dura_time_ms: None,
            err_msg: None,
            task_num: TaskCounters::default(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_id(
        id: SyncTaskId,
        config_id: SyncConfigId,
        status: TaskStatus,
        start_time: DateTime<Utc>,
        dura_time_ms: Option<u64>,
        err_msg: Option<String>,
        task_num: TaskCounters,
    ) -> Self {
        Self {
            id,
            config_id,
            status,
            start_time,
            dura_time_ms,
            err_msg,
            task_num,
        }
    }

    pub fn id(&self) -> SyncTaskId {
        self.id
    }
    pub fn config_id(&self) -> SyncConfigId {
        self.config_id
    }
    pub fn status(&self) -> TaskStatus {
        self.status
    }
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
    pub fn dura_time_ms(&self) -> Option<u64> {
        self.dura_time_ms
    }
    pub fn err_msg(&self) -> Option<&str> {
        self.err_msg.as_deref()
    }
    pub fn task_num(&self) -> TaskCounters {
        self.task_num
    }

    /// Finish the task successfully, per-unit failures already folded into
    /// `counters`. Only a pre-diff failure should call [`Self::fail`]
    /// instead.
    pub fn complete(&mut self, counters: TaskCounters) {
        self.status = TaskStatus::Completed;
        self.task_num = counters;
        self.dura_time_ms = Some(elapsed_ms(self.start_time));
    }

    /// Fail the whole task (auth, unreadable share, unrecoverable provider
    /// error encountered before diffing began).
    pub fn fail(&mut self, err_msg: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.err_msg = Some(err_msg.into());
        self.dura_time_ms = Some(elapsed_ms(self.start_time));
    }

    pub fn cancel(&mut self) {
        self.status = TaskStatus::Cancelled;
        self.dura_time_ms = Some(elapsed_ms(self.start_time));
    }
}

fn elapsed_ms(start: DateTime<Utc>) -> u64 {
    (Utc::now() - start).num_milliseconds().max(0) as u64
}

/// The kind of provider operation one `SyncTaskItem` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOpType {
    Create,
    Copy,
    Move,
    Delete,
    Rename,
}

/// Outcome of one attempted unit within a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// One file/folder operation attempted during a `SyncTask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTaskItem {
    id: Option<SyncTaskItemId>,
    task_id: SyncTaskId,
    op_type: ItemOpType,
    src_path: String,
    dst_path: String,
    file_name: String,
    file_size: u64,
    status: ItemStatus,
    err_msg: Option<String>,
}

impl SyncTaskItem {
    pub fn new(
        task_id: SyncTaskId,
        op_type: ItemOpType,
        src_path: impl Into<String>,
        dst_path: impl Into<String>,
        file_name: impl Into<String>,
        file_size: u64,
    ) -> Self {
        Self {
            id: None,
            task_id,
            op_type,
            src_path: src_path.into(),
            dst_path: dst_path.into(),
            file_name: file_name.into(),
            file_size,
            status: ItemStatus::Pending,
            err_msg: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_id(
        id: SyncTaskItemId,
        task_id: SyncTaskId,
        op_type: ItemOpType,
        src_path: impl Into<String>,
        dst_path: impl Into<String>,
        file_name: impl Into<String>,
        file_size: u64,
        status: ItemStatus,
        err_msg: Option<String>,
    ) -> Self {
        Self {
            id: Some(id),
            task_id,
            op_type,
            src_path: src_path.into(),
            dst_path: dst_path.into(),
            file_name: file_name.into(),
            file_size,
            status,
            err_msg,
        }
    }

    /// Record the row id assigned by the repository on first insert.
    pub fn assign_id(&mut self, id: SyncTaskItemId) {
        self.id = Some(id);
    }

    pub fn id(&self) -> Option<SyncTaskItemId> {
        self.id
    }
    pub fn task_id(&self) -> SyncTaskId {
        self.task_id
    }
    pub fn op_type(&self) -> ItemOpType {
        self.op_type
    }
    pub fn src_path(&self) -> &str {
        &self.src_path
    }
    pub fn dst_path(&self) -> &str {
        &self.dst_path
    }
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
    pub fn status(&self) -> ItemStatus {
        self.status
    }
    pub fn err_msg(&self) -> Option<&str> {
        self.err_msg.as_deref()
    }

    pub fn mark_completed(&mut self) {
        self.status = ItemStatus::Completed;
        self.err_msg = None;
    }

    pub fn mark_failed(&mut self, err_msg: impl Into<String>) {
        self.status = ItemStatus::Failed;
        self.err_msg = Some(err_msg.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_fail_sets_err_msg_and_duration() {
        let mut task = SyncTask::start(SyncConfigId::new());
        task.fail("auth rejected");
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.err_msg(), Some("auth rejected"));
        assert!(task.dura_time_ms().is_some());
    }

    #[test]
    fn task_complete_stores_counters() {
        let mut task = SyncTask::start(SyncConfigId::new());
        let counters = TaskCounters {
            added_success: 3,
            added_fail: 1,
            ..Default::default()
        };
        task.complete(counters);
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.task_num().total(), 4);
    }

    #[test]
    fn item_transitions_record_outcome() {
        let mut item = SyncTaskItem::new(
            SyncTaskId::new(),
            ItemOpType::Copy,
            "/src/a.jpg",
            "/dst/a.jpg",
            "a.jpg",
            1024,
        );
        item.mark_failed("quota exceeded");
        assert_eq!(item.status(), ItemStatus::Failed);
        assert_eq!(item.err_msg(), Some("quota exceeded"));
    }
}
