//! Domain entities and business logic
//!
//! Core domain types for sharesync:
//! - Newtypes for type-safe identifiers and validated domain values
//! - `Account`, `SyncConfig`, `SyncTask`/`SyncTaskItem`, `FileCache`
//! - `BaseFileInfo`, the transient shape passed between components
//! - Raw exclusion/rename rule shapes
//! - The shared error taxonomy

pub mod account;
pub mod base_file_info;
pub mod drive_type;
pub mod errors;
pub mod file_cache;
pub mod newtypes;
pub mod rules;
pub mod sync_config;
pub mod sync_task;

pub use account::Account;
pub use base_file_info::{BaseFileInfo, FileExt, RelationshipItem};
pub use drive_type::DriveType;
pub use errors::{CoreError, DomainError};
pub use file_cache::FileCache;
pub use newtypes::*;
pub use rules::{ExclusionRule, ItemType, MatchMode, RenameRule, RenameScope, RuleTarget};
pub use sync_config::{DestMeta, RecursionSpeed, SourceMeta, SourceType, SyncConfig, SyncMethod};
pub use sync_task::{ItemOpType, ItemStatus, SyncTask, SyncTaskItem, TaskCounters, TaskStatus};
