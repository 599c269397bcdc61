//! `FileCache` — the persistent index backing C3's fast-recursion mode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{AccountId, FileCacheId};

/// One cached remote file/folder record. At most one row with
/// `is_valid = true` may exist per `(drive_account_id, file_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCache {
    id: Option<FileCacheId>,
    drive_account_id: AccountId,
    file_id: String,
    file_name: String,
    file_path: String,
    parent_id: Option<String>,
    is_folder: bool,
    file_size: u64,
    file_created_at: Option<DateTime<Utc>>,
    file_updated_at: Option<DateTime<Utc>>,
    file_ext: serde_json::Value,
    cache_version: String,
    is_valid: bool,
}

impl FileCache {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        drive_account_id: AccountId,
        file_id: impl Into<String>,
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        parent_id: Option<String>,
        is_folder: bool,
        file_size: u64,
        file_created_at: Option<DateTime<Utc>>,
        file_updated_at: Option<DateTime<Utc>>,
        file_ext: serde_json::Value,
        cache_version: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            drive_account_id,
            file_id: file_id.into(),
            file_name: file_name.into(),
            file_path: file_path.into(),
            parent_id,
            is_folder,
            file_size,
            file_created_at,
            file_updated_at,
            file_ext,
            cache_version: cache_version.into(),
            is_valid: true,
        }
    }

    pub fn assign_id(&mut self, id: FileCacheId) {
        self.id = Some(id);
    }

    pub fn id(&self) -> Option<FileCacheId> {
        self.id
    }
    pub fn drive_account_id(&self) -> AccountId {
        self.drive_account_id
    }
    pub fn file_id(&self) -> &str {
        &self.file_id
    }
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
    pub fn file_path(&self) -> &str {
        &self.file_path
    }
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
    pub fn is_folder(&self) -> bool {
        self.is_folder
    }
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
    pub fn file_created_at(&self) -> Option<DateTime<Utc>> {
        self.file_created_at
    }
    pub fn file_updated_at(&self) -> Option<DateTime<Utc>> {
        self.file_updated_at
    }
    pub fn file_ext(&self) -> &serde_json::Value {
        &self.file_ext
    }
    pub fn cache_version(&self) -> &str {
        &self.cache_version
    }
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// The comparison set for smart-upsert: `(file_name, file_path,
    /// file_size, file_updated_at)`.
    pub fn comparison_key(&self) -> (&str, &str, u64, Option<DateTime<Utc>>) {
        (&self.file_name, &self.file_path, self.file_size, self.file_updated_at)
    }

    /// Apply an incoming record's fields and stamp a new `cache_version`.
    /// Called only when [`Self::comparison_key`] actually differs.
    pub fn apply_update(&mut self, incoming: &Self, version: impl Into<String>) {
        self.file_name = incoming.file_name.clone();
        self.file_path = incoming.file_path.clone();
        self.file_size = incoming.file_size;
        self.file_updated_at = incoming.file_updated_at;
        self.file_ext = incoming.file_ext.clone();
        self.cache_version = version.into();
        self.is_valid = true;
    }

    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }

    /// `true` iff `file_updated_at` is within `max_age_hours` of `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age_hours: i64) -> bool {
        match self.file_updated_at {
            Some(updated) => (now - updated) <= chrono::Duration::hours(max_age_hours),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(size: u64, updated: DateTime<Utc>) -> FileCache {
        FileCache::new(
            AccountId::new(),
            "fid-1",
            "a.jpg",
            "/Backup/a.jpg",
            Some("parent-1".to_string()),
            false,
            size,
            None,
            Some(updated),
            serde_json::Value::Null,
            "v1",
        )
    }

    #[test]
    fn fresh_within_window() {
        let row = sample(10, Utc::now());
        assert!(row.is_fresh(Utc::now(), 24));
    }

    #[test]
    fn stale_outside_window() {
        let row = sample(10, Utc::now() - chrono::Duration::hours(48));
        assert!(!row.is_fresh(Utc::now(), 24));
    }

    #[test]
    fn apply_update_only_when_comparison_key_differs() {
        let mut row = sample(10, Utc::now());
        let before = row.comparison_key();
        let same_incoming = row.clone();
        // comparison key identical: caller would skip calling apply_update
        assert_eq!(before, same_incoming.comparison_key());

        let mut changed = row.clone();
        changed.file_size = 20;
        row.apply_update(&changed, "v2");
        assert_eq!(row.file_size(), 20);
        assert_eq!(row.cache_version(), "v2");
    }
}
