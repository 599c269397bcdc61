//! `SyncConfig` — one scheduled share-to-disk synchronization job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    drive_type::DriveType,
    newtypes::{AccountId, SyncConfigId},
    rules::{ExclusionRule, RenameRule},
};

/// How the diff engine reconciles source and target trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMethod {
    Incremental,
    Full,
    Overwrite,
}

/// How aggressively `list_disk`/`list_share` recurse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecursionSpeed {
    Normal,
    Slow,
    Fast,
}

/// The kind of share counterparty a source tree is exposed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Friend,
    Group,
}

/// `src_meta` JSON: which share event the source tree is rooted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub source_type: SourceType,
    pub source_id: String,
    #[serde(default)]
    pub ext_params: serde_json::Value,
}

/// `dst_meta` JSON: the target directory's already-known file id, if any.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DestMeta {
    #[serde(default)]
    pub file_id: Option<String>,
}

/// A scheduled share-to-disk synchronization job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    id: SyncConfigId,
    drive_type: DriveType,
    account_id: AccountId,
    enable: bool,
    src_path: String,
    src_meta: SourceMeta,
    dst_path: String,
    dst_meta: DestMeta,
    method: SyncMethod,
    recursion_speed: RecursionSpeed,
    cron: Option<String>,
    end_time: Option<DateTime<Utc>>,
    exclude: Vec<ExclusionRule>,
    rename: Vec<RenameRule>,
    last_sync: Option<DateTime<Utc>>,
}

impl SyncConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        drive_type: DriveType,
        account_id: AccountId,
        src_path: impl Into<String>,
        src_meta: SourceMeta,
        dst_path: impl Into<String>,
        method: SyncMethod,
    ) -> Self {
        Self {
            id: SyncConfigId::new(),
            drive_type,
            account_id,
            enable: true,
            src_path: src_path.into(),
            src_meta,
            dst_path: dst_path.into(),
            dst_meta: DestMeta::default(),
            method,
            recursion_speed: RecursionSpeed::Normal,
            cron: None,
            end_time: None,
            exclude: Vec::new(),
            rename: Vec::new(),
            last_sync: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_id(
        id: SyncConfigId,
        drive_type: DriveType,
        account_id: AccountId,
        enable: bool,
        src_path: impl Into<String>,
        src_meta: SourceMeta,
        dst_path: impl Into<String>,
        dst_meta: DestMeta,
        method: SyncMethod,
        recursion_speed: RecursionSpeed,
        cron: Option<String>,
        end_time: Option<DateTime<Utc>>,
        exclude: Vec<ExclusionRule>,
        rename: Vec<RenameRule>,
        last_sync: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            drive_type,
            account_id,
            enable,
            src_path: src_path.into(),
            src_meta,
            dst_path: dst_path.into(),
            dst_meta,
            method,
            recursion_speed,
            cron,
            end_time,
            exclude,
            rename,
            last_sync,
        }
    }

    pub fn id(&self) -> SyncConfigId {
        self.id
    }
    pub fn drive_type(&self) -> DriveType {
        self.drive_type
    }
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }
    pub fn enable(&self) -> bool {
        self.enable
    }
    pub fn src_path(&self) -> &str {
        &self.src_path
    }
    pub fn src_meta(&self) -> &SourceMeta {
        &self.src_meta
    }
    pub fn dst_path(&self) -> &str {
        &self.dst_path
    }
    pub fn dst_meta(&self) -> &DestMeta {
        &self.dst_meta
    }
    pub fn method(&self) -> SyncMethod {
        self.method
    }
    pub fn recursion_speed(&self) -> RecursionSpeed {
        self.recursion_speed
    }
    pub fn cron(&self) -> Option<&str> {
        self.cron.as_deref()
    }
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }
    pub fn exclude(&self) -> &[ExclusionRule] {
        &self.exclude
    }
    pub fn rename(&self) -> &[RenameRule] {
        &self.rename
    }
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    pub fn set_enable(&mut self, enable: bool) {
        self.enable = enable;
    }

    pub fn record_sync(&mut self, at: DateTime<Utc>) {
        self.last_sync = Some(at);
    }

    pub fn set_dst_meta(&mut self, dst_meta: DestMeta) {
        self.dst_meta = dst_meta;
    }

    /// `enable ∧ cron != null ∧ (end_time == null ∨ end_time > now)`.
    pub fn is_schedulable(&self, now: DateTime<Utc>) -> bool {
        self.enable
            && self.cron.is_some()
            && self.end_time.map(|end| end > now).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SyncConfig {
        SyncConfig::new(
            DriveType::BaiduDrive,
            AccountId::new(),
            "/friends/42:/Photos",
            SourceMeta {
                source_type: SourceType::Friend,
                source_id: "42".to_string(),
                ext_params: serde_json::Value::Null,
            },
            "/Backup",
            SyncMethod::Incremental,
        )
    }

    #[test]
    fn schedulable_requires_enable_and_cron() {
        let mut cfg = sample();
        assert!(!cfg.is_schedulable(Utc::now()));
        cfg.cron = Some("*/5 * * * *".to_string());
        assert!(cfg.is_schedulable(Utc::now()));
        cfg.enable = false;
        assert!(!cfg.is_schedulable(Utc::now()));
    }

    #[test]
    fn schedulable_false_once_end_time_passed() {
        let mut cfg = sample();
        cfg.cron = Some("*/5 * * * *".to_string());
        cfg.end_time = Some(Utc::now() - chrono::Duration::days(1));
        assert!(!cfg.is_schedulable(Utc::now()));
    }
}
