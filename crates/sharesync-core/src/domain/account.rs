//! Account domain entity
//!
//! An `Account` is a registered credential set for one cloud-drive provider,
//! owned by the user who created it and destroyed only by explicit delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{drive_type::DriveType, newtypes::AccountId};

/// A user's registration with one cloud-drive provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    drive_type: DriveType,
    remote_user_id: String,
    display_name: String,
    /// Opaque provider-specific credential blob: a cookie string for Baidu,
    /// a cookie pair for Quark, a bearer token for Alist. Never parsed by
    /// the core; only the matching provider client understands its shape.
    credentials: String,
    quota_used: u64,
    quota_total: u64,
    is_vip: bool,
    is_supervip: bool,
    is_valid: bool,
    created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account, valid by default.
    pub fn new(
        drive_type: DriveType,
        remote_user_id: impl Into<String>,
        display_name: impl Into<String>,
        credentials: impl Into<String>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            drive_type,
            remote_user_id: remote_user_id.into(),
            display_name: display_name.into(),
            credentials: credentials.into(),
            quota_used: 0,
            quota_total: 0,
            is_vip: false,
            is_supervip: false,
            is_valid: true,
            created_at: Utc::now(),
        }
    }

    /// Reconstitute an account from storage with a known id/timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn with_id(
        id: AccountId,
        drive_type: DriveType,
        remote_user_id: impl Into<String>,
        display_name: impl Into<String>,
        credentials: impl Into<String>,
        quota_used: u64,
        quota_total: u64,
        is_vip: bool,
        is_supervip: bool,
        is_valid: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            drive_type,
            remote_user_id: remote_user_id.into(),
            display_name: display_name.into(),
            credentials: credentials.into(),
            quota_used,
            quota_total,
            is_vip,
            is_supervip,
            is_valid,
            created_at,
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn drive_type(&self) -> DriveType {
        self.drive_type
    }

    pub fn remote_user_id(&self) -> &str {
        &self.remote_user_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn credentials(&self) -> &str {
        &self.credentials
    }

    pub fn quota_used(&self) -> u64 {
        self.quota_used
    }

    pub fn quota_total(&self) -> u64 {
        self.quota_total
    }

    pub fn is_vip(&self) -> bool {
        self.is_vip
    }

    pub fn is_supervip(&self) -> bool {
        self.is_supervip
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Percentage of quota used, `0.0` if `quota_total` is zero.
    pub fn quota_percent(&self) -> f64 {
        if self.quota_total == 0 {
            return 0.0;
        }
        (self.quota_used as f64 / self.quota_total as f64) * 100.0
    }

    pub fn update_quota(&mut self, used: u64, total: u64) {
        self.quota_used = used;
        self.quota_total = total;
    }

    pub fn update_vip_flags(&mut self, is_vip: bool, is_supervip: bool) {
        self.is_vip = is_vip;
        self.is_supervip = is_supervip;
    }

    pub fn invalidate(&mut self, reason: &str) {
        tracing::warn!(account_id = %self.id, reason, "marking account invalid");
        self.is_valid = false;
    }

    pub fn revalidate(&mut self) {
        self.is_valid = true;
    }

    pub fn replace_credentials(&mut self, credentials: impl Into<String>) {
        self.credentials = credentials.into();
        self.is_valid = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Account {
        Account::new(DriveType::BaiduDrive, "uid-1", "Alice", "BDUSS=abc123")
    }

    #[test]
    fn new_account_is_valid_with_zero_quota() {
        let account = sample();
        assert!(account.is_valid());
        assert_eq!(account.quota_percent(), 0.0);
    }

    #[test]
    fn quota_percent_computes_ratio() {
        let mut account = sample();
        account.update_quota(50, 200);
        assert_eq!(account.quota_percent(), 25.0);
    }

    #[test]
    fn invalidate_flips_flag_without_destroying_credentials() {
        let mut account = sample();
        account.invalidate("cookie expired");
        assert!(!account.is_valid());
        assert_eq!(account.credentials(), "BDUSS=abc123");
    }

    #[test]
    fn replace_credentials_revalidates() {
        let mut account = sample();
        account.invalidate("expired");
        account.replace_credentials("BDUSS=new");
        assert!(account.is_valid());
        assert_eq!(account.credentials(), "BDUSS=new");
    }
}
