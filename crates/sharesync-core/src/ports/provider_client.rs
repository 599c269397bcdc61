//! `ProviderClient` — the uniform contract over heterogeneous cloud-drive
//! APIs (C1). One implementation per provider lives in `sharesync-providers`.
//!
//! The client owns authentication state derived from an opaque `credentials`
//! string supplied at construction, and performs no I/O at construction time
//! beyond what is needed to verify reachability; verification failure leaves
//! the client unauthorized so subsequent calls fail with `CoreError::Auth`.

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{base_file_info::FileExt, BaseFileInfo, CoreError, RelationshipItem, SourceType};

/// Sort key for `list_disk`/`list_share` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    Name,
    Time,
    Size,
}

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// How aggressively a listing call recurses; mirrors
/// [`crate::domain::RecursionSpeed`] but owned by the provider boundary so
/// adapters don't need to depend back on the sync-config shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speed {
    Normal,
    /// Insert a configurable pause (>= 3s) before each descent.
    Slow,
    /// Consult the file-info cache first; falls back to `Normal` on a miss.
    Fast,
}

/// A compiled item filter, opaque to the provider client. The rule engine
/// produces these; C1 only needs to ask "is this item excluded, and should
/// its children be pruned from recursion".
pub trait ListingFilter: Send + Sync {
    /// `true` iff the item should be excluded from the listing.
    fn excludes(&self, item: &BaseFileInfo) -> bool;
}

/// A filter that admits everything; used when no exclusion rules apply.
pub struct NoopFilter;

impl ListingFilter for NoopFilter {
    fn excludes(&self, _item: &BaseFileInfo) -> bool {
        false
    }
}

/// Identity, quota, and membership info returned by `get_user_info`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub user_id: String,
    pub display_name: String,
    pub quota_used: u64,
    pub quota_total: u64,
    pub is_vip: bool,
    pub is_supervip: bool,
}

/// Recognized `ext` keys for `transfer`. Unrecognized keys are passed
/// through to the provider verbatim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferExt {
    pub msg_id: Option<String>,
    pub from_uk: Option<String>,
    pub ondup: Option<String>,
    pub async_transfer: Option<bool>,
    pub gid: Option<String>,
    pub share_fid_token: Option<String>,
    pub share_parent_fid: Option<String>,
    pub files_ext_info: Vec<Value>,
    pub extra: FileExt,
}

/// The uniform, stateless-from-caller view of one cloud drive (C1).
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Fetch remote identity, quota, vip flags; updates the client's known
    /// `user_id` for subsequent calls.
    async fn get_user_info(&self) -> Result<UserInfo, CoreError>;

    /// Flattened listing rooted at `(path, file_id)`. Every non-root item
    /// carries a non-empty `parent_id` equal to the caller-supplied root id
    /// or to the parent discovered during recursion.
    #[allow(clippy::too_many_arguments)]
    async fn list_disk(
        &self,
        path: &str,
        file_id: Option<&str>,
        recursive: bool,
        speed: Speed,
        order_by: OrderBy,
        direction: OrderDirection,
        filter: &dyn ListingFilter,
    ) -> Result<Vec<BaseFileInfo>, CoreError>;

    /// Listing rooted within a share exposed by a counterparty. `path` must
    /// be non-empty and non-root; its first component names the share
    /// event. Returned items carry `from_uk`/`msg_id` in `file_ext` so the
    /// caller can later `transfer` them.
    async fn list_share(
        &self,
        source_type: SourceType,
        source_id: &str,
        path: &str,
        recursive: bool,
        speed: Speed,
        filter: &dyn ListingFilter,
    ) -> Result<Vec<BaseFileInfo>, CoreError>;

    /// Create a directory; returns the existing one if `return_if_exists`
    /// and it is already present (no error in that case).
    async fn mkdir(
        &self,
        path: &str,
        parent_id: Option<&str>,
        name: &str,
        return_if_exists: bool,
    ) -> Result<BaseFileInfo, CoreError>;

    /// Remove items by path and/or id. Returns `true` iff the provider's
    /// call succeeded for every input.
    async fn remove(&self, paths: &[String], ids: &[String]) -> Result<bool, CoreError>;

    /// Copy items identified by `file_ids` from the share identified by
    /// `(source_type, source_id)` into the target directory. Caller must
    /// group files sharing a `target_parent` and call once per group.
    #[allow(clippy::too_many_arguments)]
    async fn transfer(
        &self,
        source_type: SourceType,
        source_id: &str,
        source_path: &str,
        target_path: &str,
        target_id: Option<&str>,
        file_ids: &[String],
        ext: TransferExt,
    ) -> Result<bool, CoreError>;

    /// Paginates internally; returns the full friend/group list.
    async fn get_relationships(&self, kind: SourceType) -> Result<Vec<RelationshipItem>, CoreError>;

    // -- Supplemental capabilities (admin surface only; never called from
    //    the scheduled sync path). Grounded on drivebase_service.py's port.

    async fn rename(&self, path: &str, new_name: &str) -> Result<BaseFileInfo, CoreError>;

    async fn move_item(&self, path: &str, target_path: &str) -> Result<bool, CoreError>;

    async fn copy_item(&self, path: &str, target_path: &str) -> Result<bool, CoreError>;

    async fn search(&self, keyword: &str, path: Option<&str>) -> Result<Vec<BaseFileInfo>, CoreError>;

    async fn get_recycle_list(&self) -> Result<Vec<BaseFileInfo>, CoreError>;

    async fn restore(&self, ids: &[String]) -> Result<bool, CoreError>;

    async fn clear_recycle(&self) -> Result<bool, CoreError>;
}
