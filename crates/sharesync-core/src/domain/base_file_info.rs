//! `BaseFileInfo` — the transient, in-memory shape passed between the
//! provider client, rule engine, diff engine, and sync executor.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider-specific transfer hints threaded through `file_ext`, e.g.
/// `msg_id`, `from_uk`, `share_fid_token`, `share_parent_fid`.
pub type FileExt = HashMap<String, Value>;

/// One file or folder as returned by `list_disk`/`list_share`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseFileInfo {
    pub file_id: String,
    pub file_name: String,
    pub file_path: String,
    pub is_folder: bool,
    pub file_size: u64,
    pub parent_id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_ext: FileExt,
}

impl BaseFileInfo {
    /// The suffix after the final `.` in `file_name`, or `None` for
    /// extension-less names and folders.
    pub fn extension(&self) -> Option<&str> {
        if self.is_folder {
            return None;
        }
        self.file_name.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// A friend/group relationship returned by `get_relationships`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipItem {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub kind: super::sync_config::SourceType,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, is_folder: bool) -> BaseFileInfo {
        BaseFileInfo {
            file_id: "f1".to_string(),
            file_name: name.to_string(),
            file_path: format!("/root/{name}"),
            is_folder,
            file_size: 0,
            parent_id: "root".to_string(),
            created_at: None,
            updated_at: None,
            file_ext: FileExt::new(),
        }
    }

    #[test]
    fn extension_is_none_for_folders_and_dotless_names() {
        assert_eq!(file("Photos", true).extension(), None);
        assert_eq!(file("README", false).extension(), None);
        assert_eq!(file("a.jpg", false).extension(), Some("jpg"));
    }
}
