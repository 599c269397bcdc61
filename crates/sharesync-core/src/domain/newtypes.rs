//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for domain identifiers and values. Each newtype
//! ensures data validity at construction time rather than leaving raw
//! strings/ints to be misused at call sites.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID value.
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// The nil (all-zero) identifier, used in tests and defaults.
            #[must_use]
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| DomainError::InvalidId(format!("invalid {}: {e}", stringify!($name))))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(AccountId, "Identifier for `Account` entities.");
uuid_id!(SyncConfigId, "Identifier for `SyncConfig` entities.");
uuid_id!(SyncTaskId, "Identifier for `SyncTask` entities.");

/// Identifier for `SyncTaskItem` rows (database row id, append-only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncTaskItemId(i64);

/// Identifier for `FileCache` rows (database row id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileCacheId(i64);

macro_rules! i64_id {
    ($name:ident) => {
        impl $name {
            /// Wrap a database row id.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the inner row id.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>()
                    .map(Self)
                    .map_err(|e| DomainError::InvalidId(format!("invalid {}: {e}", stringify!($name))))
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

i64_id!(SyncTaskItemId);
i64_id!(FileCacheId);

// ============================================================================
// Path types
// ============================================================================

/// A validated absolute drive path (`src_path`/`dst_path`/`file_path`).
///
/// Providers address files by an absolute, forward-slash path rooted at `/`.
/// Unlike a local filesystem path this never touches disk; it is purely a
/// string with join/parent/file-name operations used by the rule and diff
/// engines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DrivePath(String);

impl DrivePath {
    /// Create a new `DrivePath`.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPath` if the path does not start with
    /// `/`, contains `..`, or contains a doubled separator.
    pub fn new(path: impl Into<String>) -> Result<Self, DomainError> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(DomainError::InvalidPath(format!(
                "drive path must start with '/': {path}"
            )));
        }
        if path.len() > 1 && path.contains("//") {
            return Err(DomainError::InvalidPath(format!(
                "drive path contains a doubled separator: {path}"
            )));
        }
        if path.contains("..") {
            return Err(DomainError::InvalidPath(format!(
                "drive path contains traversal: {path}"
            )));
        }
        Ok(Self(path))
    }

    /// The root path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// `true` iff this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a single path component.
    ///
    /// # Errors
    /// Returns an error if `component` is empty or contains a separator.
    pub fn join(&self, component: &str) -> Result<Self, DomainError> {
        if component.is_empty() || component.contains('/') || component.contains("..") {
            return Err(DomainError::InvalidPath(format!(
                "invalid path component: {component}"
            )));
        }
        let joined = if self.0 == "/" {
            format!("/{component}")
        } else {
            format!("{}/{component}", self.0)
        };
        Self::new(joined)
    }

    /// The parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0 == "/" {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// The final path component, or `None` for the root.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.0 == "/" {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// This path with `base`'s prefix stripped, canonicalized with forward
    /// slashes. Returns `None` if this path is not under `base`.
    #[must_use]
    pub fn relative_to(&self, base: &DrivePath) -> Option<String> {
        if base.0 == "/" {
            return Some(self.0.trim_start_matches('/').to_string());
        }
        self.0
            .strip_prefix(base.0.as_str())
            .map(|rest| rest.trim_start_matches('/').to_string())
    }
}

impl Display for DrivePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DrivePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DrivePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DrivePath> for String {
    fn from(path: DrivePath) -> Self {
        path.0
    }
}

/// A provider-native file/folder identifier. Opaque beyond "non-empty".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Create a new `FileId`.
    ///
    /// # Errors
    /// Returns an error if `id` is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId("file id cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FileId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_round_trips_through_display_and_from_str() {
        let id = AccountId::new();
        let parsed: AccountId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn drive_path_rejects_relative_and_traversal() {
        assert!(DrivePath::new("relative").is_err());
        assert!(DrivePath::new("/a/../b").is_err());
        assert!(DrivePath::new("/a//b").is_err());
        assert!(DrivePath::new("/a/b").is_ok());
    }

    #[test]
    fn drive_path_join_and_parent() {
        let root = DrivePath::root();
        let photos = root.join("Photos").unwrap();
        assert_eq!(photos.as_str(), "/Photos");
        assert_eq!(photos.parent().unwrap(), root);
        assert_eq!(photos.file_name(), Some("Photos"));
    }

    #[test]
    fn drive_path_relative_to() {
        let base = DrivePath::new("/Backup").unwrap();
        let full = DrivePath::new("/Backup/Photos/a.jpg").unwrap();
        assert_eq!(full.relative_to(&base).as_deref(), Some("Photos/a.jpg"));
    }

    #[test]
    fn file_id_rejects_empty() {
        assert!(FileId::new("").is_err());
        assert!(FileId::new("abc123").is_ok());
    }
}
