//! Raw (wire/DB) shapes of exclusion and rename rules.
//!
//! These are the JSON-serializable forms stored on `SyncConfig.exclude` /
//! `SyncConfig.rename`. Compilation into matchers (regex/glob) is the rule
//! engine's job, not the domain's.

use serde::{Deserialize, Serialize};

/// What part of an item a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleTarget {
    Name,
    Path,
    Extension,
}

/// Which kind of item a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    File,
    Folder,
    Any,
}

/// How a rule's `pattern` is matched against the selected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Contains,
    Regex,
    Wildcard,
}

/// An exclusion rule as persisted in `SyncConfig.exclude`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub pattern: String,
    pub target: RuleTarget,
    #[serde(default = "default_item_type")]
    pub item_type: ItemType,
    pub mode: MatchMode,
    #[serde(default)]
    pub case_sensitive: bool,
}

fn default_item_type() -> ItemType {
    ItemType::Any
}

/// Which field a rename rule's regex is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameScope {
    Name,
    Path,
}

/// A rename rule as persisted in `SyncConfig.rename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    pub match_regex: String,
    pub replace_string: String,
    pub target_scope: RenameScope,
    #[serde(default)]
    pub case_sensitive: bool,
}
