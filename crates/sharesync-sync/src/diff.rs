//! The diff engine (C5): compares a source file listing against a target
//! file listing and produces the set of operations needed to bring the
//! target in line, honoring the configured [`SyncMethod`].
//!
//! Grounded on `compare_drive_lists`/`perform_comparison_logic`. `to_update`
//! and `to_rename` are kept as always-empty fields on [`DiffResult`] rather
//! than removed outright — the original's update/rename detection never
//! actually populated them for any sync method, and overwrite mode is kept
//! single-level by design rather than extended to recursion.

use std::collections::{HashMap, HashSet};

use sharesync_core::domain::{BaseFileInfo, SyncMethod};
use sharesync_rules::RenameSet;

/// One file to be created under the target tree.
#[derive(Debug, Clone)]
pub struct AddItem {
    pub source: BaseFileInfo,
    pub target_full_path: String,
    pub target_parent_path: String,
    pub target_parent_file_id: Option<String>,
}

/// The result of comparing a source listing against a target listing.
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    pub to_add: Vec<AddItem>,
    pub to_delete: Vec<BaseFileInfo>,
    /// Reserved: never populated, per the source system's own comparison
    /// logic (it detects no update case for any sync method).
    pub to_update: Vec<AddItem>,
    /// Reserved: never populated, same reason as `to_update`.
    pub to_rename: Vec<AddItem>,
    /// Target directory paths (depth-ascending) that don't exist yet and
    /// must be created before any file listed in `to_add` can land.
    pub missing_dirs: Vec<String>,
}

fn relative_path(full_path: &str, base_path: &str) -> String {
    if base_path.is_empty() {
        return full_path.to_string();
    }
    let full = if full_path.starts_with('/') { full_path.to_string() } else { format!("/{full_path}") };
    let base = base_path.trim_end_matches('/');
    let base = if base.starts_with('/') { base.to_string() } else { format!("/{base}") };

    full.strip_prefix(base.as_str()).map(str::to_string).unwrap_or(full)
}

fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
        None => "/".to_string(),
    }
}

fn target_paths_for(source: &BaseFileInfo, source_base_path: &str, target_base_path: &str) -> (String, String) {
    let relative = relative_path(&source.file_path, source_base_path);
    let joined = format!("{target_base_path}/{relative}");
    let target_full_path = joined.replace("//", "/");
    let target_parent_path = parent_path(&target_full_path);
    (target_full_path, target_parent_path)
}

/// Walks up from `target_parent_path` toward `target_base_path` looking
/// for the nearest ancestor directory that already exists in
/// `target_path_to_file_id`.
fn resolve_parent_file_id(
    target_parent_path: &str,
    target_base_path: &str,
    target_path_to_file_id: &HashMap<String, String>,
) -> Option<String> {
    if let Some(id) = target_path_to_file_id.get(target_parent_path) {
        return Some(id.clone());
    }

    let mut current = target_parent_path.to_string();
    while !current.is_empty() && current != "/" && current != target_base_path {
        if let Some(id) = target_path_to_file_id.get(&current) {
            return Some(id.clone());
        }
        current = parent_path(&current);
    }

    target_path_to_file_id.get(target_base_path).cloned()
}

/// Compares `source_list` against `target_list` under `mode`, applying
/// `rename_rules` to each source item before path resolution (the first
/// matching rule wins; later rules are skipped for that item).
pub fn compare(
    source_list: &[BaseFileInfo],
    target_list: &[BaseFileInfo],
    mode: SyncMethod,
    rename_rules: &RenameSet,
    source_base_path: &str,
    target_base_path: &str,
) -> DiffResult {
    let source_base_path = source_base_path.trim_end_matches('/');
    let target_base_path = target_base_path.trim_end_matches('/');

    let target_path_to_file_id: HashMap<String, String> = target_list
        .iter()
        .filter(|item| !item.file_path.is_empty() && !item.file_id.is_empty())
        .map(|item| (item.file_path.clone(), item.file_id.clone()))
        .collect();

    if mode == SyncMethod::Overwrite {
        return compare_overwrite(source_list, target_list, rename_rules, source_base_path, target_base_path, &target_path_to_file_id);
    }

    let mut to_add = Vec::new();
    for src_item in source_list {
        let resolved = rename_rules.apply(src_item).unwrap_or_else(|| src_item.clone());
        let (target_full_path, target_parent_path) = target_paths_for(&resolved, source_base_path, target_base_path);
        let target_parent_file_id = resolve_parent_file_id(&target_parent_path, target_base_path, &target_path_to_file_id);

        if target_parent_file_id.is_none() {
            tracing::warn!(path = %target_parent_path, "could not resolve target parent directory, will error at transfer time");
        }

        to_add.push(AddItem {
            source: resolved,
            target_full_path,
            target_parent_path,
            target_parent_file_id,
        });
    }

    let to_delete = if mode == SyncMethod::Full {
        let expected: HashSet<&str> = to_add.iter().map(|item| item.target_full_path.as_str()).collect();
        target_list.iter().filter(|item| !expected.contains(item.file_path.as_str())).cloned().collect()
    } else {
        Vec::new()
    };

    let missing_dirs = collect_missing_dirs(&to_add, target_base_path, &target_path_to_file_id);

    DiffResult { to_add, to_delete, to_update: Vec::new(), to_rename: Vec::new(), missing_dirs }
}

fn compare_overwrite(
    source_list: &[BaseFileInfo],
    target_list: &[BaseFileInfo],
    rename_rules: &RenameSet,
    source_base_path: &str,
    target_base_path: &str,
    target_path_to_file_id: &HashMap<String, String>,
) -> DiffResult {
    let to_delete = target_list.to_vec();
    let root_file_id = target_path_to_file_id.get(target_base_path).cloned();

    let mut to_add = Vec::new();
    for src_item in source_list {
        let resolved = rename_rules.apply(src_item).unwrap_or_else(|| src_item.clone());
        let (target_full_path, target_parent_path) = target_paths_for(&resolved, source_base_path, target_base_path);

        to_add.push(AddItem {
            source: resolved,
            target_full_path,
            target_parent_path,
            target_parent_file_id: root_file_id.clone(),
        });
    }

    let missing_dirs = collect_missing_dirs(&to_add, target_base_path, target_path_to_file_id);

    DiffResult { to_add, to_delete, to_update: Vec::new(), to_rename: Vec::new(), missing_dirs }
}

/// Directories referenced as `target_parent_path` that don't already exist,
/// sorted so parents sort before their children (fewer path separators
/// first).
fn collect_missing_dirs(
    to_add: &[AddItem],
    target_base_path: &str,
    target_path_to_file_id: &HashMap<String, String>,
) -> Vec<String> {
    let mut missing: HashSet<String> = HashSet::new();
    for item in to_add {
        if item.target_parent_path != "/"
            && item.target_parent_path != target_base_path
            && !target_path_to_file_id.contains_key(&item.target_parent_path)
        {
            missing.insert(item.target_parent_path.clone());
        }
    }

    let mut sorted: Vec<String> = missing.into_iter().collect();
    sorted.sort_by_key(|path| path.matches('/').count());
    sorted
}
