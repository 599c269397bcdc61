//! Shared BFS listing helper used by every provider's `list_disk`.
//!
//! Factors out the recursion/pruning/pacing rules common to spec §4.1 so
//! each provider only needs to supply a "list one level" closure over its
//! own wire format.

use std::collections::VecDeque;
use std::time::Duration;

use sharesync_core::domain::errors::CoreError;
use sharesync_core::domain::BaseFileInfo;
use sharesync_core::ports::{ListingFilter, Speed};

/// Breadth-first listing starting at `(root_path, root_id)`.
///
/// A folder excluded by `filter` is pruned from recursion: its children are
/// never listed. `speed == Slow` sleeps `slow_pause` before each descent
/// past the root. `speed == Fast` has no cache to consult at this layer and
/// behaves like `Normal`, per spec §4.1's documented fallback.
pub async fn bfs_list<F, Fut>(
    root_path: &str,
    root_id: Option<&str>,
    recursive: bool,
    speed: Speed,
    slow_pause: Duration,
    filter: &dyn ListingFilter,
    mut list_one_level: F,
) -> Result<Vec<BaseFileInfo>, CoreError>
where
    F: FnMut(String, Option<String>) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<BaseFileInfo>, CoreError>>,
{
    let mut results = Vec::new();
    let mut queue = VecDeque::new();
    queue.push_back((root_path.to_string(), root_id.map(str::to_string)));
    let mut first = true;

    while let Some((path, parent_id)) = queue.pop_front() {
        if !first && matches!(speed, Speed::Slow) {
            tokio::time::sleep(slow_pause).await;
        }
        first = false;

        let children = list_one_level(path, parent_id).await?;
        for item in children {
            if filter.excludes(&item) {
                continue;
            }
            if recursive && item.is_folder {
                queue.push_back((item.file_path.clone(), Some(item.file_id.clone())));
            }
            results.push(item);
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharesync_core::ports::NoopFilter;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn file(path: &str, id: &str) -> BaseFileInfo {
        BaseFileInfo {
            file_id: id.to_string(),
            file_name: path.rsplit('/').next().unwrap_or(path).to_string(),
            file_path: path.to_string(),
            is_folder: false,
            file_size: 10,
            parent_id: String::new(),
            created_at: None,
            updated_at: None,
            file_ext: Default::default(),
        }
    }

    fn folder(path: &str, id: &str) -> BaseFileInfo {
        let mut f = file(path, id);
        f.is_folder = true;
        f
    }

    #[tokio::test]
    async fn non_recursive_only_lists_one_level() {
        let result = bfs_list(
            "/root",
            None,
            false,
            Speed::Normal,
            Duration::from_secs(0),
            &NoopFilter,
            |_path, _parent| async { Ok(vec![file("/root/a.txt", "1"), folder("/root/sub", "2")]) },
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn recursive_descends_into_folders() {
        let calls = Mutex::new(Vec::new());
        let result = bfs_list(
            "/root",
            None,
            true,
            Speed::Normal,
            Duration::from_secs(0),
            &NoopFilter,
            |path, parent| {
                calls.lock().unwrap().push(path.clone());
                async move {
                    if path == "/root" {
                        Ok(vec![folder("/root/sub", "2")])
                    } else {
                        let _ = parent;
                        Ok(vec![file("/root/sub/leaf.txt", "3")])
                    }
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(calls.into_inner().unwrap(), vec!["/root", "/root/sub"]);
    }

    #[tokio::test]
    async fn excluded_folder_is_pruned_from_recursion() {
        struct ExcludeSub;
        impl ListingFilter for ExcludeSub {
            fn excludes(&self, item: &BaseFileInfo) -> bool {
                item.file_name == "sub"
            }
        }

        let descended = AtomicU32::new(0);
        let result = bfs_list(
            "/root",
            None,
            true,
            Speed::Normal,
            Duration::from_secs(0),
            &ExcludeSub,
            |path, _parent| {
                descended.fetch_add(1, Ordering::SeqCst);
                async move {
                    if path == "/root" {
                        Ok(vec![folder("/root/sub", "2"), file("/root/keep.txt", "4")])
                    } else {
                        panic!("should never descend into excluded folder");
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].file_name, "keep.txt");
        assert_eq!(descended.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_speed_pauses_before_each_descent_past_root() {
        let start = std::time::Instant::now();
        let _ = bfs_list(
            "/root",
            None,
            true,
            Speed::Slow,
            Duration::from_millis(20),
            &NoopFilter,
            |path, _parent| async move {
                if path == "/root" {
                    Ok(vec![folder("/root/sub", "2")])
                } else {
                    Ok(vec![])
                }
            },
        )
        .await
        .unwrap();
        assert!(start.elapsed().as_millis() >= 20);
    }
}
