//! Expiry Sweep Task
//!
//! Background task that periodically removes expired cache files. Reads
//! already expire stale entries lazily; the sweep only keeps entries that are
//! never read again from lingering on disk.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::CacheManager;

/// Spawns a background task that periodically sweeps expired cache files.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Each sweep runs on the blocking pool since it walks the
/// cache directory with ordinary file I/O.
///
/// # Arguments
/// * `cache` - Shared cache manager
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(CacheManager::new(CacheConfig::default())?);
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 3600);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: Arc<CacheManager>, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let cache = Arc::clone(&cache);
            match tokio::task::spawn_blocking(move || cache.cleanup_expired()).await {
                Ok(0) => debug!("Expiry sweep: no expired entries found"),
                Ok(removed) => info!("Expiry sweep: removed {} expired entries", removed),
                Err(e) => error!("Expiry sweep task failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheQuery;
    use crate::config::CacheConfig;
    use serde_json::json;
    use std::fs::File;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn create_cache() -> (Arc<CacheManager>, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(CacheConfig::new(dir.path()).with_compression(false)).unwrap();
        (Arc::new(cache), dir)
    }

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let (cache, dir) = create_cache();
        let query = CacheQuery::new("indeed", "expire soon", "remote");
        assert!(cache.set(&query, &json!("value"), None));

        let path = dir
            .path()
            .join("indeed")
            .join(format!("{}.json", query.key()));
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(30 * 3600))
            .unwrap();

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(!path.exists(), "Expired entry should have been swept");
        assert_eq!(cache.stats().storage.total_entries, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_preserves_valid_entries() {
        let (cache, _dir) = create_cache();
        let query = CacheQuery::new("indeed", "long lived", "remote");
        assert!(cache.set(&query, &json!("value"), None));

        let handle = spawn_cleanup_task(cache.clone(), 1);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let entry = cache.get(&query).expect("Valid entry should not be removed");
        assert_eq!(entry.data, json!("value"));

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let (cache, _dir) = create_cache();

        let handle = spawn_cleanup_task(cache, 1);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
