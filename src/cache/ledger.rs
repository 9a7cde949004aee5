//! Metadata Ledger Module
//!
//! Persists an occupancy summary at `{root}/cache_metadata.json`. The summary
//! is always rebuilt from a directory scan; the files on disk are the source
//! of truth.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::store::DiskStore;
use crate::error::{CacheError, Result};

/// Ledger file name inside the cache root.
pub const LEDGER_FILE: &str = "cache_metadata.json";

// == Ledger ==
/// Aggregate occupancy of the cache directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub created_at: DateTime<Utc>,
    pub total_entries: u64,
    pub total_size_bytes: u64,
    #[serde(default)]
    pub last_cleanup: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            total_entries: 0,
            total_size_bytes: 0,
            last_cleanup: None,
            last_updated: None,
        }
    }
}

// == Metadata Ledger ==
/// Loads, saves, and recomputes the ledger file.
#[derive(Debug, Clone)]
pub struct MetadataLedger {
    path: PathBuf,
}

impl MetadataLedger {
    /// Creates a ledger handle for the given cache root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            path: root.into().join(LEDGER_FILE),
        }
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Writes an initial ledger unless one already exists.
    pub fn ensure(&self, store: &DiskStore) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        self.save(store, &Ledger::default())
    }

    // == Load ==
    /// Reads the ledger; a missing or unreadable file yields a fresh default.
    pub fn load(&self) -> Ledger {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read cache ledger: {}", e);
                }
                return Ledger::default();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!("Cache ledger is unreadable, starting fresh: {}", e);
            Ledger::default()
        })
    }

    // == Save ==
    /// Persists the ledger through the store's atomic write path.
    pub fn save(&self, store: &DiskStore, ledger: &Ledger) -> Result<()> {
        let json = serde_json::to_vec_pretty(ledger)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        store.write_atomic(&self.path, &json, None)
    }

    // == Recompute ==
    /// Rescans every source directory and overwrites the totals.
    ///
    /// A file removed mid-scan is skipped, so the totals may lag a concurrent
    /// writer by one entry.
    pub fn recompute(&self, store: &DiskStore) -> Result<Ledger> {
        let mut ledger = self.load();
        let mut total_entries = 0;
        let mut total_size_bytes = 0;

        for path in store.entry_files()? {
            if let Ok(meta) = fs::metadata(&path) {
                total_entries += 1;
                total_size_bytes += meta.len();
            }
        }

        ledger.total_entries = total_entries;
        ledger.total_size_bytes = total_size_bytes;
        ledger.last_updated = Some(Utc::now());
        self.save(store, &ledger)?;

        debug!(
            "Ledger recomputed: {} entries, {} bytes",
            total_entries, total_size_bytes
        );
        Ok(ledger)
    }

    // == Sweep ==
    /// Deletes every expired entry file, then recomputes and stamps
    /// `last_cleanup`. Returns the number of files removed.
    pub fn sweep(&self, store: &DiskStore) -> Result<usize> {
        let mut removed = 0;

        for path in store.entry_files()? {
            if !store.is_expired(&path) {
                continue;
            }
            match store.remove_if_expired(&path) {
                Ok(true) => {
                    removed += 1;
                    debug!("Cleaned up expired cache: {}", path.display());
                }
                Ok(false) => {}
                Err(e) => warn!("Failed to clean up expired cache: {}", e),
            }
        }

        let mut ledger = self.recompute(store)?;
        ledger.last_cleanup = Some(Utc::now());
        self.save(store, &ledger)?;

        info!("Cache cleanup completed: {} expired entries removed", removed);
        Ok(removed)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{derive_key, Codec, ExtraParams};
    use serde_json::json;
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    fn setup() -> (DiskStore, MetadataLedger, TempDir) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = DiskStore::new(dir.path(), Codec::new(true), DAY);
        let ledger = MetadataLedger::new(dir.path());
        (store, ledger, dir)
    }

    fn write_entry(store: &DiskStore, term: &str) -> PathBuf {
        let key = derive_key("indeed", term, "remote", &ExtraParams::new());
        store.write(&key, "indeed", &json!({"term": term}), None).unwrap();
        store.entry_path(&key, "indeed")
    }

    fn expire(path: &std::path::Path) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - DAY * 2).unwrap();
    }

    #[test]
    fn test_load_missing_returns_default() {
        let (_store, ledger, _dir) = setup();
        let loaded = ledger.load();
        assert_eq!(loaded.total_entries, 0);
        assert_eq!(loaded.total_size_bytes, 0);
        assert!(loaded.last_cleanup.is_none());
    }

    #[test]
    fn test_load_garbage_returns_default() {
        let (_store, ledger, _dir) = setup();
        fs::write(ledger.path(), b"{ not json").unwrap();
        assert_eq!(ledger.load().total_entries, 0);
    }

    #[test]
    fn test_ensure_keeps_existing() {
        let (store, ledger, _dir) = setup();
        ledger.ensure(&store).unwrap();
        let first = ledger.load();
        ledger.ensure(&store).unwrap();
        assert_eq!(ledger.load().created_at, first.created_at);
    }

    #[test]
    fn test_recompute_counts_entries_and_bytes() {
        let (store, ledger, _dir) = setup();
        let a = write_entry(&store, "rust");
        let b = write_entry(&store, "go");
        let expected = fs::metadata(&a).unwrap().len() + fs::metadata(&b).unwrap().len();

        let summary = ledger.recompute(&store).unwrap();

        assert_eq!(summary.total_entries, 2);
        assert_eq!(summary.total_size_bytes, expected);
        assert!(summary.last_updated.is_some());
        assert_eq!(ledger.load(), summary);
    }

    #[test]
    fn test_recompute_ignores_stale_totals() {
        let (store, ledger, _dir) = setup();
        let mut bogus = Ledger::default();
        bogus.total_entries = 999;
        ledger.save(&store, &bogus).unwrap();

        assert_eq!(ledger.recompute(&store).unwrap().total_entries, 0);
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (store, ledger, _dir) = setup();
        let old = [write_entry(&store, "a"), write_entry(&store, "b")];
        let live = [
            write_entry(&store, "c"),
            write_entry(&store, "d"),
            write_entry(&store, "e"),
        ];
        for path in &old {
            expire(path);
        }

        let removed = ledger.sweep(&store).unwrap();

        assert_eq!(removed, 2);
        assert!(old.iter().all(|p| !p.exists()));
        assert!(live.iter().all(|p| p.exists()));
        let summary = ledger.load();
        assert_eq!(summary.total_entries, 3);
        assert!(summary.last_cleanup.is_some());
    }
}
