//! Cache Manager Module
//!
//! Public facade over the store, ledger, and counters. Every operation is
//! best-effort: internal failures are logged, counted as errors, and turned
//! into a neutral result instead of being returned to the caller.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::cache::{
    CacheKey, CacheQuery, CacheStats, Codec, CounterSnapshot, DiskStore, Envelope, Lookup,
    MetadataLedger,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// == Stats Report ==
/// Everything `CacheManager::stats` reports.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub file_cache: CounterSnapshot,
    pub storage: StorageStats,
    pub performance: PerformanceStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    pub total_entries: u64,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    /// Advisory only; nothing evicts to stay under it
    pub max_size_mb: u64,
    pub compression_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    pub ttl_hours: u64,
    /// `None` until the first sweep
    pub last_cleanup: Option<DateTime<Utc>>,
    pub cache_dir: PathBuf,
}

// == Cache Manager ==
/// Disk-backed fallback cache for search results.
///
/// One instance owns one cache root. All methods take `&self`, so a manager
/// can be shared between threads behind an `Arc`.
#[derive(Debug)]
pub struct CacheManager {
    config: CacheConfig,
    store: DiskStore,
    ledger: MetadataLedger,
    stats: CacheStats,
}

impl CacheManager {
    // == Constructor ==
    /// Creates the cache root, every configured source directory, and an
    /// initial ledger.
    ///
    /// This is the only fallible operation; it fails with
    /// `CacheError::Configuration` when the TTL is zero, a configured source
    /// is not a valid directory name, or the directories cannot be created.
    pub fn new(config: CacheConfig) -> Result<Self> {
        if config.ttl_hours == 0 {
            return Err(CacheError::Configuration(
                "ttl_hours must be greater than zero".to_string(),
            ));
        }

        let root = config.cache_dir.clone();
        std::fs::create_dir_all(&root).map_err(|e| {
            CacheError::Configuration(format!(
                "cannot create cache directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let ttl = Duration::from_secs(config.ttl_hours.saturating_mul(3600));
        let store = DiskStore::new(&root, Codec::new(config.compression_enabled), ttl);
        let ledger = MetadataLedger::new(&root);

        for source in &config.sources {
            let source = checked_source(source)
                .map_err(|e| CacheError::Configuration(e.to_string()))?;
            let dir = store.source_dir(&source);
            std::fs::create_dir_all(&dir).map_err(|e| {
                CacheError::Configuration(format!(
                    "cannot create source directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        if let Err(e) = ledger.ensure(&store) {
            warn!("Failed to write initial cache ledger: {}", e);
        }

        info!(
            "File cache ready in {} (ttl={}h, compression={})",
            root.display(),
            config.ttl_hours,
            config.compression_enabled
        );

        Ok(Self {
            config,
            store,
            ledger,
            stats: CacheStats::new(),
        })
    }

    /// Configuration this manager was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Key the given query resolves to.
    pub fn key_for(&self, query: &CacheQuery) -> CacheKey {
        query.key()
    }

    // == Get ==
    /// Returns the live envelope for `query`, or `None` on a miss.
    ///
    /// A read may change the disk: an expired file is deleted, a corrupt one
    /// is removed, and a live one is rewritten with new access metadata.
    pub fn get(&self, query: &CacheQuery) -> Option<Envelope> {
        let key = self.key_for(query);
        let lookup = checked_source(&query.source).and_then(|source| self.store.read(&key, &source));

        match lookup {
            Ok(Lookup::Hit(envelope)) => {
                debug!("File cache hit: {}", key);
                self.stats.record_hit();
                Some(envelope)
            }
            Ok(Lookup::Missing) => {
                self.stats.record_miss();
                None
            }
            Ok(Lookup::Expired { removed }) => {
                self.stats.record_miss();
                if removed {
                    self.stats.record_deletion();
                    self.refresh_ledger();
                }
                None
            }
            Ok(Lookup::Corrupt { removed }) => {
                self.stats.record_error();
                if removed {
                    self.stats.record_deletion();
                    self.refresh_ledger();
                }
                None
            }
            Err(e) => {
                error!("Error reading from file cache: {}", e);
                self.stats.record_error();
                None
            }
        }
    }

    // == Set ==
    /// Stores `data` for `query`; returns whether the write landed.
    pub fn set<T>(&self, query: &CacheQuery, data: &T, metadata: Option<Map<String, Value>>) -> bool
    where
        T: Serialize + ?Sized,
    {
        match self.try_set(query, data, metadata) {
            Ok(()) => {
                self.stats.record_write();
                true
            }
            Err(e) => {
                error!("Error writing to file cache: {}", e);
                self.stats.record_error();
                false
            }
        }
    }

    fn try_set<T>(&self, query: &CacheQuery, data: &T, metadata: Option<Map<String, Value>>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let source = checked_source(&query.source)?;
        let key = query.key();
        let bytes = self.store.write(&key, &source, data, metadata)?;
        debug!("File cache write successful: {} ({} bytes)", key, bytes);
        self.refresh_ledger();
        Ok(())
    }

    // == Delete ==
    /// Removes the entry for `query`; returns whether a file was removed.
    pub fn delete(&self, query: &CacheQuery) -> bool {
        let result = checked_source(&query.source)
            .and_then(|source| self.store.delete(&query.key(), &source));
        match result {
            Ok(true) => {
                self.stats.record_deletion();
                self.refresh_ledger();
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!("Error deleting cache file: {}", e);
                self.stats.record_error();
                false
            }
        }
    }

    // == Cleanup Expired ==
    /// Deletes every expired entry; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        match self.ledger.sweep(&self.store) {
            Ok(removed) => removed,
            Err(e) => {
                error!("Cache cleanup failed: {}", e);
                self.stats.record_error();
                0
            }
        }
    }

    // == Stats ==
    /// Counters, ledger totals, and the effective configuration.
    pub fn stats(&self) -> StatsReport {
        let ledger = self.ledger.load();
        StatsReport {
            file_cache: self.stats.snapshot(),
            storage: StorageStats {
                total_entries: ledger.total_entries,
                total_size_bytes: ledger.total_size_bytes,
                total_size_mb: (ledger.total_size_bytes as f64 / BYTES_PER_MB * 100.0).round()
                    / 100.0,
                max_size_mb: self.config.max_cache_size_mb,
                compression_enabled: self.store.codec().compression_enabled(),
            },
            performance: PerformanceStats {
                ttl_hours: self.config.ttl_hours,
                last_cleanup: ledger.last_cleanup,
                cache_dir: self.store.root().to_path_buf(),
            },
        }
    }

    // == Clear All ==
    /// Deletes every entry in every source and resets the counters.
    pub fn clear_all(&self) -> bool {
        match self.try_clear_all() {
            Ok(removed) => {
                self.stats.reset();
                info!("File cache cleared: {} entries removed", removed);
                true
            }
            Err(e) => {
                error!("Failed to clear file cache: {}", e);
                self.stats.record_error();
                false
            }
        }
    }

    fn try_clear_all(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.store.entry_files()? {
            if crate::cache::store::remove_if_present(&path)? {
                removed += 1;
            }
        }
        self.ledger.recompute(&self.store)?;
        Ok(removed)
    }

    /// Recomputes the ledger after a mutation; failures are logged only.
    fn refresh_ledger(&self) {
        match self.ledger.recompute(&self.store) {
            Ok(ledger) => {
                let limit = self.config.max_cache_size_mb.saturating_mul(1024 * 1024);
                if limit > 0 && ledger.total_size_bytes > limit {
                    warn!(
                        "File cache holds {} bytes, above the advisory {} MB",
                        ledger.total_size_bytes, self.config.max_cache_size_mb
                    );
                }
            }
            Err(e) => error!("Failed to update cache metadata: {}", e),
        }
    }
}

/// Normalizes a source name and checks it is one safe path component.
fn checked_source(source: &str) -> Result<String> {
    let normalized = source.trim().to_lowercase();
    let valid = !normalized.is_empty()
        && normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(normalized)
    } else {
        Err(CacheError::InvalidSource(source.to_string()))
    }
}
