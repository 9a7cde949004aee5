//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;

/// Data sources whose directories are created at startup.
pub const DEFAULT_SOURCES: &[&str] = &["indeed", "linkedin", "glassdoor"];

/// Construction-time settings for a `CacheManager`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Root directory holding per-source subdirectories and the ledger
    pub cache_dir: PathBuf,
    /// Entries older than this many hours are expired
    pub ttl_hours: u64,
    /// Advisory size ceiling, reported in stats but never enforced
    pub max_cache_size_mb: u64,
    /// Store entries gzip-compressed (`.json.gz`) instead of raw (`.json`)
    pub compression_enabled: bool,
    /// Known data sources, pre-created under `cache_dir`
    pub sources: Vec<String>,
}

impl CacheConfig {
    /// Creates a config rooted at `cache_dir` with default settings.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the TTL in hours.
    pub fn with_ttl_hours(mut self, ttl_hours: u64) -> Self {
        self.ttl_hours = ttl_hours;
        self
    }

    /// Enables or disables gzip compression.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }

    /// Sets the advisory maximum cache size.
    pub fn with_max_size_mb(mut self, max_cache_size_mb: u64) -> Self {
        self.max_cache_size_mb = max_cache_size_mb;
        self
    }

    /// Replaces the list of known sources.
    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Loads cache settings from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_DIR` - Cache root (default: `cache`)
    /// - `CACHE_TTL_HOURS` - Entry lifetime in hours (default: 24)
    /// - `CACHE_MAX_SIZE_MB` - Advisory size ceiling (default: 50)
    /// - `CACHE_COMPRESSION` - gzip entries (default: true)
    /// - `CACHE_SOURCES` - Comma-separated source names (default: indeed,linkedin,glassdoor)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("CACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            ttl_hours: env::var("CACHE_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ttl_hours),
            max_cache_size_mb: env::var("CACHE_MAX_SIZE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_cache_size_mb),
            compression_enabled: env::var("CACHE_COMPRESSION")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.compression_enabled),
            sources: env::var("CACHE_SOURCES")
                .ok()
                .map(|v| parse_list(&v))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.sources),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            ttl_hours: 24,
            max_cache_size_mb: 50,
            compression_enabled: true,
            sources: DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings for the cache itself
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Expiry sweep interval in seconds; 0 disables the sweep task
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 3600)
    /// - plus everything read by [`CacheConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            cache: CacheConfig::from_env(),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            cleanup_interval: env::var("CLEANUP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            cleanup_interval: 3600,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
