//! Cache Module
//!
//! Provides a disk-backed fallback cache with hybrid keys, atomic writes,
//! TTL expiration, and an occupancy ledger.

mod codec;
mod key;
mod ledger;
mod manager;
mod stats;
pub(crate) mod store;


// Re-export public types
pub use codec::{Codec, Compression, Envelope, COMPRESSION_RATIO};
pub use key::{derive_key, CacheKey, CacheQuery, ExtraParams};
pub use ledger::{Ledger, MetadataLedger, LEDGER_FILE};
pub use manager::{CacheManager, PerformanceStats, StatsReport, StorageStats};
pub use stats::{hit_rate, CacheStats, CounterSnapshot};
pub use store::{DiskStore, Lookup};
