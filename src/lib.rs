//! jobcache - A disk-backed fallback cache for job-search results
//!
//! Stores search payloads as JSON (optionally gzip-compressed) files with
//! hybrid keys, atomic writes, and TTL expiration. Used when a faster shared
//! cache is unreachable.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheManager, CacheQuery};
pub use config::{CacheConfig, Config};
pub use error::CacheError;
pub use tasks::spawn_cleanup_task;
