//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the server is up.
//!
//! # Tasks
//! - Expiry sweep: Removes expired cache files at configured intervals

mod cleanup;

pub use cleanup::spawn_cleanup_task;
