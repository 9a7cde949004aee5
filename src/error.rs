//! Error types for the file cache
//!
//! Provides unified error handling using thiserror. Every variant is
//! recoverable at the `CacheManager` boundary except `Configuration`.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The cache root or a source directory could not be set up
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Payload or metadata could not be encoded as JSON
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Bytes were neither gzip-compressed JSON nor raw JSON
    #[error("Corrupt cache data: {0}")]
    Deserialization(String),

    /// Filesystem failure, with the path that caused it
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source name is not a single safe path component
    #[error("Invalid source name: {0:?}")]
    InvalidSource(String),

    /// No live entry for the query
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The cache declined a write; details were logged by the manager
    #[error("Write failed: {0}")]
    WriteFailed(String),
}

impl CacheError {
    /// Wraps an `io::Error` together with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::InvalidSource(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Configuration(_)
            | CacheError::Serialization(_)
            | CacheError::Deserialization(_)
            | CacheError::Io { .. }
            | CacheError::WriteFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_mentions_path() {
        let err = CacheError::io(
            "/tmp/cache/indeed/x.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/cache/indeed/x.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CacheError::NotFound("k".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CacheError::InvalidSource("../x".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CacheError::Deserialization("bad".into())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
