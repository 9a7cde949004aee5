//! API Handlers
//!
//! HTTP request handlers for each cache maintenance endpoint. The cache is
//! synchronous, so every call into it runs on the blocking thread pool.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::cache::{CacheManager, StatsReport};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::models::{
    CleanupResponse, ClearResponse, DeleteResponse, GetResponse, HealthResponse, QueryRequest,
    SetRequest, SetResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared cache manager
    pub cache: Arc<CacheManager>,
}

impl AppState {
    /// Creates a new AppState around an existing manager.
    pub fn new(cache: CacheManager) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Builds the manager from configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        CacheManager::new(config.clone()).map(Self::new)
    }

    /// Runs `f` against the manager on the blocking pool.
    async fn with_cache<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&CacheManager) -> T + Send + 'static,
        T: Send + 'static,
    {
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || f(&cache))
            .await
            .map_err(|e| CacheError::WriteFailed(format!("cache task failed: {}", e)))
    }
}

/// Handler for PUT /set
///
/// Stores a payload under the key derived from the query fields.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let query = req.query.to_query();
    let key = state.cache.key_for(&query);
    let stored = state
        .with_cache(move |cache| cache.set(&query, &req.data, req.metadata))
        .await?;

    if stored {
        Ok(Json(SetResponse::new(key.to_string())))
    } else {
        Err(CacheError::WriteFailed(key.to_string()))
    }
}

/// Handler for POST /get
///
/// Looks up the entry for a query. Note that a lookup can delete an
/// expired file.
pub async fn get_handler(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<GetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let query = req.to_query();
    let key = state.cache.key_for(&query);
    let entry = state.with_cache(move |cache| cache.get(&query)).await?;

    entry
        .map(|entry| Json(GetResponse::new(key.to_string(), entry)))
        .ok_or_else(|| CacheError::NotFound(key.to_string()))
}

/// Handler for POST /del
pub async fn delete_handler(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<DeleteResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let query = req.to_query();
    let key = state.cache.key_for(&query);
    let removed = state.with_cache(move |cache| cache.delete(&query)).await?;

    if removed {
        Ok(Json(DeleteResponse::new(key.to_string())))
    } else {
        Err(CacheError::NotFound(key.to_string()))
    }
}

/// Handler for POST /cleanup
pub async fn cleanup_handler(State(state): State<AppState>) -> Result<Json<CleanupResponse>> {
    let removed = state.with_cache(|cache| cache.cleanup_expired()).await?;
    Ok(Json(CleanupResponse { removed }))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Result<Json<ClearResponse>> {
    if state.with_cache(|cache| cache.clear_all()).await? {
        Ok(Json(ClearResponse::cleared()))
    } else {
        Err(CacheError::WriteFailed("clear".to_string()))
    }
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsReport>> {
    let report = state.with_cache(|cache| cache.stats()).await?;
    Ok(Json(report))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
