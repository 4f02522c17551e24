//! API Handlers
//!
//! HTTP request handlers for each cache host endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::cache::CacheManager;
use crate::config::Config;
use crate::durable::{DurableTier, FileDurableTier, NoopDurableTier};
use crate::error::{CacheError, Result};
use crate::models::{
    ClearResponse, DeleteResponse, GetResponse, HealthResponse, SetRequest, SetResponse,
    StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache manager has no internal locking, so every handler goes through
/// this one lock.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<RwLock<CacheManager<Value>>>,
}

impl AppState {
    /// Creates a new AppState with the given cache manager.
    pub fn new(cache: CacheManager<Value>) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens a file-backed durable tier under `data_dir` when persistence is
    /// enabled. If the directory cannot be opened the cache runs volatile-only.
    pub fn from_config(config: &Config) -> Result<Self> {
        let durable: Box<dyn DurableTier> = if config.cache.persist {
            match FileDurableTier::open(&config.data_dir) {
                Ok(tier) => Box::new(tier),
                Err(e) => {
                    tracing::warn!(
                        "Cannot open durable tier at {:?}: {}; running volatile-only",
                        config.data_dir,
                        e
                    );
                    Box::new(NoopDurableTier)
                }
            }
        } else {
            Box::new(NoopDurableTier)
        };

        let cache = CacheManager::open(config.cache.clone(), durable)?;
        Ok(Self::new(cache))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let mut cache = state.cache.write().await;
    cache.set(req.key.clone(), req.value, req.ttl.map(Duration::from_secs))?;

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
///
/// Retrieves a value from the cache by key.
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Write lock: reads update access metadata and stats
    let mut cache = state.cache.write().await;
    let value = cache
        .get(&key)
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /del/:key
///
/// Removes a key from both tiers. Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let mut cache = state.cache.write().await;
    cache.remove(&key);

    Json(DeleteResponse::new(key))
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let mut cache = state.cache.write().await;
    cache.clear();

    Json(ClearResponse::new())
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.cache.read().await;

    Json(StatsResponse {
        stats: cache.stats(),
        strategy: cache.strategy(),
        capacity_bytes: cache.capacity_bytes(),
        durable_enabled: cache.durable_enabled(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
