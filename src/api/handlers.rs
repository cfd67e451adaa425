//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use crate::cache::{validate_key, CacheService};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::limiter::{PolicyTable, RateLimitPolicy, RateLimiter};
use crate::models::{
    BatchSetRequest, BatchSetResponse, DeleteResponse, GetResponse, HealthResponse,
    LookupRequest, LookupResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::store::StoreConnection;

/// Application state shared across all handlers.
///
/// Both components hold a clone of the same store connection.
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheService,
    pub limiter: RateLimiter,
    /// Per-route policies, resolved by the admission middleware
    pub policies: Arc<PolicyTable>,
    /// Store backend name, for health reporting
    pub store_backend: &'static str,
}

impl AppState {
    /// Creates a new AppState from its parts.
    pub fn new(store: StoreConnection, cache: CacheService, policies: PolicyTable) -> Self {
        Self {
            store_backend: store.backend_name(),
            limiter: RateLimiter::new(store),
            cache,
            policies: Arc::new(policies),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Every route except `/health` gets the configured default policy.
    pub fn from_config(config: &Config, store: StoreConnection) -> Self {
        let cache = CacheService::new(store.clone(), &config.environment)
            .with_default_ttl(config.cache_default_ttl);
        Self::new(store, cache, default_policies(config))
    }
}

/// Routes and the policy each one is limited by.
pub fn default_policies(config: &Config) -> PolicyTable {
    let policy = RateLimitPolicy::new(config.rate_limit_limit, config.rate_limit_window_ms);

    PolicyTable::new()
        .with("GET", "/stats", policy)
        .with("GET", "/cache/:key", policy)
        .with("PUT", "/cache/:key", policy)
        .with("DELETE", "/cache/:key", policy)
        .with("DELETE", "/cache", policy)
        .with("POST", "/cache/batch", policy)
        .with("POST", "/cache/lookup", policy)
}

/// Handler for PUT /cache/:key
pub async fn set_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<SetRequest>,
) -> ApiResult<Json<SetResponse>> {
    let stored = state.cache.set(&key, &req.value, req.ttl).await?;

    Ok(Json(SetResponse::new(key, stored)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<GetResponse>> {
    match state.cache.get::<Value>(&key).await {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(ApiError::NotFound(key)),
    }
}

/// Handler for DELETE /cache/:key
///
/// Deleting an absent key succeeds; only a store failure is an error.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    validate_key(&key)?;

    if state.cache.delete(&key).await {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(ApiError::Internal(format!("Failed to delete key '{}'", key)))
    }
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> StatusCode {
    state.cache.clear().await;
    StatusCode::NO_CONTENT
}

/// Handler for POST /cache/batch
pub async fn batch_set_handler(
    State(state): State<AppState>,
    Json(req): Json<BatchSetRequest>,
) -> ApiResult<Json<BatchSetResponse>> {
    let stored = state.cache.mset(&req.entries, req.ttl).await?;

    Ok(Json(BatchSetResponse {
        requested: req.entries.len(),
        stored,
    }))
}

/// Handler for POST /cache/lookup
pub async fn lookup_handler(
    State(state): State<AppState>,
    Json(req): Json<LookupRequest>,
) -> Json<LookupResponse> {
    let values = state.cache.mget(&req.keys).await;
    Json(LookupResponse { values })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.cache.stats().await,
        state.limiter.stats(),
    ))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.store_backend))
}
