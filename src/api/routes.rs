//! API Routes
//!
//! Configures the Axum router with all endpoints.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    batch_set_handler, clear_handler, delete_handler, get_handler, health_handler,
    lookup_handler, set_handler, stats_handler, AppState,
};
use super::middleware::rate_limit;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check
/// - `GET /stats` - Cache and limiter statistics
/// - `GET|PUT|DELETE /cache/:key` - Single-key cache operations
/// - `DELETE /cache` - Clear every tracked key
/// - `POST /cache/batch` - Store many `[key, value]` pairs
/// - `POST /cache/lookup` - Look up many keys
///
/// # Middleware
/// - Admission: per-route rate limiting (routes without a policy pass)
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/cache", delete(clear_handler))
        .route("/cache/batch", post(batch_set_handler))
        .route("/cache/lookup", post(lookup_handler))
        .route(
            "/cache/:key",
            get(get_handler).put(set_handler).delete(delete_handler),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
