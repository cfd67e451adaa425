//! API Module
//!
//! Thin HTTP surface over the rate limiter and cache service.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint (never rate limited)
//! - `GET /stats` - Cache and limiter statistics
//! - `GET|PUT|DELETE /cache/:key` - Single-key cache operations
//! - `DELETE /cache` - Clear every tracked key
//! - `POST /cache/batch` - Store many values
//! - `POST /cache/lookup` - Look up many keys

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use middleware::{client_identity, rate_limit};
pub use routes::create_router;
