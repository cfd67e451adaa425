//! Taskflow Guard - request rate limiting and a shared cache for Taskflow
//!
//! A fixed-window rate limiter keyed by hashed client identity, and a
//! namespaced cache service with key tracking, both backed by one
//! injected key-value store connection.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod limiter;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::CacheService;
pub use config::{Config, StoreBackend};
pub use limiter::{Decision, PolicyTable, RateLimitPolicy, RateLimiter};
pub use store::{MemoryStore, RedisStore, Store, StoreConnection};
pub use tasks::spawn_cleanup_task;
