//! Cache Module
//!
//! Namespaced, TTL-bound caching of computed results in the shared store,
//! with an in-process index of written keys for bulk invalidation.

mod key;
mod service;
mod stats;
mod tracker;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use key::{namespace_for, validate_key, APP_PREFIX, MAX_KEY_LENGTH};
pub use service::{CacheService, DEFAULT_TTL_SECS, MAX_VALUE_SIZE};
pub use stats::{CacheCounters, CacheStats};
pub use tracker::KeyTracker;
