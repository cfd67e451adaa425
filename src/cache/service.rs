//! Cache Service Module
//!
//! Namespaced, TTL-bound cache of serialized values over the shared store.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::cache::{namespace_for, validate_key, CacheCounters, CacheStats, KeyTracker};
use crate::error::{CacheError, CacheResult};
use crate::store::StoreConnection;

/// TTL applied when a caller does not pass one
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Maximum allowed serialized value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Cache Service ==
/// Best-effort cache: store failures degrade to misses and no-ops.
///
/// Values are stored as JSON. Every `set` serializes and every `get`
/// deserializes a fresh value, so the caller never shares memory with what
/// is stored.
///
/// Only malformed input is reported back, as [`CacheError::InvalidInput`].
#[derive(Debug, Clone)]
pub struct CacheService {
    store: StoreConnection,
    namespace: String,
    default_ttl: u64,
    tracked: Arc<RwLock<KeyTracker>>,
    counters: Arc<CacheCounters>,
}

impl CacheService {
    // == Constructor ==
    /// Creates a cache namespaced to `environment`, with a 300s default TTL.
    pub fn new(store: StoreConnection, environment: &str) -> Self {
        Self {
            store,
            namespace: namespace_for(environment),
            default_ttl: DEFAULT_TTL_SECS,
            tracked: Arc::new(RwLock::new(KeyTracker::new())),
            counters: Arc::new(CacheCounters::default()),
        }
    }

    /// Overrides the default TTL in seconds.
    pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
        self.default_ttl = ttl_secs;
        self
    }

    /// `taskflow:<environment>:`
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Store key for a logical key.
    pub fn namespaced_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl_secs` (default 300).
    ///
    /// Returns `Ok(true)` when stored, `Ok(false)` when the store or
    /// serialization failed (logged), and `Err` for an invalid key or TTL.
    pub async fn set<T>(&self, key: &str, value: &T, ttl_secs: Option<u64>) -> CacheResult<bool>
    where
        T: Serialize + ?Sized,
    {
        if let Err(e) = validate_key(key) {
            warn!(error = %e, "rejected cache set");
            return Err(e);
        }
        let ttl = ttl_secs.unwrap_or(self.default_ttl);
        if ttl == 0 {
            warn!(key, "rejected cache set with zero TTL");
            return Err(CacheError::InvalidInput(
                "TTL must be at least one second".to_string(),
            ));
        }

        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(key, error = %e, "failed to serialize cache value");
                self.counters.record_error();
                return Ok(false);
            }
        };
        if bytes.len() > MAX_VALUE_SIZE {
            warn!(key, size = bytes.len(), "cache value too large, not stored");
            return Ok(false);
        }

        let full_key = self.namespaced_key(key);
        match self
            .store
            .set(&full_key, bytes, ttl.saturating_mul(1000))
            .await
        {
            Ok(()) => {
                self.tracked.write().await.track(&full_key);
                debug!(key = %full_key, ttl, "cache set");
                Ok(true)
            }
            Err(e) => {
                error!(key = %full_key, error = %e, "cache set failed");
                self.counters.record_error();
                Ok(false)
            }
        }
    }

    // == Get ==
    /// Returns the cached value, or `None` on a miss.
    ///
    /// Store failures and undecodable values also yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Err(e) = validate_key(key) {
            warn!(error = %e, "rejected cache get");
            self.counters.record_miss();
            return None;
        }

        let full_key = self.namespaced_key(key);
        let raw = match self.store.get(&full_key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(key = %full_key, error = %e, "cache get failed");
                self.counters.record_error();
                self.counters.record_miss();
                return None;
            }
        };

        let Some(bytes) = raw else {
            debug!(key = %full_key, "cache miss");
            self.counters.record_miss();
            return None;
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                debug!(key = %full_key, "cache hit");
                self.counters.record_hit();
                Some(value)
            }
            Err(e) => {
                error!(key = %full_key, error = %e, "failed to deserialize cached value");
                self.counters.record_error();
                self.counters.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes `key` from the store and the tracking set.
    ///
    /// Returns `true` unless the store failed, including when the key was
    /// not there.
    pub async fn delete(&self, key: &str) -> bool {
        if let Err(e) = validate_key(key) {
            warn!(error = %e, "rejected cache delete");
            return false;
        }

        let full_key = self.namespaced_key(key);
        // Before the round trip, so a `set` racing this delete stays tracked.
        self.tracked.write().await.untrack(&full_key);
        match self.store.delete(&full_key).await {
            Ok(existed) => {
                debug!(key = %full_key, existed, "cache delete");
                true
            }
            Err(e) => {
                error!(key = %full_key, error = %e, "cache delete failed");
                self.counters.record_error();
                // The value may still be live.
                self.tracked.write().await.track(&full_key);
                false
            }
        }
    }

    // == Clear ==
    /// Deletes every tracked key in parallel.
    ///
    /// The tracking set is emptied regardless of individual outcomes; a
    /// failed delete is logged and its key is forgotten.
    pub async fn clear(&self) {
        let keys = self.tracked.write().await.drain();
        if keys.is_empty() {
            return;
        }

        let results = join_all(keys.iter().map(|key| self.store.delete(key))).await;

        let mut failed = 0usize;
        for (key, result) in keys.iter().zip(&results) {
            if let Err(e) = result {
                error!(%key, error = %e, "failed to delete key during clear");
                self.counters.record_error();
                failed += 1;
            }
        }
        info!(cleared = keys.len() - failed, failed, "cache cleared");
    }

    // == Has ==
    /// `EXISTS` check; any failure reads as absent.
    pub async fn has(&self, key: &str) -> bool {
        if validate_key(key).is_err() {
            return false;
        }

        let full_key = self.namespaced_key(key);
        match self.store.exists(&full_key).await {
            Ok(found) => found,
            Err(e) => {
                error!(key = %full_key, error = %e, "cache existence check failed");
                self.counters.record_error();
                false
            }
        }
    }

    // == Multi Set ==
    /// Stores every pair concurrently.
    ///
    /// All keys are validated first; one bad key rejects the whole batch
    /// before anything is written. Returns how many entries were stored.
    pub async fn mset<K, T>(&self, entries: &[(K, T)], ttl_secs: Option<u64>) -> CacheResult<usize>
    where
        K: AsRef<str>,
        T: Serialize,
    {
        for (key, _) in entries {
            if let Err(e) = validate_key(key.as_ref()) {
                warn!(error = %e, "rejected cache mset");
                return Err(e);
            }
        }
        if ttl_secs == Some(0) {
            return Err(CacheError::InvalidInput(
                "TTL must be at least one second".to_string(),
            ));
        }

        let results = join_all(
            entries
                .iter()
                .map(|(key, value)| self.set(key.as_ref(), value, ttl_secs)),
        )
        .await;

        Ok(results.into_iter().filter(|r| matches!(r, Ok(true))).count())
    }

    // == Multi Get ==
    /// Looks every key up concurrently, keyed by the logical key.
    pub async fn mget<K, T>(&self, keys: &[K]) -> HashMap<String, Option<T>>
    where
        K: AsRef<str>,
        T: DeserializeOwned,
    {
        let values = join_all(keys.iter().map(|key| self.get::<T>(key.as_ref()))).await;

        keys.iter()
            .map(|key| key.as_ref().to_string())
            .zip(values)
            .collect()
    }

    // == Get Or Set ==
    /// Cache-aside lookup: a hit is returned as is; on a miss `compute`
    /// runs, and an `Ok` result is cached before being returned.
    pub async fn get_or_set<T, E, F, Fut>(
        &self,
        key: &str,
        ttl_secs: Option<u64>,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = compute().await?;
        // Failures are already logged by set()
        let _ = self.set(key, &value, ttl_secs).await;
        Ok(value)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let tracked = self.tracked.read().await.len();
        self.counters.snapshot(tracked)
    }

    /// Whether a logical key is in the tracking set.
    pub async fn is_tracked(&self, key: &str) -> bool {
        self.tracked
            .read()
            .await
            .contains(&self.namespaced_key(key))
    }
}
