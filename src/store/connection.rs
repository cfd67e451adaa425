//! Store Connection Module
//!
//! The one shared handle every component receives by injection.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::error::{StoreError, StoreResult};
use crate::store::{KeyTtl, Store};

/// Default upper bound on a single store round trip.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

// == Store Connection ==
/// Cloneable handle to the process-wide store.
///
/// Each operation is bounded by a timeout; an expired timeout surfaces as
/// [`StoreError::Unavailable`]. Failures are logged here, where they happen,
/// and then returned for the caller to apply its own policy.
#[derive(Clone)]
pub struct StoreConnection {
    inner: Arc<dyn Store>,
    timeout: Duration,
}

impl std::fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConnection")
            .field("backend", &self.inner.backend_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl StoreConnection {
    /// Wraps a backend with the default operation timeout.
    pub fn new<S: Store + 'static>(store: S) -> Self {
        Self::with_timeout(store, DEFAULT_OP_TIMEOUT)
    }

    /// Wraps a backend with an explicit operation timeout.
    pub fn with_timeout<S: Store + 'static>(store: S, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(store),
            timeout,
        }
    }

    /// Name of the backend behind this handle.
    pub fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn run<T, F>(&self, op: &'static str, key: &str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "{} timed out after {:?}",
                op, self.timeout
            ))),
        };

        if let Err(ref e) = result {
            error!(
                op,
                key,
                backend = self.inner.backend_name(),
                error = %e,
                "store operation failed"
            );
        }
        result
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.run("GET", key, self.inner.get(key)).await
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl_ms: u64) -> StoreResult<()> {
        self.run("SET", key, self.inner.set(key, value, ttl_ms)).await
    }

    pub async fn delete(&self, key: &str) -> StoreResult<bool> {
        self.run("DEL", key, self.inner.delete(key)).await
    }

    pub async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        self.run("TTL", key, self.inner.ttl(key)).await
    }

    pub async fn pttl(&self, key: &str) -> StoreResult<KeyTtl> {
        self.run("PTTL", key, self.inner.pttl(key)).await
    }

    pub async fn exists(&self, key: &str) -> StoreResult<bool> {
        self.run("EXISTS", key, self.inner.exists(key)).await
    }

    pub async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.run("INCR", key, self.inner.incr(key)).await
    }

    pub async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        self.run("EXPIRE", key, self.inner.expire(key, seconds)).await
    }

    /// Atomic `INCR` + `EXPIRE NX` transaction.
    pub async fn incr_with_expiry(&self, key: &str, seconds: u64) -> StoreResult<i64> {
        self.run("MULTI", key, self.inner.incr_with_expiry(key, seconds))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{FailingStore, StalledStore};
    use crate::store::{MemoryStore, RedisStore};

    #[tokio::test(start_paused = true)]
    async fn test_passes_through_to_backend() {
        let conn = StoreConnection::new(MemoryStore::new());

        conn.set("k", b"v".to_vec(), 1_000).await.unwrap();

        assert_eq!(conn.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(conn.ttl("k").await.unwrap(), KeyTtl::Seconds(1));
        assert_eq!(conn.pttl("k").await.unwrap(), KeyTtl::Millis(1_000));
        assert!(conn.exists("k").await.unwrap());
        assert!(conn.delete("k").await.unwrap());
        assert_eq!(conn.backend_name(), "memory");
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_unavailable() {
        let conn = StoreConnection::with_timeout(StalledStore, Duration::from_millis(50));

        let result = conn.incr("k").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_backend_errors_are_returned() {
        let conn = StoreConnection::new(FailingStore);

        assert!(matches!(
            conn.get("k").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_unavailable() {
        let store = RedisStore::new("127.0.0.1", 1).unwrap();
        let conn = StoreConnection::with_timeout(store, Duration::from_millis(200));

        assert!(matches!(
            conn.get("k").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
