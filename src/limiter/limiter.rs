//! Fixed-window rate limiter over the shared store.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};
use crate::limiter::{
    rate_limit_key, Admission, Decision, LimiterCounters, LimiterStats, RateLimitPolicy,
    Rejection,
};
use crate::store::StoreConnection;

// == Rate Limiter ==
/// Per (client, method, route) fixed-window counter.
///
/// The read of the current count and the increment are two round trips, so
/// concurrent requests can each observe `count < limit` and all pass: the
/// overshoot is bounded by the number of requests in flight at check time.
/// The increment and its expiry are one atomic transaction.
///
/// Store failures fail open.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: StoreConnection,
    counters: Arc<LimiterCounters>,
}

impl RateLimiter {
    pub fn new(store: StoreConnection) -> Self {
        Self {
            store,
            counters: Arc::new(LimiterCounters::default()),
        }
    }

    /// Decides whether a request may proceed.
    ///
    /// Never fails: a degraded store yields [`Decision::Allowed`].
    pub async fn admit(
        &self,
        identity: &str,
        method: &str,
        route: &str,
        policy: Option<&RateLimitPolicy>,
    ) -> Decision {
        self.evaluate(identity, method, route, policy).await.into()
    }

    /// Like [`admit`](Self::admit), but keeps fail-open passes distinguishable.
    pub async fn evaluate(
        &self,
        identity: &str,
        method: &str,
        route: &str,
        policy: Option<&RateLimitPolicy>,
    ) -> Admission {
        let Some(policy) = policy else {
            self.counters.record_allowed();
            return Admission::Allowed;
        };

        let key = rate_limit_key(identity, method, route);
        match self.check(&key, policy).await {
            Ok(None) => {
                debug!(%key, "request admitted");
                self.counters.record_allowed();
                Admission::Allowed
            }
            Ok(Some(rejection)) => {
                warn!(
                    %key,
                    current = rejection.current,
                    limit = rejection.limit,
                    retry_after = rejection.retry_after_secs,
                    "rate limit exceeded"
                );
                self.counters.record_rejected();
                Admission::Rejected(rejection)
            }
            Err(e) => {
                error!(%key, error = %e, "rate limit check failed, allowing request");
                self.counters.record_degraded();
                Admission::Degraded(e)
            }
        }
    }

    async fn check(&self, key: &str, policy: &RateLimitPolicy) -> StoreResult<Option<Rejection>> {
        let current = match self.store.get(key).await? {
            None => 0,
            Some(raw) => parse_count(key, &raw)?,
        };

        if current >= policy.limit {
            // Rounded up, so a client that waits it out finds the window gone.
            let retry_after = match self.store.pttl(key).await?.secs_until_expiry() {
                Some(secs) => secs,
                None => {
                    // A counter without a deadline would never reset.
                    self.store.expire(key, policy.window_secs()).await?;
                    policy.window_secs()
                }
            };
            return Ok(Some(Rejection::new(policy.limit, current, retry_after)));
        }

        self.store
            .incr_with_expiry(key, policy.window_secs())
            .await?;
        Ok(None)
    }

    /// Totals of decisions made so far.
    pub fn stats(&self) -> LimiterStats {
        self.counters.snapshot()
    }
}

fn parse_count(key: &str, raw: &[u8]) -> StoreResult<u64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(|n| n.max(0) as u64)
        .ok_or_else(|| StoreError::Malformed(format!("counter at '{}' is not an integer", key)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::test_support::{FailingStore, StalledStore};
    use crate::store::{KeyTtl, MemoryStore};
    use proptest::prelude::*;

    const CLIENT: &str = "203.0.113.7";

    fn limiter() -> (RateLimiter, StoreConnection) {
        let conn = StoreConnection::new(MemoryStore::new());
        (RateLimiter::new(conn.clone()), conn)
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_policy_always_allowed() {
        let (limiter, conn) = limiter();

        for _ in 0..1_000 {
            let decision = limiter.admit(CLIENT, "GET", "/health", None).await;
            assert_eq!(decision, Decision::Allowed);
        }

        // Nothing was counted
        let key = rate_limit_key(CLIENT, "GET", "/health");
        assert_eq!(conn.get(&key).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fourth_request_rejected() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::new(3, 60_000);

        for _ in 0..3 {
            let decision = limiter.admit(CLIENT, "POST", "/tasks", Some(&policy)).await;
            assert!(decision.is_allowed());
        }

        match limiter.admit(CLIENT, "POST", "/tasks", Some(&policy)).await {
            Decision::Rejected(rejection) => {
                assert_eq!(rejection.current, 3);
                assert_eq!(rejection.limit, 3);
                assert_eq!(rejection.retry_after_secs, 60);
                assert_eq!(rejection.remaining_requests(), 0);
            }
            Decision::Allowed => panic!("fourth request should be rejected"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_does_not_extend_window() {
        let (limiter, conn) = limiter();
        let policy = RateLimitPolicy::new(1, 10_000);
        let key = rate_limit_key(CLIENT, "GET", "/tasks");

        limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;
        tokio::time::advance(Duration::from_secs(4)).await;

        let decision = limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;
        assert!(!decision.is_allowed());
        assert_eq!(conn.ttl(&key).await.unwrap(), KeyTtl::Seconds(6));
        assert_eq!(conn.get(&key).await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_ttl() {
        let (limiter, conn) = limiter();
        let policy = RateLimitPolicy::new(3, 60_000);
        let key = rate_limit_key(CLIENT, "GET", "/tasks");

        for _ in 0..3 {
            limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;
        }
        let retry_after = match limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await {
            Decision::Rejected(rejection) => rejection.retry_after_secs,
            Decision::Allowed => panic!("expected rejection"),
        };

        tokio::time::advance(Duration::from_secs(retry_after)).await;

        let decision = limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;
        assert_eq!(decision, Decision::Allowed);
        assert_eq!(conn.get(&key).await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_rounds_up_partial_seconds() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::new(3, 60_000);

        for _ in 0..3 {
            limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;
        }
        tokio::time::advance(Duration::from_millis(600)).await;

        let retry_after = match limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await {
            Decision::Rejected(rejection) => rejection.retry_after_secs,
            Decision::Allowed => panic!("expected rejection"),
        };
        assert_eq!(retry_after, 60);

        // Just short of the reported wait the window is still closed...
        tokio::time::advance(Duration::from_millis(retry_after * 1000 - 1_000)).await;
        match limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await {
            Decision::Rejected(rejection) => assert_eq!(rejection.retry_after_secs, 1),
            Decision::Allowed => panic!("window closed early"),
        }

        // ...and once the reported wait has fully elapsed it is open.
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(
            limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await,
            Decision::Allowed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_identities_counted_independently() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::new(2, 60_000);

        for _ in 0..2 {
            limiter.admit("198.51.100.1", "GET", "/tasks", Some(&policy)).await;
        }
        let first = limiter.admit("198.51.100.1", "GET", "/tasks", Some(&policy)).await;
        let second = limiter.admit("198.51.100.2", "GET", "/tasks", Some(&policy)).await;

        assert!(!first.is_allowed());
        assert!(second.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_routes_counted_independently() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::new(1, 60_000);

        limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;

        assert!(!limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await.is_allowed());
        assert!(limiter.admit(CLIENT, "GET", "/users", Some(&policy)).await.is_allowed());
        assert!(limiter.admit(CLIENT, "DELETE", "/tasks", Some(&policy)).await.is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_without_ttl_is_healed() {
        let (limiter, conn) = limiter();
        let policy = RateLimitPolicy::new(1, 30_000);
        let key = rate_limit_key(CLIENT, "GET", "/tasks");

        // A counter that lost its expiry, e.g. written by a plain INCR
        conn.incr(&key).await.unwrap();

        match limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await {
            Decision::Rejected(rejection) => assert_eq!(rejection.retry_after_secs, 30),
            Decision::Allowed => panic!("expected rejection"),
        }
        assert_eq!(conn.ttl(&key).await.unwrap(), KeyTtl::Seconds(30));
    }

    #[tokio::test]
    async fn test_store_outage_fails_open() {
        let limiter = RateLimiter::new(StoreConnection::new(FailingStore));
        let policy = RateLimitPolicy::new(1, 60_000);

        for _ in 0..5 {
            let admission = limiter.evaluate(CLIENT, "GET", "/tasks", Some(&policy)).await;
            assert!(matches!(admission, Admission::Degraded(StoreError::Unavailable(_))));
        }
        assert_eq!(
            limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await,
            Decision::Allowed
        );

        let stats = limiter.stats();
        assert_eq!(stats.degraded, 6);
        assert_eq!(stats.rejected, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_fails_open() {
        let conn = StoreConnection::with_timeout(StalledStore, Duration::from_millis(100));
        let limiter = RateLimiter::new(conn);
        let policy = RateLimitPolicy::new(1, 60_000);

        let decision = limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;
        assert_eq!(decision, Decision::Allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_counter_fails_open() {
        let (limiter, conn) = limiter();
        let policy = RateLimitPolicy::new(1, 60_000);
        let key = rate_limit_key(CLIENT, "GET", "/tasks");

        conn.set(&key, b"not-a-number".to_vec(), 60_000).await.unwrap();

        let admission = limiter.evaluate(CLIENT, "GET", "/tasks", Some(&policy)).await;
        assert!(matches!(admission, Admission::Degraded(StoreError::Malformed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_track_outcomes() {
        let (limiter, _) = limiter();
        let policy = RateLimitPolicy::new(1, 60_000);

        limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;
        limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await;
        limiter.admit(CLIENT, "GET", "/health", None).await;

        let stats = limiter.stats();
        assert_eq!(stats.allowed, 2);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("k", b"7").unwrap(), 7);
        assert!(parse_count("k", b"seven").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_sequential_requests_never_exceed_limit(limit in 1u64..20, requests in 0usize..50) {
            let (limiter, _) = limiter();
            let policy = RateLimitPolicy::new(limit, 60_000);

            let allowed = tokio_test::block_on(async {
                let mut allowed = 0u64;
                for _ in 0..requests {
                    if limiter.admit(CLIENT, "GET", "/tasks", Some(&policy)).await.is_allowed() {
                        allowed += 1;
                    }
                }
                allowed
            });

            prop_assert_eq!(allowed, limit.min(requests as u64));
        }
    }
}
