//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check namespacing, tracking and bulk-operation behavior
//! over arbitrary keys.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::cache::{namespace_for, CacheService, MAX_KEY_LENGTH};
use crate::store::{MemoryStore, StoreConnection};

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,64}".prop_map(|s| s)
}

/// Generates environment names
fn environment_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,12}".prop_map(|s| s)
}

fn service(environment: &str) -> CacheService {
    CacheService::new(StoreConnection::new(MemoryStore::new()), environment)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // The store key is always `taskflow:<env>:<key>`.
    #[test]
    fn prop_namespaced_key_layout(env in environment_strategy(), key in valid_key_strategy()) {
        let cache = service(&env);
        let full = cache.namespaced_key(&key);

        prop_assert_eq!(full.clone(), format!("taskflow:{}:{}", env, key));
        prop_assert!(full.starts_with(&namespace_for(&env)));
        prop_assert!(key.len() <= MAX_KEY_LENGTH);
    }

    // Setting any sequence of keys tracks exactly the distinct keys, and
    // clear() leaves nothing behind.
    #[test]
    fn prop_tracking_matches_distinct_keys(keys in prop::collection::vec(valid_key_strategy(), 0..30)) {
        let cache = service("prop");
        let distinct: HashSet<&String> = keys.iter().collect();

        let (tracked_before, tracked_after, leftovers) = tokio_test::block_on(async {
            for (i, key) in keys.iter().enumerate() {
                cache.set(key, &i, None).await.unwrap();
            }
            let before = cache.stats().await.tracked_keys;

            cache.clear().await;

            let mut leftovers = 0;
            for key in &keys {
                if cache.has(key).await {
                    leftovers += 1;
                }
            }
            (before, cache.stats().await.tracked_keys, leftovers)
        });

        prop_assert_eq!(tracked_before, distinct.len());
        prop_assert_eq!(tracked_after, 0);
        prop_assert_eq!(leftovers, 0);
    }

    // mget answers every requested key, with a value exactly for those set.
    #[test]
    fn prop_mget_answers_every_key(
        stored in prop::collection::vec(valid_key_strategy(), 0..10),
        requested in prop::collection::vec(valid_key_strategy(), 0..10)
    ) {
        let cache = service("prop");
        let entries: Vec<(String, String)> =
            stored.iter().map(|k| (k.clone(), format!("value-{}", k))).collect();

        let found: HashMap<String, Option<String>> = tokio_test::block_on(async {
            cache.mset(entries.as_slice(), None).await.unwrap();
            cache.mget(requested.as_slice()).await
        });

        let requested_set: HashSet<&String> = requested.iter().collect();
        prop_assert_eq!(found.len(), requested_set.len());
        for key in &requested {
            let expected = stored.contains(key).then(|| format!("value-{}", key));
            prop_assert_eq!(&found[key], &expected);
        }
    }
}
