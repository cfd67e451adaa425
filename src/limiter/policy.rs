//! Per-route rate-limit policies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// == Rate Limit Policy ==
/// At most `limit` requests per `window_ms` milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    /// Maximum admitted requests per window
    pub limit: u64,
    /// Window length in milliseconds
    pub window_ms: u64,
}

impl RateLimitPolicy {
    pub fn new(limit: u64, window_ms: u64) -> Self {
        Self { limit, window_ms }
    }

    /// Window length in whole seconds, as applied to the store key.
    ///
    /// Sub-second windows are clamped to one second; `EXPIRE 0` would
    /// delete the counter instead of bounding it.
    pub fn window_secs(&self) -> u64 {
        (self.window_ms / 1000).max(1)
    }
}

// == Policy Table ==
/// Policies keyed by HTTP method and route pattern.
///
/// Rate limiting is opt-in: a route missing from the table is unlimited.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    policies: HashMap<(String, String), RateLimitPolicy>,
}

impl PolicyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `policy` to `method route`, replacing any earlier one.
    pub fn with(mut self, method: &str, route: &str, policy: RateLimitPolicy) -> Self {
        self.insert(method, route, policy);
        self
    }

    pub fn insert(&mut self, method: &str, route: &str, policy: RateLimitPolicy) {
        self.policies
            .insert((method.to_ascii_uppercase(), route.to_string()), policy);
    }

    /// Policy for `method route`, if one is attached.
    pub fn resolve(&self, method: &str, route: &str) -> Option<&RateLimitPolicy> {
        self.policies
            .get(&(method.to_ascii_uppercase(), route.to_string()))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_secs_floors() {
        assert_eq!(RateLimitPolicy::new(3, 60_000).window_secs(), 60);
        assert_eq!(RateLimitPolicy::new(3, 1_999).window_secs(), 1);
    }

    #[test]
    fn test_sub_second_window_clamped() {
        assert_eq!(RateLimitPolicy::new(3, 250).window_secs(), 1);
    }

    #[test]
    fn test_policy_table_resolve() {
        let policy = RateLimitPolicy::new(5, 10_000);
        let table = PolicyTable::new().with("get", "/cache/:key", policy);

        assert_eq!(table.resolve("GET", "/cache/:key"), Some(&policy));
        assert_eq!(table.resolve("PUT", "/cache/:key"), None);
        assert_eq!(table.resolve("GET", "/health"), None);
        assert_eq!(table.len(), 1);
    }
}
