//! Rate Limiter Module
//!
//! Fixed-window, per (client, method, route) request quotas stored in the
//! shared key-value store.

mod decision;
mod key;
#[allow(clippy::module_inception)]
mod limiter;
mod policy;
mod stats;

pub use decision::{Admission, Decision, Rejection};
pub use key::{hash_identity, rate_limit_key, KEY_PREFIX};
pub use limiter::RateLimiter;
pub use policy::{PolicyTable, RateLimitPolicy};
pub use stats::{LimiterCounters, LimiterStats};
