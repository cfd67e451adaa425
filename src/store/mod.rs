//! Store Module
//!
//! The single shared handle to the external key-value store, and the
//! backends that can sit behind it.
//!
//! - **Redis**: the production backend, speaking the Redis protocol
//! - **Memory**: an in-process backend with the same semantics, for local
//!   development and tests

mod connection;
mod entry;
mod memory;
mod remote;

pub use connection::StoreConnection;
pub use entry::StoreEntry;
pub use memory::{MemoryStore, MemoryTable};
pub use remote::RedisStore;

use async_trait::async_trait;

use crate::error::StoreResult;

/// Remaining lifetime of a key, as reported by `TTL` or `PTTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// The key does not exist (`-2`)
    Absent,
    /// The key exists without an expiry (`-1`)
    NoExpiry,
    /// Seconds until the key expires, rounded to nearest (`TTL`)
    Seconds(u64),
    /// Milliseconds until the key expires (`PTTL`)
    Millis(u64),
}

impl KeyTtl {
    /// Maps a raw `TTL` reply onto the enum.
    pub fn from_reply(reply: i64) -> Self {
        Self::from_raw(reply).unwrap_or_else(KeyTtl::Seconds)
    }

    /// Maps a raw `PTTL` reply onto the enum.
    pub fn from_pttl_reply(reply: i64) -> Self {
        Self::from_raw(reply).unwrap_or_else(KeyTtl::Millis)
    }

    fn from_raw(reply: i64) -> Result<Self, u64> {
        match reply {
            -1 => Ok(KeyTtl::NoExpiry),
            r if r < 0 => Ok(KeyTtl::Absent),
            r => Err(r as u64),
        }
    }

    /// Whole seconds a caller must wait for the key to be gone, rounded up.
    ///
    /// `None` when the key has no expiry.
    pub fn secs_until_expiry(&self) -> Option<u64> {
        match *self {
            KeyTtl::Absent => Some(0),
            KeyTtl::NoExpiry => None,
            KeyTtl::Seconds(secs) => Some(secs),
            KeyTtl::Millis(ms) => Some(ms.div_ceil(1000)),
        }
    }
}

/// Atomic primitives offered by a key-value store backend.
///
/// Every method is a network round trip on a real backend.
#[async_trait]
pub trait Store: Send + Sync {
    /// `GET key`
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// `SET key value PX ttl_ms`
    async fn set(&self, key: &str, value: Vec<u8>, ttl_ms: u64) -> StoreResult<()>;

    /// `DEL key`; returns whether the key existed
    async fn delete(&self, key: &str) -> StoreResult<bool>;

    /// `TTL key`
    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// `PTTL key`
    async fn pttl(&self, key: &str) -> StoreResult<KeyTtl>;

    /// `EXISTS key`
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// `INCR key`; an absent key is created at 1 with no expiry
    async fn incr(&self, key: &str) -> StoreResult<i64>;

    /// `EXPIRE key seconds`; returns false if the key does not exist
    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool>;

    /// `MULTI / INCR key / EXPIRE key seconds NX / EXEC`, returning the new
    /// count. The expiry only lands on a key that has none, so the window a
    /// counter was created with is never extended.
    async fn incr_with_expiry(&self, key: &str, seconds: u64) -> StoreResult<i64>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}
