//! Memory Store Module
//!
//! In-process key-value table with TTL expiration and Redis-compatible
//! counter semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::{KeyTtl, Store, StoreEntry};

// == Memory Table ==
/// Key-value storage with lazy TTL expiration.
///
/// Expired entries are treated as absent on every read and removed when
/// touched; `cleanup_expired` sweeps the rest.
#[derive(Debug, Default)]
pub struct MemoryTable {
    /// Key-value storage
    entries: HashMap<String, StoreEntry>,
}

impl MemoryTable {
    // == Constructor ==
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut StoreEntry> {
        if self.entries.get(key).is_some_and(StoreEntry::is_expired) {
            self.entries.remove(key);
        }
        self.entries.get_mut(key)
    }

    // == Get ==
    /// Retrieves a copy of the value stored under `key`.
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        self.live(key).map(|entry| entry.value.clone())
    }

    // == Set ==
    /// Stores `value` under `key`, overwriting any previous value and TTL.
    pub fn set(&mut self, key: String, value: Vec<u8>, ttl: Duration) {
        self.entries.insert(key, StoreEntry::new(value, Some(ttl)));
    }

    // == Delete ==
    /// Removes an entry; returns whether a live entry existed.
    pub fn delete(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => !entry.is_expired(),
            None => false,
        }
    }

    // == TTL ==
    /// Reports the remaining lifetime of `key`.
    pub fn ttl(&mut self, key: &str) -> KeyTtl {
        match self.live(key) {
            None => KeyTtl::Absent,
            Some(entry) => match entry.ttl_remaining_secs() {
                None => KeyTtl::NoExpiry,
                Some(secs) => KeyTtl::Seconds(secs),
            },
        }
    }

    /// Reports the remaining lifetime of `key` in milliseconds.
    pub fn pttl(&mut self, key: &str) -> KeyTtl {
        match self.live(key) {
            None => KeyTtl::Absent,
            Some(entry) => match entry.ttl_remaining_ms() {
                None => KeyTtl::NoExpiry,
                Some(ms) => KeyTtl::Millis(ms),
            },
        }
    }

    // == Exists ==
    pub fn exists(&mut self, key: &str) -> bool {
        self.live(key).is_some()
    }

    // == Increment ==
    /// Increments the integer stored at `key`, creating it at 1 with no
    /// expiry if absent. An existing expiry is preserved.
    pub fn incr(&mut self, key: &str) -> StoreResult<i64> {
        match self.live(key) {
            Some(entry) => {
                let current = std::str::from_utf8(&entry.value)
                    .ok()
                    .and_then(|s| s.parse::<i64>().ok())
                    .ok_or_else(|| {
                        StoreError::Malformed(format!("value at '{}' is not an integer", key))
                    })?;
                let next = current.checked_add(1).ok_or_else(|| {
                    StoreError::Malformed(format!("increment at '{}' would overflow", key))
                })?;
                entry.value = next.to_string().into_bytes();
                Ok(next)
            }
            None => {
                self.entries
                    .insert(key.to_string(), StoreEntry::new(b"1".to_vec(), None));
                Ok(1)
            }
        }
    }

    // == Expire ==
    /// Sets the expiry of an existing key. A zero expiry deletes the key.
    pub fn expire(&mut self, key: &str, seconds: u64) -> bool {
        if self.live(key).is_none() {
            return false;
        }
        if seconds == 0 {
            self.entries.remove(key);
        } else if let Some(entry) = self.entries.get_mut(key) {
            entry.expire_in(Duration::from_secs(seconds));
        }
        true
    }

    // == Expire If Unset ==
    /// `EXPIRE key seconds NX`: sets the expiry only if the key has none.
    pub fn expire_if_unset(&mut self, key: &str, seconds: u64) -> bool {
        match self.live(key) {
            Some(entry) if entry.expires_at.is_none() => {
                entry.expire_in(Duration::from_secs(seconds));
                true
            }
            _ => false,
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    // == Length ==
    /// Returns the number of entries held, including not-yet-swept expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Memory Store ==
/// Shared, async handle to a [`MemoryTable`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<RwLock<MemoryTable>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweeps expired entries; returns how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.table.write().await.cleanup_expired()
    }

    /// Number of entries currently held.
    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.table.write().await.get(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl_ms: u64) -> StoreResult<()> {
        if ttl_ms == 0 {
            return Err(StoreError::Malformed(
                "invalid expire time in 'set' command".to_string(),
            ));
        }
        self.table
            .write()
            .await
            .set(key.to_string(), value, Duration::from_millis(ttl_ms));
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.table.write().await.delete(key))
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        Ok(self.table.write().await.ttl(key))
    }

    async fn pttl(&self, key: &str) -> StoreResult<KeyTtl> {
        Ok(self.table.write().await.pttl(key))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.table.write().await.exists(key))
    }

    async fn incr(&self, key: &str) -> StoreResult<i64> {
        self.table.write().await.incr(key)
    }

    async fn expire(&self, key: &str, seconds: u64) -> StoreResult<bool> {
        Ok(self.table.write().await.expire(key, seconds))
    }

    async fn incr_with_expiry(&self, key: &str, seconds: u64) -> StoreResult<i64> {
        // One write guard spans both commands, so nothing interleaves.
        let mut table = self.table.write().await;
        let count = table.incr(key)?;
        table.expire_if_unset(key, seconds.max(1));
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
