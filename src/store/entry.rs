//! Store Entry Module
//!
//! Defines the structure for individual in-memory store entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Store Entry ==
/// Represents a single stored value with its expiry deadline.
#[derive(Debug, Clone)]
pub struct StoreEntry {
    /// The stored bytes
    pub value: Vec<u8>,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
}

impl StoreEntry {
    // == Constructor ==
    /// Creates a new entry that expires after `ttl`, or never if `ttl` is None.
    pub fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal
    /// to its deadline.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    // == Expire ==
    /// Replaces the deadline with `now + ttl`.
    pub fn expire_in(&mut self, ttl: Duration) {
        self.expires_at = Some(Instant::now() + ttl);
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(0)` if the deadline has passed
    /// - `Some(remaining_ms)` if the entry has a deadline in the future
    /// - `None` if the entry never expires
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|deadline| {
            deadline
                .saturating_duration_since(Instant::now())
                .as_millis() as u64
        })
    }

    /// Returns remaining TTL in whole seconds, rounded to nearest the way
    /// Redis answers `TTL`.
    pub fn ttl_remaining_secs(&self) -> Option<u64> {
        self.ttl_remaining_ms().map(|ms| (ms + 500) / 1000)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_creation_no_ttl() {
        let entry = StoreEntry::new(b"test_value".to_vec(), None);

        assert_eq!(entry.value, b"test_value");
        assert!(entry.expires_at.is_none());
        assert!(!entry.is_expired());
        assert!(entry.ttl_remaining_ms().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = StoreEntry::new(b"v".to_vec(), Some(Duration::from_secs(1)));
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1000)).await;

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining_ms(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_remaining_seconds_rounds() {
        let entry = StoreEntry::new(b"v".to_vec(), Some(Duration::from_secs(10)));
        assert_eq!(entry.ttl_remaining_secs(), Some(10));

        tokio::time::advance(Duration::from_millis(8_400)).await;
        assert_eq!(entry.ttl_remaining_secs(), Some(2));

        tokio::time::advance(Duration::from_millis(200)).await;
        assert_eq!(entry.ttl_remaining_secs(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_in_sets_deadline() {
        let mut entry = StoreEntry::new(b"1".to_vec(), None);
        entry.expire_in(Duration::from_secs(5));

        assert_eq!(entry.ttl_remaining_ms(), Some(5_000));
    }
}
