//! Cache key namespacing and validation.

use crate::error::{CacheError, CacheResult};

/// Application prefix of every cache key.
pub const APP_PREFIX: &str = "taskflow";

/// Maximum allowed logical key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// `taskflow:<environment>:`
pub fn namespace_for(environment: &str) -> String {
    format!("{}:{}:", APP_PREFIX, environment)
}

/// Rejects keys that cannot identify a cache entry.
pub fn validate_key(key: &str) -> CacheResult<()> {
    if key.trim().is_empty() {
        return Err(CacheError::InvalidInput(
            "Key must be a non-empty string".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidInput(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key.chars().any(char::is_control) {
        return Err(CacheError::InvalidInput(
            "Key must not contain control characters".to_string(),
        ));
    }
    Ok(())
}
