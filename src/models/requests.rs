//! Request DTOs for the HTTP surface
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Request body for storing one value (PUT /cache/:key)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The value to store, any JSON
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Request body for storing many values (POST /cache/batch)
///
/// Entries are `[key, value]` pairs: `{"entries": [["a", 1], ["b", 2]]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchSetRequest {
    pub entries: Vec<(String, Value)>,
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Request body for looking up many keys (POST /cache/lookup)
#[derive(Debug, Clone, Deserialize)]
pub struct LookupRequest {
    pub keys: Vec<String>,
}
