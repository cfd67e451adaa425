//! Configuration Module
//!
//! Handles loading and managing configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which store backend the process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// External Redis-compatible server at `store_host:store_port`
    Redis,
    /// In-process store, for local development
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(StoreBackend::Redis),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

/// Process configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store backend selection
    pub store_backend: StoreBackend,
    /// Store host name
    pub store_host: String,
    /// Store port
    pub store_port: u16,
    /// Upper bound on a single store round trip, in milliseconds
    pub store_timeout_ms: u64,
    /// Deployment environment, used in the cache namespace
    pub environment: String,
    /// Default cache TTL in seconds
    pub cache_default_ttl: u64,
    /// Default per-route request limit
    pub rate_limit_limit: u64,
    /// Default per-route window length in milliseconds
    pub rate_limit_window_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Memory-store cleanup frequency in seconds
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORE_BACKEND` - `redis` or `memory` (default: redis)
    /// - `STORE_HOST` - Store host (default: 127.0.0.1)
    /// - `STORE_PORT` - Store port (default: 6379)
    /// - `STORE_TIMEOUT_MS` - Per-operation timeout (default: 2000)
    /// - `APP_ENV` - Deployment environment (default: development)
    /// - `CACHE_DEFAULT_TTL` - Default cache TTL in seconds (default: 300)
    /// - `RATE_LIMIT_LIMIT` - Requests per window (default: 100)
    /// - `RATE_LIMIT_WINDOW_MS` - Window length (default: 60000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            store_backend: parse_env("STORE_BACKEND").unwrap_or(defaults.store_backend),
            store_host: env::var("STORE_HOST").unwrap_or(defaults.store_host),
            store_port: parse_env("STORE_PORT").unwrap_or(defaults.store_port),
            store_timeout_ms: parse_env("STORE_TIMEOUT_MS").unwrap_or(defaults.store_timeout_ms),
            environment: env::var("APP_ENV").unwrap_or(defaults.environment),
            cache_default_ttl: parse_env("CACHE_DEFAULT_TTL")
                .unwrap_or(defaults.cache_default_ttl),
            rate_limit_limit: parse_env("RATE_LIMIT_LIMIT").unwrap_or(defaults.rate_limit_limit),
            rate_limit_window_ms: parse_env("RATE_LIMIT_WINDOW_MS")
                .unwrap_or(defaults.rate_limit_window_ms),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_env("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Store operation timeout as a Duration.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::Redis,
            store_host: "127.0.0.1".to_string(),
            store_port: 6379,
            store_timeout_ms: 2000,
            environment: "development".to_string(),
            cache_default_ttl: 300,
            rate_limit_limit: 100,
            rate_limit_window_ms: 60_000,
            server_port: 3000,
            cleanup_interval: 1,
        }
    }
}
