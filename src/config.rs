//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::EvictionStrategy;
use crate::error::{CacheError, Result};

/// Default capacity: 10 MiB
pub const DEFAULT_CAPACITY_BYTES: u64 = 10 * 1024 * 1024;

/// Default TTL: one hour
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Default durable namespace
pub const DEFAULT_NAMESPACE: &str = "cache";

// == Cache Config ==
/// Construction parameters for a `CacheManager`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without one
    pub ttl_seconds: u64,
    /// Eviction strategy, fixed for the manager's lifetime
    pub strategy: EvictionStrategy,
    /// Hard cap on resident volatile size
    pub capacity_bytes: u64,
    /// Whether the durable tier is engaged at all
    pub persist: bool,
    /// Build or schema identifier compared by the version gate
    pub version_tag: String,
    /// Scope for every durable key this cache writes
    pub namespace: String,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_SECONDS` - Default TTL in seconds (default: 3600)
    /// - `CACHE_STRATEGY` - `lru`, `lfu` or `fifo` (default: lru)
    /// - `CACHE_CAPACITY_BYTES` - Capacity in bytes (default: 10 MiB)
    /// - `CACHE_PERSIST` - Enable the durable tier (default: true)
    /// - `CACHE_VERSION_TAG` - Version tag (default: crate version)
    /// - `CACHE_NAMESPACE` - Durable key namespace (default: cache)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl_seconds: env_parse("CACHE_TTL_SECONDS").unwrap_or(defaults.ttl_seconds),
            strategy: env_parse("CACHE_STRATEGY").unwrap_or(defaults.strategy),
            capacity_bytes: env_parse("CACHE_CAPACITY_BYTES").unwrap_or(defaults.capacity_bytes),
            persist: env_parse("CACHE_PERSIST").unwrap_or(defaults.persist),
            version_tag: env::var("CACHE_VERSION_TAG").unwrap_or(defaults.version_tag),
            namespace: env::var("CACHE_NAMESPACE").unwrap_or(defaults.namespace),
        }
    }

    // == Validate ==
    /// Rejects configurations the manager cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity_bytes == 0 {
            return Err(CacheError::InvalidRequest(
                "capacity_bytes must be greater than zero".to_string(),
            ));
        }
        if self.version_tag.is_empty() {
            return Err(CacheError::InvalidRequest(
                "version_tag cannot be empty".to_string(),
            ));
        }
        if self.namespace.is_empty() || self.namespace.contains(':') {
            return Err(CacheError::InvalidRequest(format!(
                "namespace '{}' must be non-empty and contain no ':'",
                self.namespace
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            strategy: EvictionStrategy::Lru,
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            persist: true,
            version_tag: env!("CARGO_PKG_VERSION").to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

// == Server Config ==
/// Configuration of the HTTP host binary.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache engine parameters
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
    /// Directory holding the durable tier
    pub data_dir: PathBuf,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - everything read by `CacheConfig::from_env`
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DATA_DIR` - Durable tier directory (default: ./cache-data)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheConfig::from_env(),
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            data_dir: env::var("CACHE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
            data_dir: PathBuf::from("./cache-data"),
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
