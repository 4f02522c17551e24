//! Tiercache - A tiered caching engine
//!
//! A volatile in-process tier with TTL expiration, LRU/LFU/FIFO eviction and
//! byte-size accounting, kept coherent with a durable tier that survives
//! restarts. A version gate wipes durable data when the cached value shape
//! changes between deployments.

pub mod api;
pub mod cache;
pub mod config;
pub mod durable;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::{CacheManager, CacheStats, EvictionStrategy};
pub use config::{CacheConfig, Config};
pub use durable::{DurableTier, FileDurableTier, MemoryDurableTier, NoopDurableTier};
pub use error::CacheError;
