//! Cache Module
//!
//! Provides a tiered cache with TTL expiration, LRU/LFU/FIFO eviction,
//! byte-size accounting, and a version-gated durable tier.

mod clock;
mod entry;
mod eviction;
mod manager;
mod record;
mod size;
mod stats;
mod version;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use eviction::{select_victim, EvictionStrategy};
pub use manager::CacheManager;
pub use size::{JsonSizeEstimator, SizeEstimator};
pub use stats::{hit_rate, CacheStats};
pub use version::{VersionCheck, VersionGate};
