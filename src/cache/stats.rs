//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Stats Counters ==
/// Monotonic counters owned by the manager. Reset only by `clear`.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatsCounters {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub durable_errors: u64,
}

impl StatsCounters {
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_durable_error(&mut self) {
        self.durable_errors += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// == Cache Stats ==
/// Point-in-time snapshot of cache performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Number of entries evicted to make room
    pub evictions: u64,
    /// Sum of resident entries' estimated sizes
    pub total_size_bytes: u64,
    /// hits / (hits + misses), 0.0 when there were no reads
    pub hit_rate: f64,
    /// Current number of resident entries
    pub entry_count: usize,
    /// Durable tier failures absorbed by the cache
    pub durable_errors: u64,
}

impl CacheStats {
    // == Snapshot ==
    /// Builds a snapshot from the manager's counters.
    pub(crate) fn snapshot(counters: &StatsCounters, total_size_bytes: u64, entry_count: usize) -> Self {
        Self {
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            total_size_bytes,
            hit_rate: hit_rate(counters.hits, counters.misses),
            entry_count,
            durable_errors: counters.durable_errors,
        }
    }
}

// == Hit Rate ==
/// Calculates the cache hit rate.
///
/// Returns hits / (hits + misses), or 0.0 if no requests have been made.
pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
