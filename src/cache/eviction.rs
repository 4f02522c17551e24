//! Eviction Policy Module
//!
//! Selects the next victim among resident entries for the configured
//! strategy. Pure function of entry metadata, independent of the manager.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::CacheEntry;
use crate::error::CacheError;

// == Eviction Strategy ==
/// Closed set of eviction strategies, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionStrategy {
    /// Least recently used
    #[default]
    Lru,
    /// Least frequently used
    Lfu,
    /// First in, first out
    Fifo,
}

impl fmt::Display for EvictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EvictionStrategy::Lru => "lru",
            EvictionStrategy::Lfu => "lfu",
            EvictionStrategy::Fifo => "fifo",
        };
        f.write_str(name)
    }
}

impl FromStr for EvictionStrategy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(EvictionStrategy::Lru),
            "lfu" => Ok(EvictionStrategy::Lfu),
            "fifo" => Ok(EvictionStrategy::Fifo),
            other => Err(CacheError::InvalidRequest(format!(
                "Unknown eviction strategy '{}'",
                other
            ))),
        }
    }
}

// == Select Victim ==
/// Returns the key of the entry to evict next, or None if `entries` is empty.
///
/// - LRU: oldest `last_accessed_at`, then oldest `created_at`
/// - LFU: smallest `access_count`, then oldest `last_accessed_at`
/// - FIFO: oldest `created_at`, then key order
///
/// Millisecond timestamps can tie, so each comparison is refined by the
/// manager's sequence numbers, and the key is the final tie-break.
pub fn select_victim<V>(
    entries: &HashMap<String, CacheEntry<V>>,
    strategy: EvictionStrategy,
) -> Option<String> {
    entries
        .iter()
        .min_by(|(ka, a), (kb, b)| compare(strategy, a, b).then_with(|| ka.cmp(kb)))
        .map(|(key, _)| key.clone())
}

fn compare<V>(strategy: EvictionStrategy, a: &CacheEntry<V>, b: &CacheEntry<V>) -> Ordering {
    let recency = |e: &CacheEntry<V>| (e.last_accessed_at, e.access_seq);
    let age = |e: &CacheEntry<V>| (e.created_at, e.insert_seq);

    match strategy {
        EvictionStrategy::Lru => recency(a)
            .cmp(&recency(b))
            .then_with(|| age(a).cmp(&age(b))),
        EvictionStrategy::Lfu => a
            .access_count
            .cmp(&b.access_count)
            .then_with(|| recency(a).cmp(&recency(b))),
        EvictionStrategy::Fifo => age(a).cmp(&age(b)),
    }
}
