//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL and access
//! metadata.

// == Cache Entry ==
/// Represents a single resident cache entry with value and metadata.
///
/// Only the access metadata changes after insertion. A `set` on an existing
/// key builds a new entry, so `size_bytes` and `expires_at` never move.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), always >= created_at
    pub expires_at: u64,
    /// Number of successful reads
    pub access_count: u64,
    /// Timestamp of the last successful read, or of insertion
    pub last_accessed_at: u64,
    /// Estimated size, fixed at insertion
    pub size_bytes: u64,
    /// Per-manager sequence number taken at insertion
    pub(crate) insert_seq: u64,
    /// Per-manager sequence number taken at the last access
    pub(crate) access_seq: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry at `now_ms` living for `ttl_ms`.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `now_ms` - Insertion time
    /// * `ttl_ms` - Time to live; 0 makes the entry expired on arrival
    /// * `size_bytes` - Estimated size of `value`
    pub fn new(value: V, now_ms: u64, ttl_ms: u64, size_bytes: u64) -> Self {
        Self::restore(value, now_ms, now_ms.saturating_add(ttl_ms), size_bytes, now_ms)
    }

    // == Restore ==
    /// Rebuilds an entry from a durable record, keeping its original
    /// `created_at` and `expires_at`.
    pub fn restore(value: V, created_at: u64, expires_at: u64, size_bytes: u64, now_ms: u64) -> Self {
        Self {
            value,
            created_at,
            expires_at: expires_at.max(created_at),
            access_count: 0,
            last_accessed_at: now_ms,
            size_bytes,
            insert_seq: 0,
            access_seq: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// Boundary condition: an entry is expired once `now_ms >= expires_at`.
    /// This is what makes a TTL of zero unreadable even within the same
    /// millisecond it was written.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }

    // == Touch ==
    /// Records a successful read.
    pub(crate) fn touch(&mut self, now_ms: u64, seq: u64) {
        self.access_count += 1;
        self.last_accessed_at = now_ms;
        self.access_seq = seq;
    }

    /// Stamps the manager's sequence number on a freshly inserted entry.
    pub(crate) fn with_seq(mut self, seq: u64) -> Self {
        self.insert_seq = seq;
        self.access_seq = seq;
        self
    }
}
