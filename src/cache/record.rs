//! Durable Record Codec
//!
//! The blob written to the durable tier for each entry. Decoding failures
//! surface as errors so the manager can purge the record.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::cache::CacheEntry;

// == Durable Record ==
/// Decoded form of a durable blob.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct DurableRecord<V> {
    pub value: V,
    pub created_at: u64,
    pub expires_at: u64,
    pub size_bytes: u64,
}

/// Borrowed form used for encoding; must stay field-compatible with
/// `DurableRecord`.
#[derive(Serialize)]
struct RecordRef<'a, V> {
    value: &'a V,
    created_at: u64,
    expires_at: u64,
    size_bytes: u64,
}

/// Encodes the persisted fields of `entry`.
pub(crate) fn encode<V: Serialize>(entry: &CacheEntry<V>) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&RecordRef {
        value: &entry.value,
        created_at: entry.created_at,
        expires_at: entry.expires_at,
        size_bytes: entry.size_bytes,
    })
}

impl<V: DeserializeOwned> DurableRecord<V> {
    pub fn decode(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

impl<V> DurableRecord<V> {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }

    /// Rebuilds a resident entry, keeping the original timestamps.
    pub fn into_entry(self, now_ms: u64) -> CacheEntry<V> {
        CacheEntry::restore(self.value, self.created_at, self.expires_at, self.size_bytes, now_ms)
    }
}
