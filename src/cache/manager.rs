//! Cache Manager Module
//!
//! Main cache engine: a volatile HashMap tier with byte-size accounting and
//! strategy-driven eviction, backed by a best-effort durable tier.
//!
//! Access must be serialized by the caller. The manager has no internal
//! locking, no background tasks, and every operation completes before
//! returning.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::cache::record::{self, DurableRecord};
use crate::cache::{
    select_victim, CacheEntry, CacheStats, Clock, EvictionStrategy, JsonSizeEstimator,
    SizeEstimator, SystemClock, VersionCheck, VersionGate,
};
use crate::cache::stats::StatsCounters;
use crate::config::CacheConfig;
use crate::durable::DurableTier;
use crate::error::{CacheError, Result};

// == Cache Manager ==
/// Tiered cache over values of type `V`.
pub struct CacheManager<V> {
    /// Volatile tier
    entries: HashMap<String, CacheEntry<V>>,
    /// Running sum of resident `size_bytes`
    total_size_bytes: u64,
    capacity_bytes: u64,
    default_ttl_ms: u64,
    strategy: EvictionStrategy,
    stats: StatsCounters,
    /// None when persistence is off or the version gate could not be passed
    durable: Option<Box<dyn DurableTier>>,
    gate: VersionGate,
    record_prefix: String,
    estimator: Box<dyn SizeEstimator<V>>,
    clock: Arc<dyn Clock>,
    /// Logical clock ordering inserts and reads within one millisecond
    seq: u64,
}

impl<V> CacheManager<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    // == Open ==
    /// Builds a manager sizing values by their JSON encoding, on wall-clock time.
    ///
    /// Runs the version gate against `durable` before returning. A gate
    /// failure does not fail `open`; the durable tier is disabled instead.
    pub fn open(config: CacheConfig, durable: Box<dyn DurableTier>) -> Result<Self> {
        Self::open_with(
            config,
            durable,
            Box::new(JsonSizeEstimator),
            Arc::new(SystemClock),
        )
    }

    /// Builds a manager with an explicit size estimator and clock.
    pub fn open_with(
        config: CacheConfig,
        durable: Box<dyn DurableTier>,
        estimator: Box<dyn SizeEstimator<V>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let mut stats = StatsCounters::default();
        let mut gate = VersionGate::new(&config.namespace, &config.version_tag);
        let durable = if config.persist {
            match gate.check(&*durable) {
                Ok(outcome) => {
                    debug!("Version gate passed: {:?}", outcome);
                    Some(durable)
                }
                Err(e) => {
                    warn!("{}; durable tier disabled for this process", e);
                    stats.record_durable_error();
                    None
                }
            }
        } else {
            gate.skip();
            None
        };

        info!(
            "Cache opened: capacity={}B, strategy={}, default_ttl={}s, durable={}",
            config.capacity_bytes,
            config.strategy,
            config.ttl_seconds,
            durable.is_some()
        );

        Ok(Self {
            entries: HashMap::new(),
            total_size_bytes: 0,
            capacity_bytes: config.capacity_bytes,
            default_ttl_ms: config.ttl_seconds.saturating_mul(1000),
            strategy: config.strategy,
            stats,
            durable,
            record_prefix: gate.record_prefix(),
            gate,
            estimator,
            clock,
            seq: 0,
        })
    }

    // == Set ==
    /// Stores a value under `key`, replacing any previous entry.
    ///
    /// Evicts by the configured strategy until the value fits, after first
    /// sweeping expired entries. Durable write failures are logged and
    /// counted; they never fail the call.
    ///
    /// A TTL of zero writes the durable record but leaves nothing readable
    /// in the volatile tier.
    ///
    /// # Errors
    /// - `InvalidRequest` for an empty key
    /// - `CapacityExceeded` if the value alone is larger than the capacity;
    ///   nothing is stored and any previous entry is kept
    pub fn set(&mut self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> Result<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
        }

        let size_bytes = self.estimator.estimate(&value);
        if size_bytes > self.capacity_bytes {
            return Err(CacheError::CapacityExceeded {
                key,
                size_bytes,
                capacity_bytes: self.capacity_bytes,
            });
        }

        let ttl_ms = ttl.map_or(self.default_ttl_ms, |d| {
            u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
        });
        let now = self.clock.now_ms();

        self.remove_resident(&key);

        let seq = self.next_seq();
        let entry = CacheEntry::new(value, now, ttl_ms, size_bytes).with_seq(seq);
        self.persist(&key, &entry);

        if ttl_ms == 0 {
            debug!("'{}' set with zero TTL, not kept in memory", key);
            return Ok(());
        }

        self.make_room(size_bytes, now);
        self.insert_resident(key, entry);
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Falls back to the durable tier on a volatile miss and re-hydrates the
    /// volatile tier with the record's original timestamps. Expired entries
    /// found in either tier are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now_ms();

        let expired = match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => {
                self.seq += 1;
                entry.touch(now, self.seq);
                self.stats.record_hit();
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("'{}' expired, removing", key);
            self.remove_resident(key);
            self.remove_durable(key);
            self.stats.record_miss();
            return None;
        }

        match self.load_durable(key, now) {
            Some(entry) => {
                let value = entry.value.clone();
                self.rehydrate(key, entry, now);
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Remove ==
    /// Removes a key from both tiers. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: &str) {
        self.remove_resident(key);
        self.remove_durable(key);
    }

    // == Clear ==
    /// Empties the volatile tier, resets statistics, and removes every
    /// durable record under this cache's namespace and version.
    ///
    /// Durable data outside that prefix is never touched.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_size_bytes = 0;
        self.stats.reset();

        let Some(durable) = self.durable.as_ref() else {
            return;
        };

        let mut failures = Vec::new();
        match durable.durable_scan_prefix(&self.record_prefix) {
            Ok(keys) => {
                for key in keys {
                    if let Err(e) = durable.durable_remove(&key) {
                        failures.push(CacheError::DurablePersistFailed {
                            key,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            Err(e) => failures.push(CacheError::DurableReadFailed {
                key: self.record_prefix.clone(),
                reason: e.to_string(),
            }),
        }

        for failure in failures {
            self.absorb(failure);
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats::snapshot(&self.stats, self.total_size_bytes, self.entries.len())
    }

    // == Purge Expired ==
    /// Removes all expired entries from both tiers.
    ///
    /// Returns the number of volatile entries removed. Expired removals are
    /// not counted as evictions.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.purge_expired_at(now)
    }

    // == Accessors ==
    /// Checks for a live resident entry without touching access metadata or stats.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Returns the current number of resident entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    pub fn strategy(&self) -> EvictionStrategy {
        self.strategy
    }

    #[cfg(test)]
    pub(crate) fn resident_entries(&self) -> &HashMap<String, CacheEntry<V>> {
        &self.entries
    }

    /// Whether the durable tier is engaged for this process.
    pub fn durable_enabled(&self) -> bool {
        self.durable.is_some()
    }

    /// Outcome of the version gate run by `open`.
    ///
    /// None means the gate failed and the durable tier is disabled.
    pub fn version_check(&self) -> Option<&VersionCheck> {
        self.gate.outcome()
    }

    // == Internals ==
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn durable_key(&self, key: &str) -> String {
        format!("{}{}", self.record_prefix, key)
    }

    fn insert_resident(&mut self, key: String, entry: CacheEntry<V>) {
        self.total_size_bytes += entry.size_bytes;
        if let Some(old) = self.entries.insert(key, entry) {
            self.total_size_bytes -= old.size_bytes;
        }
    }

    fn remove_resident(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.total_size_bytes -= entry.size_bytes;
        Some(entry)
    }

    fn make_room(&mut self, incoming: u64, now: u64) {
        if self.total_size_bytes + incoming <= self.capacity_bytes {
            return;
        }

        let purged = self.purge_expired_at(now);
        if purged > 0 {
            debug!("Swept {} expired entries to make room", purged);
        }

        while self.total_size_bytes + incoming > self.capacity_bytes {
            let Some(victim) = select_victim(&self.entries, self.strategy) else {
                break;
            };
            if let Some(entry) = self.remove_resident(&victim) {
                debug!(
                    "Evicted '{}' ({} bytes) by {}",
                    victim, entry.size_bytes, self.strategy
                );
            }
            self.remove_durable(&victim);
            self.stats.record_eviction();
        }
    }

    fn purge_expired_at(&mut self, now: u64) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_resident(key);
            self.remove_durable(key);
        }

        expired_keys.len()
    }

    fn rehydrate(&mut self, key: &str, entry: CacheEntry<V>, now: u64) {
        if entry.size_bytes > self.capacity_bytes {
            debug!(
                "'{}' ({} bytes) no longer fits the cache, serving from durable tier only",
                key, entry.size_bytes
            );
            return;
        }

        self.make_room(entry.size_bytes, now);
        let seq = self.next_seq();
        let mut entry = entry.with_seq(seq);
        entry.touch(now, seq);
        self.insert_resident(key.to_string(), entry);
    }

    fn persist(&mut self, key: &str, entry: &CacheEntry<V>) {
        if self.durable.is_none() {
            return;
        }

        let durable_key = self.durable_key(key);
        let result = match record::encode(entry) {
            Ok(blob) => match self.durable.as_ref() {
                Some(durable) => durable
                    .durable_set(&durable_key, &blob)
                    .map_err(|e| e.to_string()),
                None => Ok(()),
            },
            Err(e) => Err(e.to_string()),
        };

        if let Err(reason) = result {
            self.absorb(CacheError::DurablePersistFailed { key: durable_key, reason });
            // A surviving older record would outlive this write on restart
            self.remove_durable(key);
        }
    }

    fn load_durable(&mut self, key: &str, now: u64) -> Option<CacheEntry<V>> {
        let durable_key = self.durable_key(key);
        let read = self.durable.as_ref()?.durable_get(&durable_key);

        let bytes = match read {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                self.absorb(CacheError::DurableReadFailed {
                    key: durable_key,
                    reason: e.to_string(),
                });
                self.remove_durable(key);
                return None;
            }
        };

        match DurableRecord::<V>::decode(&bytes) {
            Ok(record) if record.is_expired(now) => {
                debug!("Durable record for '{}' expired, purging", key);
                self.remove_durable(key);
                None
            }
            Ok(record) => Some(record.into_entry(now)),
            Err(e) => {
                self.absorb(CacheError::CorruptDurableRecord {
                    key: durable_key,
                    reason: e.to_string(),
                });
                self.remove_durable(key);
                None
            }
        }
    }

    fn remove_durable(&mut self, key: &str) {
        let durable_key = self.durable_key(key);
        let Some(durable) = self.durable.as_ref() else {
            return;
        };
        if let Err(e) = durable.durable_remove(&durable_key) {
            self.absorb(CacheError::DurablePersistFailed {
                key: durable_key,
                reason: e.to_string(),
            });
        }
    }

    /// Logs and counts a durable failure the caller never sees.
    fn absorb(&mut self, error: CacheError) {
        warn!("{}", error);
        self.stats.record_durable_error();
    }
}

impl<V> fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheManager")
            .field("entries", &self.entries.len())
            .field("total_size_bytes", &self.total_size_bytes)
            .field("capacity_bytes", &self.capacity_bytes)
            .field("strategy", &self.strategy)
            .field("durable", &self.durable.is_some())
            .field("gate", &self.gate)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::durable::{MemoryDurableTier, NoopDurableTier};

    const START_MS: u64 = 1_700_000_000_000;

    fn config(capacity_bytes: u64, strategy: EvictionStrategy) -> CacheConfig {
        CacheConfig {
            capacity_bytes,
            strategy,
            version_tag: "v1".to_string(),
            ..CacheConfig::default()
        }
    }

    /// Every value weighs 100 bytes.
    fn manager(
        capacity_bytes: u64,
        strategy: EvictionStrategy,
        tier: &MemoryDurableTier,
        clock: &ManualClock,
    ) -> CacheManager<String> {
        CacheManager::open_with(
            config(capacity_bytes, strategy),
            Box::new(tier.clone()),
            Box::new(|_: &String| 100u64),
            Arc::new(clock.clone()),
        )
        .unwrap()
    }

    fn resident_sum(cache: &CacheManager<String>) -> u64 {
        cache.entries.values().map(|e| e.size_bytes).sum()
    }

    /// Durable medium that rejects writes but still accepts removals.
    struct RejectingSets(MemoryDurableTier);

    impl DurableTier for RejectingSets {
        fn durable_get(&self, key: &str) -> crate::error::DurableResult<Option<Vec<u8>>> {
            self.0.durable_get(key)
        }

        fn durable_set(&self, _key: &str, _blob: &[u8]) -> crate::error::DurableResult<()> {
            Err(crate::error::DurableError::Unavailable("disk full".to_string()))
        }

        fn durable_remove(&self, key: &str) -> crate::error::DurableResult<()> {
            self.0.durable_remove(key)
        }

        fn durable_scan_prefix(&self, prefix: &str) -> crate::error::DurableResult<Vec<String>> {
            self.0.durable_scan_prefix(prefix)
        }
    }

    #[test]
    fn test_set_and_get() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        cache.set("key1", "value1".to_string(), None).unwrap();
        assert_eq!(cache.get("key1"), Some("value1".to_string()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_size_bytes(), 100);
        assert!(tier.contains_key("cache:v1:key1"));
    }

    #[test]
    fn test_get_nonexistent_is_miss() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        assert_eq!(cache.get("nonexistent"), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_empty_key_rejected() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        let result = cache.set("", "v".to_string(), None);
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_overwrite_replaces_size() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = CacheManager::open_with(
            config(1_000, EvictionStrategy::Lru),
            Box::new(tier.clone()),
            Box::new(|v: &String| v.len() as u64),
            Arc::new(clock.clone()),
        )
        .unwrap();

        cache.set("k", "x".repeat(300), None).unwrap();
        cache.set("k", "x".repeat(120), None).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.total_size_bytes(), 120);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_capacity_exceeded_stores_nothing() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = CacheManager::open_with(
            config(50, EvictionStrategy::Lru),
            Box::new(tier.clone()),
            Box::new(|v: &String| v.len() as u64),
            Arc::new(clock.clone()),
        )
        .unwrap();

        cache.set("small", "x".repeat(10), None).unwrap();
        let result = cache.set("big", "x".repeat(51), None);

        assert!(matches!(
            result,
            Err(CacheError::CapacityExceeded { size_bytes: 51, capacity_bytes: 50, .. })
        ));
        assert!(!tier.contains_key("cache:v1:big"));
        assert!(cache.contains_key("small"));
        assert_eq!(cache.total_size_bytes(), 10);
    }

    #[test]
    fn test_ttl_expiration_with_clock() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        cache.set("k", "v".to_string(), Some(Duration::from_secs(5))).unwrap();
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.get("k"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_size_bytes, 0);
        assert!(!tier.contains_key("cache:v1:k"));
    }

    #[test]
    fn test_default_ttl_applies() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        cache.set("k", "v".to_string(), None).unwrap();
        clock.advance(Duration::from_secs(3599));
        assert!(cache.contains_key("k"));
        clock.advance(Duration::from_secs(1));
        assert!(!cache.contains_key("k"));
    }

    #[test]
    fn test_zero_ttl_is_written_but_never_read() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        cache.set("k", "old".to_string(), None).unwrap();
        cache.set("k", "gone".to_string(), Some(Duration::ZERO)).unwrap();

        assert!(tier.contains_key("cache:v1:k"));
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().misses, 1);
        // The expired durable record was purged by the read
        assert!(!tier.contains_key("cache:v1:k"));
    }

    #[test]
    fn test_concrete_lru_scenario() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(300, EvictionStrategy::Lru, &tier, &clock);

        for key in ["a", "b", "c"] {
            cache.set(key, key.to_string(), None).unwrap();
        }
        assert_eq!(cache.total_size_bytes(), 300);
        assert_eq!(cache.stats().evictions, 0);

        cache.set("d", "d".to_string(), None).unwrap();

        assert!(!cache.contains_key("a"));
        assert!(!tier.contains_key("cache:v1:a"));
        assert_eq!(cache.total_size_bytes(), 300);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_lru_get_refreshes_recency() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(300, EvictionStrategy::Lru, &tier, &clock);

        for key in ["a", "b", "c"] {
            cache.set(key, key.to_string(), None).unwrap();
        }
        cache.get("a");
        cache.set("d", "d".to_string(), None).unwrap();

        assert!(cache.contains_key("a"));
        assert!(!cache.contains_key("b"));
        assert!(cache.contains_key("c"));
    }

    #[test]
    fn test_fifo_ignores_reads() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(300, EvictionStrategy::Fifo, &tier, &clock);

        for key in ["a", "b", "c"] {
            cache.set(key, key.to_string(), None).unwrap();
        }
        cache.get("a");
        cache.get("a");
        cache.set("d", "d".to_string(), None).unwrap();

        assert!(!cache.contains_key("a"));
        assert!(cache.contains_key("b"));
    }

    #[test]
    fn test_lfu_evicts_least_read() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(300, EvictionStrategy::Lfu, &tier, &clock);

        for key in ["a", "b", "c"] {
            cache.set(key, key.to_string(), None).unwrap();
        }
        cache.get("a");
        cache.get("c");
        cache.get("c");
        cache.set("d", "d".to_string(), None).unwrap();

        assert!(!cache.contains_key("b"));
        assert!(cache.contains_key("a"));
        assert!(cache.contains_key("c"));
    }

    #[test]
    fn test_expired_entries_swept_before_eviction() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(300, EvictionStrategy::Lru, &tier, &clock);

        cache.set("short", "s".to_string(), Some(Duration::from_secs(1))).unwrap();
        cache.set("b", "b".to_string(), None).unwrap();
        cache.set("c", "c".to_string(), None).unwrap();
        clock.advance(Duration::from_secs(2));

        cache.set("d", "d".to_string(), None).unwrap();

        assert_eq!(cache.stats().evictions, 0);
        assert!(cache.contains_key("b"));
        assert!(cache.contains_key("c"));
        assert!(cache.contains_key("d"));
        assert_eq!(resident_sum(&cache), cache.total_size_bytes());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        cache.set("k", "v".to_string(), None).unwrap();
        cache.remove("k");
        cache.remove("k");
        cache.remove("never-there");

        assert!(cache.is_empty());
        assert_eq!(cache.total_size_bytes(), 0);
        assert!(!tier.contains_key("cache:v1:k"));
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_clear_scopes_durable_purge() {
        let tier = MemoryDurableTier::new();
        tier.insert_raw("session:token", b"abc");
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        cache.set("a", "a".to_string(), None).unwrap();
        cache.set("b", "b".to_string(), None).unwrap();
        cache.get("a");
        cache.get("zzz");

        cache.clear();

        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.is_empty());
        assert_eq!(
            tier.keys(),
            vec!["cache:__version__".to_string(), "session:token".to_string()]
        );
    }

    #[test]
    fn test_durable_write_failure_is_absorbed() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        tier.fail_writes(true);
        cache.set("k", "v".to_string(), None).unwrap();

        assert_eq!(cache.get("k"), Some("v".to_string()));
        // The write and the follow-up removal both failed
        assert_eq!(cache.stats().durable_errors, 2);
        assert!(!tier.contains_key("cache:v1:k"));
    }

    #[test]
    fn test_failed_overwrite_drops_stale_durable_record() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        {
            let mut first = manager(1_000, EvictionStrategy::Lru, &tier, &clock);
            first.set("k", "old".to_string(), None).unwrap();
        }
        assert!(tier.contains_key("cache:v1:k"));

        let mut second: CacheManager<String> = CacheManager::open_with(
            config(1_000, EvictionStrategy::Lru),
            Box::new(RejectingSets(tier.clone())),
            Box::new(|_: &String| 100u64),
            Arc::new(clock.clone()),
        )
        .unwrap();
        second.set("k", "new".to_string(), None).unwrap();

        assert_eq!(second.get("k"), Some("new".to_string()));
        assert_eq!(second.stats().durable_errors, 1);
        assert!(!tier.contains_key("cache:v1:k"));

        let mut third = manager(1_000, EvictionStrategy::Lru, &tier, &clock);
        assert_eq!(third.get("k"), None);
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_wrapping() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        let ttl = Duration::from_secs(u64::MAX / 1000 + 1);
        cache.set("k", "v".to_string(), Some(ttl)).unwrap();
        assert_eq!(cache.entries["k"].expires_at, u64::MAX);

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_rehydrate_from_durable() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        {
            let mut first = manager(1_000, EvictionStrategy::Lru, &tier, &clock);
            first.set("k", "v".to_string(), Some(Duration::from_secs(10))).unwrap();
        }

        clock.advance(Duration::from_secs(4));
        let mut second = manager(1_000, EvictionStrategy::Lru, &tier, &clock);
        assert_eq!(second.get("k"), Some("v".to_string()));
        assert_eq!(second.stats().hits, 1);
        assert_eq!(second.total_size_bytes(), 100);

        let entry = &second.entries["k"];
        assert_eq!(entry.created_at, START_MS);
        assert_eq!(entry.expires_at, START_MS + 10_000);
        assert_eq!(entry.access_count, 1);

        // Original expiry is honored, not refreshed
        clock.advance(Duration::from_secs(6));
        assert_eq!(second.get("k"), None);
    }

    #[test]
    fn test_rehydrate_evicts_to_fit() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        {
            let mut first = manager(1_000, EvictionStrategy::Lru, &tier, &clock);
            first.set("old", "o".to_string(), None).unwrap();
        }

        let mut second = manager(200, EvictionStrategy::Lru, &tier, &clock);
        second.set("x", "x".to_string(), None).unwrap();
        second.set("y", "y".to_string(), None).unwrap();

        assert_eq!(second.get("old"), Some("o".to_string()));
        assert_eq!(second.stats().evictions, 1);
        assert!(!second.contains_key("x"));
        assert_eq!(second.total_size_bytes(), 200);
    }

    #[test]
    fn test_corrupt_durable_record_is_purged() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        tier.insert_raw("cache:v1:bad", b"{ definitely not a record");
        assert_eq!(cache.get("bad"), None);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.durable_errors, 1);
        assert!(!tier.contains_key("cache:v1:bad"));
    }

    #[test]
    fn test_durable_read_failure_is_a_miss() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);

        tier.fail_reads(true);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().durable_errors, 1);
    }

    #[test]
    fn test_persist_disabled_never_touches_durable() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache: CacheManager<String> = CacheManager::open_with(
            CacheConfig {
                persist: false,
                ..config(1_000, EvictionStrategy::Lru)
            },
            Box::new(tier.clone()),
            Box::new(|_: &String| 100u64),
            Arc::new(clock.clone()),
        )
        .unwrap();

        cache.set("k", "v".to_string(), None).unwrap();
        assert!(tier.is_empty());
        assert!(!cache.durable_enabled());
        assert_eq!(cache.version_check(), Some(&VersionCheck::Skipped));
    }

    #[test]
    fn test_gate_failure_disables_durable_tier() {
        let tier = MemoryDurableTier::new();
        tier.insert_raw("cache:__version__", b"v0");
        tier.insert_raw("cache:v0:k", b"{}");
        tier.fail_writes(true);
        let clock = ManualClock::new(START_MS);

        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);
        assert!(!cache.durable_enabled());
        assert_eq!(cache.version_check(), None);
        assert_eq!(cache.stats().durable_errors, 1);

        tier.fail_writes(false);
        cache.set("k", "v".to_string(), None).unwrap();
        assert!(!tier.contains_key("cache:v1:k"));
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let result: Result<CacheManager<String>> = CacheManager::open(
            CacheConfig {
                capacity_bytes: 0,
                ..CacheConfig::default()
            },
            Box::new(NoopDurableTier),
        );
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_hit_rate() {
        let tier = MemoryDurableTier::new();
        let clock = ManualClock::new(START_MS);
        let mut cache = manager(1_000, EvictionStrategy::Lru, &tier, &clock);
        assert_eq!(cache.stats().hit_rate, 0.0);

        cache.set("k", "v".to_string(), None).unwrap();
        cache.get("k");
        cache.get("k");
        cache.get("k");
        cache.get("missing");

        assert_eq!(cache.stats().hit_rate, 0.75);
    }
}
