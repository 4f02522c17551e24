//! In-memory durable medium.
//!
//! Clones share one underlying map, so a second `CacheManager` built over a
//! clone sees everything the first one wrote. That is how tests simulate a
//! process restart.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::durable::DurableTier;
use crate::error::{DurableError, DurableResult};

#[derive(Debug, Default)]
struct Shared {
    records: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

/// Shareable in-memory durable tier with failure injection.
#[derive(Debug, Clone, Default)]
pub struct MemoryDurableTier {
    shared: Arc<Shared>,
}

impl MemoryDurableTier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every read (`durable_get`, `durable_scan_prefix`) fail.
    pub fn fail_reads(&self, fail: bool) {
        self.shared.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every write (`durable_set`, `durable_remove`) fail.
    pub fn fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Writes a raw blob, bypassing failure injection.
    pub fn insert_raw(&self, key: &str, blob: &[u8]) {
        self.records().insert(key.to_string(), blob.to_vec());
    }

    /// Every stored key, in order.
    pub fn keys(&self) -> Vec<String> {
        self.records().keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        // A poisoned map is still a consistent map: writes are single inserts
        self.shared
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_reads(&self) -> DurableResult<()> {
        if self.shared.fail_reads.load(Ordering::SeqCst) {
            return Err(DurableError::Unavailable("reads disabled".to_string()));
        }
        Ok(())
    }

    fn check_writes(&self) -> DurableResult<()> {
        if self.shared.fail_writes.load(Ordering::SeqCst) {
            return Err(DurableError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl DurableTier for MemoryDurableTier {
    fn durable_get(&self, key: &str) -> DurableResult<Option<Vec<u8>>> {
        self.check_reads()?;
        Ok(self.records().get(key).cloned())
    }

    fn durable_set(&self, key: &str, blob: &[u8]) -> DurableResult<()> {
        self.check_writes()?;
        self.records().insert(key.to_string(), blob.to_vec());
        Ok(())
    }

    fn durable_remove(&self, key: &str) -> DurableResult<()> {
        self.check_writes()?;
        self.records().remove(key);
        Ok(())
    }

    fn durable_scan_prefix(&self, prefix: &str) -> DurableResult<Vec<String>> {
        self.check_reads()?;
        Ok(self
            .records()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
