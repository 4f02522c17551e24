//! Durable Tier Module
//!
//! The slower, persistent key/value medium behind the volatile tier.
//!
//! # Implementations
//! - `NoopDurableTier`: stores nothing (persistence disabled)
//! - `MemoryDurableTier`: shareable in-memory medium, with failure injection
//! - `FileDurableTier`: one file per record in a directory

mod file;
mod memory;

pub use file::FileDurableTier;
pub use memory::MemoryDurableTier;

use crate::error::DurableResult;

// == Durable Tier Trait ==
/// Contract for a persistent key/value medium injected into the manager.
///
/// Every call is blocking and must complete before returning. `durable_set`
/// must be atomic: either the full blob lands or nothing does.
pub trait DurableTier: Send + Sync {
    /// Reads the blob stored under `key`.
    fn durable_get(&self, key: &str) -> DurableResult<Option<Vec<u8>>>;

    /// Stores `blob` under `key`, replacing any previous blob.
    fn durable_set(&self, key: &str, blob: &[u8]) -> DurableResult<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn durable_remove(&self, key: &str) -> DurableResult<()>;

    /// Lists every stored key starting with `prefix`.
    fn durable_scan_prefix(&self, prefix: &str) -> DurableResult<Vec<String>>;
}

// == Noop Durable Tier ==
/// A durable tier that stores nothing. Used when persistence is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDurableTier;

impl DurableTier for NoopDurableTier {
    fn durable_get(&self, _key: &str) -> DurableResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn durable_set(&self, _key: &str, _blob: &[u8]) -> DurableResult<()> {
        Ok(())
    }

    fn durable_remove(&self, _key: &str) -> DurableResult<()> {
        Ok(())
    }

    fn durable_scan_prefix(&self, _prefix: &str) -> DurableResult<Vec<String>> {
        Ok(Vec::new())
    }
}
