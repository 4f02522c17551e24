//! Version Gate Module
//!
//! Wipes durable data written under a different version tag, so that blobs
//! with an old value shape are never decoded by a newer build.

use tracing::{info, warn};

use crate::durable::DurableTier;
use crate::error::{CacheError, Result};

/// Suffix of the metadata slot holding the stored version.
const VERSION_SLOT: &str = "__version__";

// == Version Check Outcome ==
/// Result of comparing the running version with the stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheck {
    /// No version was stored; the current one has been recorded
    FirstRun,
    /// Stored and current versions are equal
    Matched,
    /// The versions differed and `removed` stale records were wiped
    Wiped { previous: String, removed: usize },
    /// Persistence is disabled, nothing was checked
    Skipped,
}

// == Gate State ==
#[derive(Debug, Clone, PartialEq, Eq)]
enum GateState {
    Unchecked,
    Checked(VersionCheck),
}

// == Version Gate ==
/// Compares the configured version tag against the one stored in the
/// durable tier, once per process.
#[derive(Debug, Clone)]
pub struct VersionGate {
    current_version: String,
    namespace: String,
    state: GateState,
}

impl VersionGate {
    pub fn new(namespace: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            namespace: namespace.into(),
            state: GateState::Unchecked,
        }
    }

    pub fn current_version(&self) -> &str {
        &self.current_version
    }

    /// Key of the metadata slot holding the stored version.
    pub fn version_key(&self) -> String {
        format!("{}:{}", self.namespace, VERSION_SLOT)
    }

    /// Prefix under which every record of the current version lives.
    pub fn record_prefix(&self) -> String {
        format!("{}:{}:", self.namespace, self.current_version)
    }

    /// Outcome of the check, if it has run.
    pub fn outcome(&self) -> Option<&VersionCheck> {
        match &self.state {
            GateState::Unchecked => None,
            GateState::Checked(outcome) => Some(outcome),
        }
    }

    /// Marks the gate as checked without touching any medium.
    pub fn skip(&mut self) -> VersionCheck {
        self.state = GateState::Checked(VersionCheck::Skipped);
        VersionCheck::Skipped
    }

    // == Check ==
    /// Runs the version comparison. Later calls return the first outcome.
    ///
    /// On mismatch every record in the namespace other than the version slot
    /// is removed before the current version is stored. Any failure along
    /// the way is returned as `VersionMismatchWipeFailed` and leaves the gate
    /// unchecked; the caller must not read durable data in that case.
    pub fn check(&mut self, durable: &dyn DurableTier) -> Result<VersionCheck> {
        if let GateState::Checked(outcome) = &self.state {
            return Ok(outcome.clone());
        }

        let version_key = self.version_key();
        let stored = durable
            .durable_get(&version_key)
            .map_err(|e| self.wipe_failed(None, e.to_string()))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());

        let outcome = match stored {
            Some(ref previous) if *previous == self.current_version => VersionCheck::Matched,
            Some(previous) => {
                let removed = self.wipe(durable, &previous)?;
                self.store_version(durable, Some(&previous))?;
                info!(
                    "Cache version changed from '{}' to '{}', wiped {} durable records",
                    previous, self.current_version, removed
                );
                VersionCheck::Wiped { previous, removed }
            }
            None => {
                // Records without a version slot can't be trusted either
                let removed = self.wipe(durable, "")?;
                if removed > 0 {
                    warn!("Wiped {} unversioned durable records", removed);
                }
                self.store_version(durable, None)?;
                VersionCheck::FirstRun
            }
        };

        self.state = GateState::Checked(outcome.clone());
        Ok(outcome)
    }

    fn wipe(&self, durable: &dyn DurableTier, previous: &str) -> Result<usize> {
        let version_key = self.version_key();
        let previous = Some(previous.to_string()).filter(|p| !p.is_empty());
        let keys = durable
            .durable_scan_prefix(&format!("{}:", self.namespace))
            .map_err(|e| self.wipe_failed(previous.clone(), e.to_string()))?;

        let mut removed = 0;
        for key in keys.iter().filter(|k| **k != version_key) {
            durable
                .durable_remove(key)
                .map_err(|e| self.wipe_failed(previous.clone(), e.to_string()))?;
            removed += 1;
        }
        Ok(removed)
    }

    fn store_version(&self, durable: &dyn DurableTier, previous: Option<&str>) -> Result<()> {
        durable
            .durable_set(&self.version_key(), self.current_version.as_bytes())
            .map_err(|e| self.wipe_failed(previous.map(str::to_string), e.to_string()))
    }

    fn wipe_failed(&self, previous: Option<String>, reason: String) -> CacheError {
        CacheError::VersionMismatchWipeFailed {
            previous,
            current: self.current_version.clone(),
            reason,
        }
    }
}
