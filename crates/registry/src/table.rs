//! Per-platform signature → id table
//!
//! # Design
//!
//! - DashMap: platform id → signature map
//! - One `parking_lot::Mutex` per platform: the check-then-insert of a
//!   signature is a single critical section, so racing registrations of the
//!   same signature converge to one entry
//! - Ids come from one table-wide counter and are never reused
//!
//! Registrations of different platforms never contend.

use dashmap::DashMap;
use invoscope_core::{PlatformId, SensorTypeConfig, SensorTypeId};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

type PlatformEntries = Arc<Mutex<FxHashMap<SensorTypeConfig, SensorTypeId>>>;

/// Registered sensor types, per platform
pub struct RegistrationTable {
    platforms: DashMap<PlatformId, PlatformEntries>,
    next_id: AtomicU64,
}

impl RegistrationTable {
    /// Create an empty table; the first assigned id is 1
    pub fn new() -> Self {
        Self {
            platforms: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn entries_for(&self, platform_id: PlatformId) -> PlatformEntries {
        Arc::clone(self.platforms.entry(platform_id).or_default().value())
    }

    /// Register a signature for a platform, returning its id
    ///
    /// Idempotent: an existing (platform, signature) entry keeps its id.
    pub fn register(&self, platform_id: PlatformId, signature: &SensorTypeConfig) -> SensorTypeId {
        let entries = self.entries_for(platform_id);
        let mut entries = entries.lock();

        if let Some(&id) = entries.get(signature) {
            debug!(platform_id, id, signature = %signature, "sensor type already registered");
            return id;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.insert(signature.clone(), id);
        info!(platform_id, id, signature = %signature, "registered sensor type");
        id
    }

    /// Id of a registered signature, if any
    pub fn lookup(&self, platform_id: PlatformId, signature: &SensorTypeConfig) -> Option<SensorTypeId> {
        let entries = self.platforms.get(&platform_id).map(|e| Arc::clone(e.value()))?;
        let id = entries.lock().get(signature).copied();
        id
    }

    /// All entries of one platform, ordered by id
    pub fn platform_entries(&self, platform_id: PlatformId) -> Vec<(SensorTypeConfig, SensorTypeId)> {
        let Some(entries) = self.platforms.get(&platform_id).map(|e| Arc::clone(e.value())) else {
            return Vec::new();
        };
        let mut list: Vec<_> = entries
            .lock()
            .iter()
            .map(|(signature, id)| (signature.clone(), *id))
            .collect();
        list.sort_unstable_by_key(|(_, id)| *id);
        list
    }

    /// Drop every entry of a platform (platform teardown)
    ///
    /// Returns the number of entries removed.
    pub fn drop_platform(&self, platform_id: PlatformId) -> usize {
        match self.platforms.remove(&platform_id) {
            Some((_, entries)) => {
                let removed = entries.lock().len();
                info!(platform_id, removed, "dropped platform registrations");
                removed
            }
            None => 0,
        }
    }

    /// Total number of entries across platforms
    pub fn len(&self) -> usize {
        self.platforms
            .iter()
            .map(|entry| entry.value().lock().len())
            .sum()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RegistrationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegistrationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationTable")
            .field("platforms", &self.platforms.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}
