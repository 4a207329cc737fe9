//! Bounded, sharded in-memory trace buffer
//!
//! # Design
//!
//! - DashMap: platform id → shard handle
//! - DashMap: invocation id → platform id, so id lookups touch one shard
//! - One `RwLock` per platform shard; writers of different platforms never
//!   contend
//! - Insert, index update and eviction happen under the shard write lock,
//!   so readers observe either the state before or after the whole step
//! - Reads hand out `Arc` handles, never borrowed views, so a record that is
//!   evicted after it was read stays complete for its reader
//!
//! # Thread Safety
//!
//! All operations are thread-safe. `get()` of an id racing with its eviction
//! deterministically returns either the full record or `NotFound`.

use crate::shard::{PlatformShard, SharedInvocation};
use dashmap::DashMap;
use invoscope_core::{InvocationId, InvocationSequence, NonIndexedFields, PlatformId, StorageError};
use parking_lot::RwLock;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default number of records retained per platform
pub const DEFAULT_CAPACITY_PER_PLATFORM: usize = 100_000;

type ShardHandle = Arc<RwLock<PlatformShard>>;

/// Concurrent, indexed, bounded store of invocation sequences
pub struct TraceBuffer {
    shards: DashMap<PlatformId, ShardHandle>,
    /// Platform of every stored id; maintained under the owning shard's
    /// write lock
    locations: DashMap<InvocationId, PlatformId>,
    /// Last assigned invocation id
    last_id: AtomicU64,
    capacity_per_platform: usize,
}

impl TraceBuffer {
    /// Create a buffer with the default per-platform capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY_PER_PLATFORM)
    }

    /// Create a buffer retaining at most `capacity_per_platform` records per
    /// platform (a capacity of zero is treated as one)
    pub fn with_capacity(capacity_per_platform: usize) -> Self {
        Self {
            shards: DashMap::new(),
            locations: DashMap::new(),
            last_id: AtomicU64::new(0),
            capacity_per_platform: capacity_per_platform.max(1),
        }
    }

    /// Per-platform record bound
    pub fn capacity_per_platform(&self) -> usize {
        self.capacity_per_platform
    }

    /// Last id handed out by `insert` (0 if none)
    pub fn last_id(&self) -> InvocationId {
        self.last_id.load(Ordering::Acquire)
    }

    fn shard_for_write(&self, platform_id: PlatformId) -> ShardHandle {
        // Clone the handle out so the DashMap bucket lock is released
        // before the shard lock is taken.
        Arc::clone(
            self.shards
                .entry(platform_id)
                .or_insert_with(|| Arc::new(RwLock::new(PlatformShard::new(platform_id))))
                .value(),
        )
    }

    fn shard(&self, platform_id: PlatformId) -> Option<ShardHandle> {
        self.shards
            .get(&platform_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Whether `handle` is still the registered shard of the platform
    fn is_registered(&self, platform_id: PlatformId, handle: &ShardHandle) -> bool {
        self.shards
            .get(&platform_id)
            .map_or(false, |entry| Arc::ptr_eq(entry.value(), handle))
    }

    /// Platform holding `id`, if stored
    fn location(&self, id: InvocationId) -> Option<PlatformId> {
        self.locations.get(&id).map(|entry| *entry.value())
    }

    /// Forget the ids of a shard that has been removed from the map
    fn retire(&self, handle: &ShardHandle) -> usize {
        let shard = handle.write();
        for record in shard.iter() {
            self.locations.remove(&record.id);
        }
        shard.len()
    }

    /// Snapshot of all shard handles, ordered by platform id
    fn shard_handles(&self) -> Vec<ShardHandle> {
        let mut handles: Vec<(PlatformId, ShardHandle)> = self
            .shards
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        handles.sort_unstable_by_key(|(platform_id, _)| *platform_id);
        handles.into_iter().map(|(_, handle)| handle).collect()
    }

    // ========================================================================
    // Write path
    // ========================================================================

    /// Append a record, returning its assigned id
    ///
    /// Any id already set on the record is overwritten. If the platform is at
    /// capacity the oldest records (by id) are evicted in the same step.
    pub fn insert(&self, mut record: InvocationSequence) -> InvocationId {
        let platform_id = record.platform_id;
        loop {
            let handle = self.shard_for_write(platform_id);
            let mut shard = handle.write();
            if !self.is_registered(platform_id, &handle) {
                // Retired by a concurrent clear
                continue;
            }

            // Allocated under the shard lock: ids within a platform ascend in
            // publication order.
            let id = self.last_id.fetch_add(1, Ordering::AcqRel) + 1;
            record.id = id;

            let mut evicted = Vec::new();
            while shard.len() >= self.capacity_per_platform {
                match shard.evict_oldest() {
                    Some(old) => {
                        self.locations.remove(&old.id);
                        evicted.push(old);
                    }
                    None => break,
                }
            }
            shard.index(Arc::new(record));
            self.locations.insert(id, platform_id);
            drop(shard);

            if !evicted.is_empty() {
                debug!(platform_id, id, evicted = evicted.len(), "evicted oldest invocations");
            }
            // Subtrees are released outside the shard lock
            drop(evicted);
            return id;
        }
    }

    /// Mutate the non-indexed fields of a stored record in place
    ///
    /// Indexed attributes are not reachable through the mutator.
    pub fn update_in_place<F>(&self, id: InvocationId, mutator: F) -> Result<(), StorageError>
    where
        F: FnOnce(NonIndexedFields<'_>),
    {
        let handle = self
            .location(id)
            .and_then(|platform_id| self.shard(platform_id))
            .ok_or(StorageError::NotFound(id))?;

        // The record may have been evicted between the lookup and the write
        // lock; the write path re-checks.
        if handle.write().update_non_indexed(id, mutator) {
            Ok(())
        } else {
            Err(StorageError::NotFound(id))
        }
    }

    /// Drop every record of every platform
    pub fn clear(&self) {
        let mut platforms = 0usize;
        let mut records = 0usize;
        for platform_id in self.platforms() {
            if let Some((_, handle)) = self.shards.remove(&platform_id) {
                platforms += 1;
                records += self.retire(&handle);
            }
        }
        debug!(platforms, records, "trace buffer cleared");
    }

    /// Drop all records of one platform
    ///
    /// Returns true if the platform had a shard.
    pub fn clear_platform(&self, platform_id: PlatformId) -> bool {
        match self.shards.remove(&platform_id) {
            Some((_, handle)) => {
                let records = self.retire(&handle);
                debug!(platform_id, records, "platform cleared");
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Read path
    // ========================================================================

    /// Get a record by id
    pub fn get(&self, id: InvocationId) -> Result<SharedInvocation, StorageError> {
        let platform_id = self.location(id).ok_or(StorageError::NotFound(id))?;
        self.get_in_platform(platform_id, id)
    }

    /// Get a record by id within one platform
    pub fn get_in_platform(
        &self,
        platform_id: PlatformId,
        id: InvocationId,
    ) -> Result<SharedInvocation, StorageError> {
        self.shard(platform_id)
            .and_then(|handle| handle.read().get(id).cloned())
            .ok_or(StorageError::NotFound(id))
    }

    /// Run `f` against one platform's shard under its read lock
    ///
    /// Returns `None` if the platform holds no shard.
    pub fn read_platform<R>(
        &self,
        platform_id: PlatformId,
        f: impl FnOnce(&PlatformShard) -> R,
    ) -> Option<R> {
        let handle = self.shard(platform_id)?;
        let shard = handle.read();
        Some(f(&shard))
    }

    /// Run `f` against every shard, in platform id order, each under its
    /// read lock; stops early on `ControlFlow::Break`
    pub fn read_each<B>(&self, mut f: impl FnMut(&PlatformShard) -> ControlFlow<B>) -> Option<B> {
        for handle in self.shard_handles() {
            let shard = handle.read();
            if let ControlFlow::Break(b) = f(&shard) {
                return Some(b);
            }
        }
        None
    }

    /// Total number of records across platforms
    pub fn len(&self) -> usize {
        self.shard_handles()
            .iter()
            .map(|handle| handle.read().len())
            .sum()
    }

    /// Check if the buffer holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records held for one platform
    pub fn platform_len(&self, platform_id: PlatformId) -> usize {
        self.read_platform(platform_id, PlatformShard::len)
            .unwrap_or(0)
    }

    /// Platforms that currently have a shard, ascending
    pub fn platforms(&self) -> Vec<PlatformId> {
        let mut ids: Vec<_> = self.shards.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for TraceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TraceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceBuffer")
            .field("platforms", &self.shards.len())
            .field("last_id", &self.last_id())
            .field("capacity_per_platform", &self.capacity_per_platform)
            .finish()
    }
}
