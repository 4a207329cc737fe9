//! Per-platform record arena with secondary indices
//!
//! Records live in an id-keyed arena. Every secondary index holds ids only,
//! never references into the arena, so removing a record is a matter of
//! dropping its id from each index. No index can dangle.
//!
//! A shard is never shared without its lock: callers see either the state
//! before an insert/evict or the state after it.

use invoscope_core::{
    ApplicationId, BusinessTransactionId, InvocationId, InvocationSequence, MethodId,
    NonIndexedFields, PlatformId, Timestamp, TraceId,
};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::Hash;
use std::ops::Bound;
use std::sync::Arc;

/// Stored record handle; cloning is cheap and never copies the subtree
pub type SharedInvocation = Arc<InvocationSequence>;

/// Id set per key for one secondary index
type IdIndex<K> = FxHashMap<K, BTreeSet<InvocationId>>;

fn index_add<K: Hash + Eq>(index: &mut IdIndex<K>, key: K, id: InvocationId) {
    index.entry(key).or_default().insert(id);
}

fn index_remove<K: Hash + Eq>(index: &mut IdIndex<K>, key: &K, id: InvocationId) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}

/// Records of one platform plus their indices
#[derive(Debug)]
pub struct PlatformShard {
    platform_id: PlatformId,
    /// Arena ordered by id; the first entry is the oldest record
    records: BTreeMap<InvocationId, SharedInvocation>,
    by_method: IdIndex<MethodId>,
    by_trace: IdIndex<TraceId>,
    by_business_transaction: IdIndex<BusinessTransactionId>,
    by_application: IdIndex<ApplicationId>,
    by_time: BTreeSet<(Timestamp, InvocationId)>,
}

impl PlatformShard {
    /// Create an empty shard for a platform
    pub fn new(platform_id: PlatformId) -> Self {
        Self {
            platform_id,
            records: BTreeMap::new(),
            by_method: IdIndex::default(),
            by_trace: IdIndex::default(),
            by_business_transaction: IdIndex::default(),
            by_application: IdIndex::default(),
            by_time: BTreeSet::new(),
        }
    }

    /// Platform this shard belongs to
    pub fn platform_id(&self) -> PlatformId {
        self.platform_id
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if shard is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by id
    pub fn get(&self, id: InvocationId) -> Option<&SharedInvocation> {
        self.records.get(&id)
    }

    /// Whether the record is held
    pub fn contains(&self, id: InvocationId) -> bool {
        self.records.contains_key(&id)
    }

    /// All records in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &SharedInvocation> + '_ {
        self.records.values()
    }

    /// Records with id at or above `min_id`, ascending
    pub fn iter_from(&self, min_id: InvocationId) -> impl Iterator<Item = &SharedInvocation> + '_ {
        self.records.range(min_id..).map(|(_, r)| r)
    }

    /// Ids recorded for a method, ascending
    pub fn ids_for_method(
        &self,
        method_id: MethodId,
    ) -> impl DoubleEndedIterator<Item = InvocationId> + '_ {
        self.by_method.get(&method_id).into_iter().flatten().copied()
    }

    /// Ids recorded for a trace, ascending
    pub fn ids_for_trace(
        &self,
        trace_id: TraceId,
    ) -> impl DoubleEndedIterator<Item = InvocationId> + '_ {
        self.by_trace.get(&trace_id).into_iter().flatten().copied()
    }

    /// Ids recorded for a business transaction, ascending
    pub fn ids_for_business_transaction(
        &self,
        business_transaction_id: BusinessTransactionId,
    ) -> impl DoubleEndedIterator<Item = InvocationId> + '_ {
        self.by_business_transaction
            .get(&business_transaction_id)
            .into_iter()
            .flatten()
            .copied()
    }

    /// Ids recorded for an application, ascending
    pub fn ids_for_application(
        &self,
        application_id: ApplicationId,
    ) -> impl DoubleEndedIterator<Item = InvocationId> + '_ {
        self.by_application
            .get(&application_id)
            .into_iter()
            .flatten()
            .copied()
    }

    /// Ids whose timestamp lies in the inclusive range, in timestamp order
    pub fn ids_in_time_range(
        &self,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
    ) -> impl Iterator<Item = InvocationId> + '_ {
        let lower = match from {
            Some(ts) => Bound::Included((ts, InvocationId::MIN)),
            None => Bound::Unbounded,
        };
        let upper = match to {
            Some(ts) => Bound::Included((ts, InvocationId::MAX)),
            None => Bound::Unbounded,
        };
        self.by_time.range((lower, upper)).map(|(_, id)| *id)
    }

    /// Publish a record and index it
    ///
    /// The record must already carry its assigned id.
    pub(crate) fn index(&mut self, record: SharedInvocation) {
        let id = record.id;
        index_add(&mut self.by_method, record.method_id, id);
        index_add(&mut self.by_trace, record.trace_id, id);
        index_add(
            &mut self.by_business_transaction,
            record.business_transaction_id,
            id,
        );
        index_add(&mut self.by_application, record.application_id, id);
        self.by_time.insert((record.timestamp, id));
        self.records.insert(id, record);
    }

    /// Remove a record from the arena and every index
    pub(crate) fn unindex(&mut self, id: InvocationId) -> Option<SharedInvocation> {
        let record = self.records.remove(&id)?;
        index_remove(&mut self.by_method, &record.method_id, id);
        index_remove(&mut self.by_trace, &record.trace_id, id);
        index_remove(
            &mut self.by_business_transaction,
            &record.business_transaction_id,
            id,
        );
        index_remove(&mut self.by_application, &record.application_id, id);
        self.by_time.remove(&(record.timestamp, id));
        Some(record)
    }

    /// Evict the record with the smallest id
    pub(crate) fn evict_oldest(&mut self) -> Option<SharedInvocation> {
        let oldest = *self.records.keys().next()?;
        self.unindex(oldest)
    }

    /// Apply a mutation to the non-indexed fields of a record
    ///
    /// Copy-on-write: readers already holding the old handle keep seeing the
    /// old, complete record. Only the top node is copied; the subtree is
    /// shared.
    pub(crate) fn update_non_indexed<F>(&mut self, id: InvocationId, mutator: F) -> bool
    where
        F: FnOnce(NonIndexedFields<'_>),
    {
        match self.records.get_mut(&id) {
            Some(record) => {
                mutator(Arc::make_mut(record).non_indexed_fields());
                true
            }
            None => false,
        }
    }
}
