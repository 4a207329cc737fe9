//! Scan planning for overview filters
//!
//! A plan is a shard scope plus the index used inside each shard. Index
//! preference, narrowest first:
//!
//! ```text
//! explicit id set > trace > method > business transaction > application
//!     > time range > min id > full shard scan
//! ```
//!
//! The plan only selects candidates. Every predicate of the filter is still
//! applied to every candidate, so a plan can never widen a result.

use invoscope_core::{
    ApplicationId, BusinessTransactionId, InvocationId, MethodId, OverviewFilter, PlatformId,
    Timestamp, TraceId, ANY,
};
use invoscope_storage::{PlatformShard, SharedInvocation};
use std::collections::BTreeSet;
use std::fmt;

/// Shards a plan visits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardScope {
    /// A single platform
    Platform(PlatformId),
    /// Every platform, in platform id order
    All,
}

/// Index used within each visited shard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScan<'a> {
    /// Point lookups of an explicit id set
    Ids(&'a BTreeSet<InvocationId>),
    /// Trace index
    Trace(TraceId),
    /// Method index
    Method(MethodId),
    /// Business transaction index
    BusinessTransaction(BusinessTransactionId),
    /// Application index
    Application(ApplicationId),
    /// Ordered timestamp index, inclusive bounds
    TimeRange {
        /// Lower bound
        from: Option<Timestamp>,
        /// Upper bound
        to: Option<Timestamp>,
    },
    /// Id-ordered arena from a lower id bound
    IdsFrom(InvocationId),
    /// Every record of the shard
    Full,
}

/// Chosen access path for one overview filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanPlan<'a> {
    /// Shards to visit
    pub scope: ShardScope,
    /// Index to use inside each shard
    pub index: IndexScan<'a>,
}

impl<'a> ScanPlan<'a> {
    /// Pick the narrowest access path for a filter
    pub fn choose(filter: &'a OverviewFilter) -> Self {
        let scope = if filter.platform_id == ANY {
            ShardScope::All
        } else {
            ShardScope::Platform(filter.platform_id)
        };

        let index = if let Some(ids) = &filter.ids {
            IndexScan::Ids(ids)
        } else if let Some(trace_id) = filter.trace_id {
            IndexScan::Trace(trace_id)
        } else if let Some(method_id) = filter.method_id {
            IndexScan::Method(method_id)
        } else if filter.business_transaction_id != ANY {
            IndexScan::BusinessTransaction(filter.business_transaction_id)
        } else if filter.application_id != ANY {
            IndexScan::Application(filter.application_id)
        } else if filter.from.is_some() || filter.to.is_some() {
            IndexScan::TimeRange {
                from: filter.from,
                to: filter.to,
            }
        } else if let Some(min_id) = filter.min_id {
            IndexScan::IdsFrom(min_id)
        } else {
            IndexScan::Full
        };

        Self { scope, index }
    }

    /// Candidate records of one shard
    pub fn candidates<'s>(
        &'s self,
        shard: &'s PlatformShard,
    ) -> Box<dyn Iterator<Item = &'s SharedInvocation> + 's> {
        let lookup = move |id: InvocationId| shard.get(id);
        match self.index {
            IndexScan::Ids(ids) => Box::new(ids.iter().filter_map(move |id| shard.get(*id))),
            IndexScan::Trace(trace_id) => {
                Box::new(shard.ids_for_trace(trace_id).filter_map(lookup))
            }
            IndexScan::Method(method_id) => {
                Box::new(shard.ids_for_method(method_id).filter_map(lookup))
            }
            IndexScan::BusinessTransaction(bt) => {
                Box::new(shard.ids_for_business_transaction(bt).filter_map(lookup))
            }
            IndexScan::Application(app) => {
                Box::new(shard.ids_for_application(app).filter_map(lookup))
            }
            IndexScan::TimeRange { from, to } => {
                Box::new(shard.ids_in_time_range(from, to).filter_map(lookup))
            }
            IndexScan::IdsFrom(min_id) => Box::new(shard.iter_from(min_id)),
            IndexScan::Full => Box::new(shard.iter()),
        }
    }
}

impl fmt::Display for ScanPlan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            ShardScope::Platform(p) => write!(f, "platform {}", p)?,
            ShardScope::All => write!(f, "all platforms")?,
        }
        match self.index {
            IndexScan::Ids(ids) => write!(f, " / {} ids", ids.len()),
            IndexScan::Trace(t) => write!(f, " / trace {}", t),
            IndexScan::Method(m) => write!(f, " / method {}", m),
            IndexScan::BusinessTransaction(bt) => write!(f, " / business transaction {}", bt),
            IndexScan::Application(app) => write!(f, " / application {}", app),
            IndexScan::TimeRange { .. } => write!(f, " / time range"),
            IndexScan::IdsFrom(id) => write!(f, " / ids from {}", id),
            IndexScan::Full => write!(f, " / full scan"),
        }
    }
}
