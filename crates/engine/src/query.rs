//! Overview and detail queries
//!
//! Every overview runs the same pipeline:
//!
//! 1. Validate the filter (`from > to` is rejected before any scan)
//! 2. Choose a [`ScanPlan`]
//! 3. Collect candidates shard by shard under each shard's read lock and
//!    apply every filter predicate
//! 4. Sort by the comparator, ties broken by ascending id
//! 5. Truncate to the limit
//!
//! Cancellation is polled every `check_interval` records during the scan
//! and once more before sorting. A cancelled query returns
//! [`QueryError::Cancelled`], never a partial list.

use crate::cancel::{CancelCheck, CancellationToken};
use crate::plan::{ScanPlan, ShardScope};
use invoscope_core::{
    DetailTemplate, InvocationSummary, MethodId, OverviewFilter, PlatformId, QueryError,
    ResultComparator, SortKey, Timestamp, TraceId,
};
use invoscope_storage::{PlatformShard, SharedInvocation, TraceBuffer};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, info};

/// Default number of scanned records between cancellation polls
pub const DEFAULT_CHECK_INTERVAL: usize = 1024;

/// Query engine over a shared trace buffer
#[derive(Debug, Clone)]
pub struct QueryEngine {
    buffer: Arc<TraceBuffer>,
    check_interval: usize,
}

impl QueryEngine {
    /// Create an engine over `buffer`
    pub fn new(buffer: Arc<TraceBuffer>) -> Self {
        Self {
            buffer,
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }

    /// Poll for cancellation every `interval` scanned records
    pub fn with_check_interval(mut self, interval: usize) -> Self {
        self.check_interval = interval.max(1);
        self
    }

    /// The buffer this engine reads
    pub fn buffer(&self) -> &Arc<TraceBuffer> {
        &self.buffer
    }

    // ========================================================================
    // Overview
    // ========================================================================

    /// Summaries matching `filter`, ordered by `comparator` (default:
    /// newest first), at most `limit` of them
    pub fn overview(
        &self,
        filter: &OverviewFilter,
        limit: usize,
        comparator: Option<&ResultComparator>,
    ) -> Result<Vec<InvocationSummary>, QueryError> {
        self.overview_cancellable(filter, limit, comparator, &CancellationToken::new())
    }

    /// [`overview`](Self::overview) with a cancellation token
    pub fn overview_cancellable(
        &self,
        filter: &OverviewFilter,
        limit: usize,
        comparator: Option<&ResultComparator>,
        cancel: &CancellationToken,
    ) -> Result<Vec<InvocationSummary>, QueryError> {
        let records = self.ordered(filter, limit, comparator, cancel)?;
        Ok(records
            .iter()
            .map(|record| InvocationSummary::from(record.as_ref()))
            .collect())
    }

    /// Full records (children included) of one platform, optionally one
    /// method and time range, ordered and limited like an overview
    #[allow(clippy::too_many_arguments)]
    pub fn detail_list(
        &self,
        platform_id: PlatformId,
        method_id: Option<MethodId>,
        limit: usize,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
        comparator: Option<&ResultComparator>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SharedInvocation>, QueryError> {
        let filter = OverviewFilter {
            platform_id,
            method_id,
            ..OverviewFilter::default()
        }
        .between(from, to);
        self.ordered(&filter, limit, comparator, cancel)
    }

    fn ordered(
        &self,
        filter: &OverviewFilter,
        limit: usize,
        comparator: Option<&ResultComparator>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SharedInvocation>, QueryError> {
        let matches = self.scan(filter, cancel)?;
        if let Err(e) = cancel.check() {
            info!("query cancelled before sort");
            return Err(e);
        }

        let default_comparator;
        let comparator = match comparator {
            Some(c) => c,
            None => {
                default_comparator = ResultComparator::default();
                &default_comparator
            }
        };

        let mut keyed: Vec<(SortKey, SharedInvocation)> = matches
            .into_iter()
            .map(|record| (comparator.extract_key(&record), record))
            .collect();
        keyed.sort_by(|(ka, a), (kb, b)| comparator.compare_keys(ka, kb).then(a.id.cmp(&b.id)));
        keyed.truncate(limit);

        Ok(keyed.into_iter().map(|(_, record)| record).collect())
    }

    /// Every stored record satisfying `filter`, in no particular order
    fn scan(
        &self,
        filter: &OverviewFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<SharedInvocation>, QueryError> {
        filter.validate()?;
        let plan = ScanPlan::choose(filter);
        debug!(plan = %plan, "executing scan");

        let mut check = CancelCheck::new(cancel, self.check_interval);
        let mut matches = Vec::new();
        let mut visit = |shard: &PlatformShard| -> ControlFlow<QueryError> {
            for record in plan.candidates(shard) {
                if let Err(e) = check.tick() {
                    return ControlFlow::Break(e);
                }
                if filter.matches(record) {
                    matches.push(Arc::clone(record));
                }
            }
            ControlFlow::Continue(())
        };

        let interrupted = match plan.scope {
            ShardScope::Platform(platform_id) => self
                .buffer
                .read_platform(platform_id, &mut visit)
                .and_then(|flow| match flow {
                    ControlFlow::Break(e) => Some(e),
                    ControlFlow::Continue(()) => None,
                }),
            ShardScope::All => self.buffer.read_each(&mut visit),
        };

        if let Some(e) = interrupted {
            info!(plan = %plan, "query cancelled during scan");
            return Err(e);
        }
        debug!(plan = %plan, matched = matches.len(), "scan complete");
        Ok(matches)
    }

    // ========================================================================
    // Detail
    // ========================================================================

    /// The fully hydrated record matching `template`
    ///
    /// Without a template id the most recently inserted match is returned.
    pub fn detail(&self, template: &DetailTemplate) -> Result<SharedInvocation, QueryError> {
        let found = match template.id {
            Some(id) => self
                .buffer
                .get_in_platform(template.platform_id, id)
                .ok()
                .filter(|record| template.matches(record)),
            None => self
                .buffer
                .read_platform(template.platform_id, |shard| {
                    shard
                        .ids_for_method(template.method_id)
                        .rev()
                        .filter_map(|id| shard.get(id))
                        .find(|record| template.matches(record))
                        .cloned()
                })
                .flatten(),
        };

        found.ok_or_else(|| {
            QueryError::NotFound(format!(
                "invocation for platform {} sensor type {} method {}{}",
                template.platform_id,
                template.sensor_type_id,
                template.method_id,
                template
                    .id
                    .map(|id| format!(" id {}", id))
                    .unwrap_or_default()
            ))
        })
    }

    /// Every record of a trace, across all platforms, ascending by id
    ///
    /// An unknown trace yields an empty list.
    pub fn detail_by_trace(&self, trace_id: TraceId) -> Result<Vec<SharedInvocation>, QueryError> {
        self.detail_by_trace_cancellable(trace_id, &CancellationToken::new())
    }

    /// [`detail_by_trace`](Self::detail_by_trace) with a cancellation token
    pub fn detail_by_trace_cancellable(
        &self,
        trace_id: TraceId,
        cancel: &CancellationToken,
    ) -> Result<Vec<SharedInvocation>, QueryError> {
        let mut records = self.scan(&OverviewFilter::any().trace(trace_id), cancel)?;
        records.sort_unstable_by_key(|record| record.id);
        Ok(records)
    }
}
