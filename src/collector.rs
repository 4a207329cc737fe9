//! Main collector entry point.
//!
//! This module provides the [`Collector`] struct, which owns the trace
//! buffer, the sensor type registrations and the query engine, and the
//! [`CollectorBuilder`] used to configure it.

use crate::config::CollectorConfig;
use crate::error::{Error, Result};
use crate::service::CollectorService;
use invoscope_core::{
    ComparatorRegistry, DetailTemplate, InvocationId, InvocationSequence, InvocationSummary,
    MethodId, NonIndexedFields, OverviewFilter, PlatformId, ResultComparator, SensorTypeConfig,
    SensorTypeId, SortDirection, Timestamp, TraceId,
};
use invoscope_engine::{
    CancellationToken, InvocationTree, QueryEngine, SpanLookup, TraceCorrelator,
};
use invoscope_registry::RegistrationTable;
use invoscope_remote::RemoteCallGateway;
use invoscope_storage::{SharedInvocation, TraceBuffer};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The invocation sequence collector.
///
/// Create one with [`Collector::new`] or [`Collector::builder`]. All methods
/// take `&self`; share a collector across threads with an `Arc`.
///
/// # Example
///
/// ```
/// use invoscope::prelude::*;
///
/// let collector = Collector::new();
/// let sensor = collector.register_sensor_type(1, &SensorTypeConfig::new("com.foo.Bar", ["int"]));
/// collector.insert(InvocationSequence::new(1, 10, sensor, Timestamp::from_millis(1_000)));
///
/// let rows = collector.overview(&OverviewFilter::platform(1), None, None)?;
/// assert_eq!(rows.len(), 1);
/// # Ok::<(), invoscope::Error>(())
/// ```
pub struct Collector {
    config: CollectorConfig,
    buffer: Arc<TraceBuffer>,
    registrations: Arc<RegistrationTable>,
    engine: QueryEngine,
    comparators: ComparatorRegistry,
    correlator: TraceCorrelator,
}

impl Collector {
    /// Create a collector with default settings.
    pub fn new() -> Self {
        Self::assemble(
            CollectorConfig::default(),
            ComparatorRegistry::default(),
            TraceCorrelator::new(),
        )
    }

    /// Create a builder for collector configuration.
    pub fn builder() -> CollectorBuilder {
        CollectorBuilder::new()
    }

    /// Create a collector from a validated configuration.
    pub fn from_config(config: CollectorConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    fn assemble(
        config: CollectorConfig,
        comparators: ComparatorRegistry,
        correlator: TraceCorrelator,
    ) -> Self {
        let buffer = Arc::new(TraceBuffer::with_capacity(config.buffer_capacity_per_platform));
        let engine = QueryEngine::new(Arc::clone(&buffer))
            .with_check_interval(config.cancellation_check_interval);
        Self {
            config,
            buffer,
            registrations: Arc::new(RegistrationTable::new()),
            engine,
            comparators,
            correlator,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Shared trace buffer.
    pub fn buffer(&self) -> &Arc<TraceBuffer> {
        &self.buffer
    }

    /// Sensor type registrations.
    pub fn registrations(&self) -> &Arc<RegistrationTable> {
        &self.registrations
    }

    /// Query engine over the buffer.
    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    /// Comparators selectable by field name.
    pub fn comparators(&self) -> &ComparatorRegistry {
        &self.comparators
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a sensor type for a platform (idempotent).
    pub fn register_sensor_type(
        &self,
        platform_id: PlatformId,
        signature: &SensorTypeConfig,
    ) -> SensorTypeId {
        self.registrations.register(platform_id, signature)
    }

    /// Loopback service answering remote requests from this collector.
    pub fn service(&self) -> CollectorService {
        CollectorService::new(Arc::clone(&self.registrations))
    }

    /// Gateway configured with this collector's remote timeout.
    pub fn gateway(&self) -> RemoteCallGateway {
        RemoteCallGateway::new(self.config.remote_timeout())
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Store a record, returning its assigned id.
    pub fn insert(&self, record: InvocationSequence) -> InvocationId {
        self.buffer.insert(record)
    }

    /// Update the non-indexed fields of a stored record.
    pub fn update_in_place<F>(&self, id: InvocationId, mutator: F) -> Result<()>
    where
        F: FnOnce(NonIndexedFields<'_>),
    {
        self.buffer.update_in_place(id, mutator).map_err(Error::from)
    }

    /// Drop every buffered record.
    pub fn clear_buffer(&self) {
        self.buffer.clear();
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Comparator for a registered field name.
    pub fn comparator(&self, field: &str, direction: SortDirection) -> Result<ResultComparator> {
        self.comparators
            .get(field, direction)
            .ok_or_else(|| Error::InvalidFilter(format!("unknown sort field '{}'", field)))
    }

    /// Overview summaries; `limit` defaults to the configured overview limit.
    pub fn overview(
        &self,
        filter: &OverviewFilter,
        limit: Option<usize>,
        comparator: Option<&ResultComparator>,
    ) -> Result<Vec<InvocationSummary>> {
        self.overview_cancellable(filter, limit, comparator, &CancellationToken::new())
    }

    /// [`overview`](Self::overview) with a cancellation token.
    pub fn overview_cancellable(
        &self,
        filter: &OverviewFilter,
        limit: Option<usize>,
        comparator: Option<&ResultComparator>,
        cancel: &CancellationToken,
    ) -> Result<Vec<InvocationSummary>> {
        let limit = limit.unwrap_or(self.config.default_overview_limit);
        Ok(self
            .engine
            .overview_cancellable(filter, limit, comparator, cancel)?)
    }

    /// Full records of a platform (and optionally a method and time range).
    pub fn detail_list(
        &self,
        platform_id: PlatformId,
        method_id: Option<MethodId>,
        limit: Option<usize>,
        from: Option<Timestamp>,
        to: Option<Timestamp>,
        comparator: Option<&ResultComparator>,
    ) -> Result<Vec<SharedInvocation>> {
        let limit = limit.unwrap_or(self.config.default_overview_limit);
        Ok(self.engine.detail_list(
            platform_id,
            method_id,
            limit,
            from,
            to,
            comparator,
            &CancellationToken::new(),
        )?)
    }

    /// Fully hydrated record matching a template.
    pub fn detail(&self, template: &DetailTemplate) -> Result<SharedInvocation> {
        Ok(self.engine.detail(template)?)
    }

    /// Every record of a trace (possibly none).
    pub fn detail_by_trace(&self, trace_id: TraceId) -> Result<Vec<SharedInvocation>> {
        Ok(self.engine.detail_by_trace(trace_id)?)
    }

    /// Presentation tree of one record's call structure.
    pub fn invocation_tree(&self, template: &DetailTemplate) -> Result<InvocationTree> {
        let record = self.detail(template)?;
        Ok(self.correlator.single(&record))
    }

    /// Presentation forest of all records of a trace.
    pub fn trace_tree(&self, trace_id: TraceId) -> Result<InvocationTree> {
        let records = self.detail_by_trace(trace_id)?;
        Ok(self.correlator.aggregate(records.iter().map(Arc::as_ref)))
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("config", &self.config)
            .field("buffer", &self.buffer)
            .field("registrations", &self.registrations)
            .finish()
    }
}

/// Builder for collector configuration.
///
/// # Example
///
/// ```
/// use invoscope::prelude::*;
///
/// let collector = Collector::builder()
///     .buffer_capacity_per_platform(10_000)
///     .default_overview_limit(100)
///     .build()?;
/// assert_eq!(collector.config().default_overview_limit, 100);
/// # Ok::<(), invoscope::Error>(())
/// ```
#[derive(Default)]
pub struct CollectorBuilder {
    config: CollectorConfig,
    comparators: Vec<ResultComparator>,
    span_lookup: Option<Arc<dyn SpanLookup>>,
}

impl CollectorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Records retained per platform.
    pub fn buffer_capacity_per_platform(mut self, capacity: usize) -> Self {
        self.config.buffer_capacity_per_platform = capacity;
        self
    }

    /// Overview limit used when none is given.
    pub fn default_overview_limit(mut self, limit: usize) -> Self {
        self.config.default_overview_limit = limit;
        self
    }

    /// Records scanned between cancellation polls.
    pub fn cancellation_check_interval(mut self, interval: usize) -> Self {
        self.config.cancellation_check_interval = interval;
        self
    }

    /// Timeout of remote operations.
    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.config.remote_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Register an additional sortable field.
    pub fn comparator(mut self, comparator: ResultComparator) -> Self {
        self.comparators.push(comparator);
        self
    }

    /// Attach span details to correlated trees.
    pub fn span_lookup(mut self, lookup: Arc<dyn SpanLookup>) -> Self {
        self.span_lookup = Some(lookup);
        self
    }

    /// Validate the configuration and create the collector.
    pub fn build(self) -> Result<Collector> {
        self.config.validate()?;

        let mut comparators = ComparatorRegistry::default();
        for comparator in self.comparators {
            comparators.register(comparator);
        }
        let correlator = match self.span_lookup {
            Some(lookup) => TraceCorrelator::new().with_span_lookup(lookup),
            None => TraceCorrelator::new(),
        };

        info!(
            capacity = self.config.buffer_capacity_per_platform,
            overview_limit = self.config.default_overview_limit,
            "collector initialized"
        );
        Ok(Collector::assemble(self.config, comparators, correlator))
    }
}
