//! Invocation sequence records
//!
//! An [`InvocationSequence`] is one measured method invocation together with
//! the invocations it made, nested by ownership. A record tree is acyclic by
//! construction.
//!
//! ## Shared children
//!
//! The child list sits behind an `Arc`, so cloning a record copies one node
//! and shares the subtree. Clone, equality and drop never recurse per level;
//! call-tree depth is workload-controlled.
//!
//! ## Indexed vs. non-indexed fields
//!
//! The trace buffer keys secondary indices on `platform_id`, `method_id`,
//! `trace_id`, `business_transaction_id`, `application_id` and `timestamp`.
//! Those never change after insertion. Late-arriving data (span linkage,
//! timer payloads) is attached through [`NonIndexedFields`], the only view
//! the buffer hands out for in-place updates.

use crate::types::{
    ApplicationId, BusinessTransactionId, InvocationId, MethodId, PlatformId, SensorTypeId,
    SpanIdent, Timestamp, TraceId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Timing payload attached to an invocation
///
/// Exactly one payload kind per invocation; an invocation without any
/// sensor data carries `None` in [`InvocationSequence::timer_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimerData {
    /// Plain method timer
    Timer {
        /// Wall-clock duration in milliseconds
        duration: f64,
        /// CPU duration in milliseconds (if measured)
        cpu_duration: Option<f64>,
    },
    /// HTTP request timer
    Http {
        /// Wall-clock duration in milliseconds
        duration: f64,
        /// Response status code (if captured)
        status_code: Option<u16>,
        /// Request URL (if captured)
        url: Option<String>,
        /// Value of the use-case tagging header (if present)
        tagging_header: Option<String>,
        /// HTTP request method (e.g. "GET")
        request_method: Option<String>,
    },
    /// SQL statement execution
    Sql {
        /// Execution duration in milliseconds
        duration: f64,
        /// Statement text
        statement: String,
        /// Whether this was a prepared statement
        prepared: bool,
    },
    /// Exception marker
    Exception {
        /// Fully-qualified exception type
        class_name: String,
        /// Exception message (if any)
        message: Option<String>,
        /// Lifecycle event that produced the marker (e.g. "CREATED", "PASSED")
        event: String,
    },
}

impl TimerData {
    /// Duration carried by the payload, if it has one
    pub fn duration(&self) -> Option<f64> {
        match self {
            TimerData::Timer { duration, .. }
            | TimerData::Http { duration, .. }
            | TimerData::Sql { duration, .. } => Some(*duration),
            TimerData::Exception { .. } => None,
        }
    }

    /// Stable name of the payload kind
    pub fn kind(&self) -> &'static str {
        match self {
            TimerData::Timer { .. } => "timer",
            TimerData::Http { .. } => "http",
            TimerData::Sql { .. } => "sql",
            TimerData::Exception { .. } => "exception",
        }
    }
}

/// One node of a recorded call tree
#[derive(Clone, Serialize, Deserialize)]
pub struct InvocationSequence {
    /// Buffer-assigned id (0 until inserted)
    pub id: InvocationId,
    /// Platform (agent) that produced the record
    pub platform_id: PlatformId,
    /// Instrumented method
    pub method_id: MethodId,
    /// Sensor type that measured the invocation
    pub sensor_type_id: SensorTypeId,
    /// Start time of the invocation
    pub timestamp: Timestamp,
    /// Self duration in milliseconds
    pub duration: f64,
    /// Total number of nested invocations below this node
    pub child_count: u64,
    /// Direct children in call order, shared between clones
    pub nested_sequences: Arc<Vec<InvocationSequence>>,
    /// Optional timing payload
    pub timer_data: Option<TimerData>,
    /// Application the invocation was mapped to (0 = unknown)
    pub application_id: ApplicationId,
    /// Business transaction the invocation was mapped to (0 = unknown)
    pub business_transaction_id: BusinessTransactionId,
    /// Trace correlation key
    pub trace_id: TraceId,
    /// Span linkage for cross-platform traces
    pub span_ident: Option<SpanIdent>,
}

impl InvocationSequence {
    /// Create a leaf record with no payload and no children
    pub fn new(
        platform_id: PlatformId,
        method_id: MethodId,
        sensor_type_id: SensorTypeId,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: 0,
            platform_id,
            method_id,
            sensor_type_id,
            timestamp,
            duration: 0.0,
            child_count: 0,
            nested_sequences: Arc::default(),
            timer_data: None,
            application_id: 0,
            business_transaction_id: 0,
            trace_id: 0,
            span_ident: None,
        }
    }

    /// Set the self duration
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Set the timing payload
    pub fn with_timer_data(mut self, timer_data: TimerData) -> Self {
        self.timer_data = Some(timer_data);
        self
    }

    /// Set the trace correlation key
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }

    /// Set the span linkage (also sets the trace id from the span)
    pub fn with_span(mut self, span: SpanIdent) -> Self {
        self.trace_id = span.trace_id;
        self.span_ident = Some(span);
        self
    }

    /// Set application and business transaction
    pub fn with_business_context(
        mut self,
        application_id: ApplicationId,
        business_transaction_id: BusinessTransactionId,
    ) -> Self {
        self.application_id = application_id;
        self.business_transaction_id = business_transaction_id;
        self
    }

    /// Append a direct child, keeping `child_count` in sync
    pub fn with_child(mut self, child: InvocationSequence) -> Self {
        self.child_count += 1 + child.child_count;
        Arc::make_mut(&mut self.nested_sequences).push(child);
        self
    }

    /// Duration to display: the payload duration if present, else self duration
    ///
    /// Both are measured separately by the agent and may differ.
    pub fn effective_duration(&self) -> f64 {
        self.timer_data
            .as_ref()
            .and_then(TimerData::duration)
            .unwrap_or(self.duration)
    }

    /// Whether any timing payload is attached
    pub fn has_timer_data(&self) -> bool {
        self.timer_data.is_some()
    }

    /// Whether the payload is an HTTP timer
    pub fn has_http_timer_data(&self) -> bool {
        matches!(self.timer_data, Some(TimerData::Http { .. }))
    }

    /// Whether the payload is a SQL statement
    pub fn has_sql_statement(&self) -> bool {
        matches!(self.timer_data, Some(TimerData::Sql { .. }))
    }

    /// Whether the payload is an exception marker
    pub fn has_exception_data(&self) -> bool {
        matches!(self.timer_data, Some(TimerData::Exception { .. }))
    }

    /// HTTP response status, if this is an HTTP invocation with a status
    pub fn response_status(&self) -> Option<u16> {
        match &self.timer_data {
            Some(TimerData::Http { status_code, .. }) => *status_code,
            _ => None,
        }
    }

    /// HTTP request URL, if captured
    pub fn url(&self) -> Option<&str> {
        match &self.timer_data {
            Some(TimerData::Http { url, .. }) => url.as_deref(),
            _ => None,
        }
    }

    /// Use case taken from the tagging header, if present
    pub fn use_case(&self) -> Option<&str> {
        match &self.timer_data {
            Some(TimerData::Http { tagging_header, .. }) => tagging_header.as_deref(),
            _ => None,
        }
    }

    /// Whether this node or any descendant carries a SQL statement
    pub fn has_nested_sql_statements(&self) -> bool {
        self.any_in_subtree(InvocationSequence::has_sql_statement)
    }

    /// Whether this node or any descendant carries an exception marker
    pub fn has_nested_exceptions(&self) -> bool {
        self.any_in_subtree(InvocationSequence::has_exception_data)
    }

    /// Depth-first preorder iterator over this node and all descendants
    ///
    /// Uses an explicit stack; call-tree depth is workload-controlled.
    pub fn iter_preorder(&self) -> PreorderIter<'_> {
        PreorderIter { stack: vec![self] }
    }

    fn any_in_subtree(&self, predicate: impl Fn(&InvocationSequence) -> bool) -> bool {
        self.iter_preorder().any(predicate)
    }

    /// Copy of this node without its children
    pub fn detached(&self) -> InvocationSequence {
        InvocationSequence {
            nested_sequences: Arc::default(),
            timer_data: self.timer_data.clone(),
            ..*self
        }
    }

    fn same_node(&self, other: &InvocationSequence) -> bool {
        self.id == other.id
            && self.platform_id == other.platform_id
            && self.method_id == other.method_id
            && self.sensor_type_id == other.sensor_type_id
            && self.timestamp == other.timestamp
            && self.duration == other.duration
            && self.child_count == other.child_count
            && self.timer_data == other.timer_data
            && self.application_id == other.application_id
            && self.business_transaction_id == other.business_transaction_id
            && self.trace_id == other.trace_id
            && self.span_ident == other.span_ident
            && self.nested_sequences.len() == other.nested_sequences.len()
    }

    /// Mutable view of the fields that may change after insertion
    pub fn non_indexed_fields(&mut self) -> NonIndexedFields<'_> {
        NonIndexedFields {
            span_ident: &mut self.span_ident,
            timer_data: &mut self.timer_data,
        }
    }
}

impl PartialEq for InvocationSequence {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if !a.same_node(b) {
                return false;
            }
            if !Arc::ptr_eq(&a.nested_sequences, &b.nested_sequences) {
                stack.extend(a.nested_sequences.iter().zip(b.nested_sequences.iter()));
            }
        }
        true
    }
}

impl Drop for InvocationSequence {
    fn drop(&mut self) {
        // Shared child lists are released by their last holder
        let mut stack = match Arc::get_mut(&mut self.nested_sequences) {
            Some(children) if !children.is_empty() => std::mem::take(children),
            _ => return,
        };
        while let Some(mut node) = stack.pop() {
            if let Some(children) = Arc::get_mut(&mut node.nested_sequences) {
                stack.append(children);
            }
        }
    }
}

impl fmt::Debug for InvocationSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationSequence")
            .field("id", &self.id)
            .field("platform_id", &self.platform_id)
            .field("method_id", &self.method_id)
            .field("sensor_type_id", &self.sensor_type_id)
            .field("timestamp", &self.timestamp)
            .field("duration", &self.duration)
            .field("child_count", &self.child_count)
            .field("direct_children", &self.nested_sequences.len())
            .field("timer_data", &self.timer_data)
            .field("application_id", &self.application_id)
            .field("business_transaction_id", &self.business_transaction_id)
            .field("trace_id", &self.trace_id)
            .field("span_ident", &self.span_ident)
            .finish()
    }
}

/// Preorder iterator returned by [`InvocationSequence::iter_preorder`]
#[derive(Debug)]
pub struct PreorderIter<'a> {
    stack: Vec<&'a InvocationSequence>,
}

impl<'a> Iterator for PreorderIter<'a> {
    type Item = &'a InvocationSequence;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reverse push keeps original child order on pop
        self.stack.extend(node.nested_sequences.iter().rev());
        Some(node)
    }
}

/// Mutable access to the non-indexed fields of a stored record
///
/// Handed to in-place update closures. Indexed attributes (platform, method,
/// trace, business context, timestamp, id) are not reachable through it.
#[derive(Debug)]
pub struct NonIndexedFields<'a> {
    /// Span linkage attached after the fact
    pub span_ident: &'a mut Option<SpanIdent>,
    /// Timing payload attached after the fact
    pub timer_data: &'a mut Option<TimerData>,
}

/// Overview row: a record without its children
///
/// Carries the derived nested-data flags so that listing views do not need
/// the subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationSummary {
    /// Buffer-assigned id
    pub id: InvocationId,
    /// Platform (agent) that produced the record
    pub platform_id: PlatformId,
    /// Instrumented method
    pub method_id: MethodId,
    /// Sensor type that measured the invocation
    pub sensor_type_id: SensorTypeId,
    /// Start time of the invocation
    pub timestamp: Timestamp,
    /// Self duration in milliseconds
    pub duration: f64,
    /// Total number of nested invocations
    pub child_count: u64,
    /// Optional timing payload of the root node
    pub timer_data: Option<TimerData>,
    /// Application id (0 = unknown)
    pub application_id: ApplicationId,
    /// Business transaction id (0 = unknown)
    pub business_transaction_id: BusinessTransactionId,
    /// Trace correlation key
    pub trace_id: TraceId,
    /// Span linkage
    pub span_ident: Option<SpanIdent>,
    /// Whether the subtree contains SQL statements
    pub has_nested_sql: bool,
    /// Whether the subtree contains exceptions
    pub has_nested_exceptions: bool,
}

impl From<&InvocationSequence> for InvocationSummary {
    fn from(record: &InvocationSequence) -> Self {
        Self {
            id: record.id,
            platform_id: record.platform_id,
            method_id: record.method_id,
            sensor_type_id: record.sensor_type_id,
            timestamp: record.timestamp,
            duration: record.duration,
            child_count: record.child_count,
            timer_data: record.timer_data.clone(),
            application_id: record.application_id,
            business_transaction_id: record.business_transaction_id,
            trace_id: record.trace_id,
            span_ident: record.span_ident,
            has_nested_sql: record.has_nested_sql_statements(),
            has_nested_exceptions: record.has_nested_exceptions(),
        }
    }
}
