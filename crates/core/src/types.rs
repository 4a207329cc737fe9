//! Core identifier and value types
//!
//! This module defines the fundamental types used throughout the system:
//! - Identifier aliases ([`PlatformId`], [`MethodId`], [`SensorTypeId`], ...)
//! - [`Timestamp`]: millisecond wall-clock time of a measurement
//! - [`SpanIdent`]: cross-platform parent/root linkage of a trace
//! - [`SensorTypeConfig`]: the signature a sensor type is registered under

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a monitored agent/process instance
pub type PlatformId = u64;

/// Identifier of an instrumented method
pub type MethodId = u64;

/// Identifier assigned to a registered sensor type
pub type SensorTypeId = u64;

/// Identifier of an invocation sequence inside the buffer
pub type InvocationId = u64;

/// Correlation key grouping the records of one distributed request
pub type TraceId = u64;

/// Identifier of a single span inside a trace
pub type SpanId = u64;

/// Identifier of a configured application
pub type ApplicationId = u64;

/// Identifier of a business transaction within an application
pub type BusinessTransactionId = u64;

/// Wildcard value for platform, application and business transaction filters
pub const ANY: u64 = 0;

/// Time of a measurement, milliseconds since the Unix epoch
///
/// Stored as a plain integer so that it can key ordered indices directly.
/// Conversions to and from [`chrono::DateTime<Utc>`] are provided for
/// callers that work with calendar time.
///
/// # Examples
///
/// ```
/// use invoscope_core::types::Timestamp;
///
/// let ts = Timestamp::from_millis(1_700_000_000_000);
/// assert_eq!(ts.as_millis(), 1_700_000_000_000);
/// assert_eq!(Timestamp::from_datetime(ts.to_datetime()), ts);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a timestamp from milliseconds since epoch
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Current wall-clock time
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Milliseconds since epoch
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Convert from a UTC calendar time (sub-millisecond precision is dropped)
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Timestamp(dt.timestamp_millis())
    }

    /// Convert to a UTC calendar time
    ///
    /// Values outside chrono's representable range clamp to the epoch.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0)
            .single()
            .unwrap_or_default()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_datetime().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Span identification of a record within a distributed trace
///
/// `parent_span_id` is `None` for the root span of a trace. A record whose
/// parent span belongs to another platform's record is a cross-platform
/// continuation of that record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanIdent {
    /// Trace this span belongs to
    pub trace_id: TraceId,
    /// Identifier of this span
    pub span_id: SpanId,
    /// Identifier of the calling span, if any
    pub parent_span_id: Option<SpanId>,
}

impl SpanIdent {
    /// Create a root span ident
    pub fn root(trace_id: TraceId, span_id: SpanId) -> Self {
        Self {
            trace_id,
            span_id,
            parent_span_id: None,
        }
    }

    /// Create a span ident with a parent
    pub fn child_of(trace_id: TraceId, span_id: SpanId, parent_span_id: SpanId) -> Self {
        Self {
            trace_id,
            span_id,
            parent_span_id: Some(parent_span_id),
        }
    }

    /// Whether this span starts its trace
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }
}

/// Registration signature of a method sensor type
///
/// Two configs are the same signature when both the fully-qualified class
/// name and the ordered parameter type list are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorTypeConfig {
    /// Fully-qualified name of the sensor implementation type
    pub class_name: String,
    /// Ordered parameter type names
    pub parameters: Vec<String>,
}

impl SensorTypeConfig {
    /// Create a new signature
    ///
    /// # Examples
    ///
    /// ```
    /// use invoscope_core::types::SensorTypeConfig;
    ///
    /// let sig = SensorTypeConfig::new("com.foo.Bar", ["int", "string"]);
    /// assert_eq!(sig.parameters, vec!["int", "string"]);
    /// ```
    pub fn new<I, S>(class_name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class_name: class_name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for SensorTypeConfig {
    /// Display as `class_name(param1, param2)`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.class_name, self.parameters.join(", "))
    }
}
