//! Core types for invoscope
//!
//! This crate defines the canonical data model shared by every layer:
//! - [`InvocationSequence`]: nested call-tree records and their summaries
//! - [`OverviewFilter`] / [`DetailTemplate`]: query inputs
//! - [`ResultComparator`] / [`ComparatorRegistry`]: pluggable ordering
//! - Error enums for the gateway, storage and query layers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod comparator;
pub mod error;
pub mod filter;
pub mod record;
pub mod types;

pub use comparator::{fields, ComparatorRegistry, ResultComparator, SortDirection, SortKey};
pub use error::{GatewayError, QueryError, StorageError};
pub use filter::{DetailTemplate, OverviewFilter};
pub use record::{InvocationSequence, InvocationSummary, NonIndexedFields, PreorderIter, TimerData};
pub use types::{
    ApplicationId, BusinessTransactionId, InvocationId, MethodId, PlatformId, SensorTypeConfig,
    SensorTypeId, SpanId, SpanIdent, Timestamp, TraceId, ANY,
};
