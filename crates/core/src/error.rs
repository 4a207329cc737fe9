//! Error types for the collector core
//!
//! Each layer reports a typed outcome and never retries on its own:
//!
//! | Error | Raised by | Caller action |
//! |-------|-----------|---------------|
//! | `GatewayError::Connection` | remote gateway | retry / reconnect |
//! | `GatewayError::Timeout` | remote gateway | retry |
//! | `GatewayError::RemoteFault` | remote gateway | inspect diagnostic |
//! | `QueryError::InvalidFilter` | query engine, before any scan | fix input |
//! | `QueryError::NotFound` | single-record lookups | none (valid outcome) |
//! | `QueryError::Cancelled` | query engine | none |
//! | `StorageError::NotFound` | trace buffer | none (valid outcome) |

use crate::types::{InvocationId, Timestamp};
use std::time::Duration;
use thiserror::Error;

/// Failures of a single remote call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport unreachable or connection dropped
    #[error("connection error: {0}")]
    Connection(String),

    /// No answer within the caller-supplied timeout
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// The collector raised an application error
    #[error("remote fault: {0}")]
    RemoteFault(String),
}

impl GatewayError {
    /// All gateway failures may succeed when the caller retries
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Failures of trace buffer operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// No record with this id is held (never inserted, or evicted)
    #[error("invocation {0} not found")]
    NotFound(InvocationId),
}

/// Failures of query execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Filter rejected before execution
    #[error("invalid filter: {reason}")]
    InvalidFilter {
        /// Why the filter was rejected
        reason: String,
    },

    /// Nothing matched a single-record lookup
    #[error("not found: {0}")]
    NotFound(String),

    /// Cooperative cancellation observed during execution
    #[error("query cancelled")]
    Cancelled,
}

impl QueryError {
    /// Rejection for a time range whose start lies after its end
    pub fn inverted_range(from: Timestamp, to: Timestamp) -> Self {
        QueryError::InvalidFilter {
            reason: format!("time range start {} is after end {}", from, to),
        }
    }

    /// Check if this is a not-found outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NotFound(_))
    }
}

impl From<StorageError> for QueryError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => QueryError::NotFound(format!("invocation {}", id)),
        }
    }
}
