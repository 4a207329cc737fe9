//! Unified error types for invoscope.
//!
//! This module provides one error type that wraps the layer errors of the
//! gateway, buffer, query engine and configuration.

use crate::config::ConfigError;
use invoscope_core::{GatewayError, QueryError, StorageError};
use std::time::Duration;
use thiserror::Error;

/// All invoscope errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Nothing matched a single-record lookup
    #[error("not found: {0}")]
    NotFound(String),

    /// Query input rejected before execution
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Query cancelled by its caller
    #[error("query cancelled")]
    Cancelled,

    /// Remote service unreachable or connection dropped
    #[error("connection error: {0}")]
    Connection(String),

    /// Remote call timed out
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Collector-side application error
    #[error("remote fault: {0}")]
    RemoteFault(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for invoscope operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Remote call failures may succeed when the caller retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Connection(_) | Error::Timeout(_) | Error::RemoteFault(_)
        )
    }

    /// Check if this is a not-found outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<QueryError> for Error {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidFilter { reason } => Error::InvalidFilter(reason),
            QueryError::NotFound(what) => Error::NotFound(what),
            QueryError::Cancelled => Error::Cancelled,
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        QueryError::from(e).into()
    }
}

impl From<GatewayError> for Error {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Connection(msg) => Error::Connection(msg),
            GatewayError::Timeout(after) => Error::Timeout(after),
            GatewayError::RemoteFault(msg) => Error::RemoteFault(msg),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
