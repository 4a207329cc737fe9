//! Transport seam between the gateway and a live collector connection

use crate::operation::{RemoteRequest, RemoteResponse};
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The service could not be reached
    #[error("service unreachable: {0}")]
    Unreachable(String),

    /// The connection dropped mid-call
    #[error("connection dropped: {0}")]
    Dropped(String),

    /// No response within the deadline
    #[error("no response within deadline")]
    TimedOut,
}

/// Live reference to a collector service
///
/// Supplied by a connection provider, which owns reconnect policy.
pub trait ServiceRef: Send + Sync {
    /// Perform one request/response round trip, waiting at most `timeout`
    fn invoke(
        &self,
        request: &RemoteRequest,
        timeout: Duration,
    ) -> Result<RemoteResponse, TransportError>;
}

impl<S: ServiceRef + ?Sized> ServiceRef for std::sync::Arc<S> {
    fn invoke(
        &self,
        request: &RemoteRequest,
        timeout: Duration,
    ) -> Result<RemoteResponse, TransportError> {
        (**self).invoke(request, timeout)
    }
}
