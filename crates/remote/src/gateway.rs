//! Single-shot remote call execution

use crate::operation::{register_sensor_type, RemoteOperation};
use crate::transport::{ServiceRef, TransportError};
use invoscope_core::{GatewayError, PlatformId, SensorTypeConfig, SensorTypeId};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes remote operations against a service reference
///
/// Each `execute` is exactly one round trip. The gateway never retries.
#[derive(Debug, Clone, Copy)]
pub struct RemoteCallGateway {
    timeout: Duration,
}

impl RemoteCallGateway {
    /// Gateway with the given per-call timeout
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one operation
    ///
    /// A response arriving after the timeout is discarded and reported as
    /// [`GatewayError::Timeout`].
    pub fn execute<T>(
        &self,
        operation: &RemoteOperation<T>,
        service: &dyn ServiceRef,
    ) -> Result<T, GatewayError> {
        let op = operation.name();
        let started = Instant::now();

        let response = service
            .invoke(operation.request(), self.timeout)
            .map_err(|e| {
                warn!(op, error = %e, "remote call failed");
                match e {
                    TransportError::Unreachable(msg) | TransportError::Dropped(msg) => {
                        GatewayError::Connection(msg)
                    }
                    TransportError::TimedOut => GatewayError::Timeout(self.timeout),
                }
            })?;

        let elapsed = started.elapsed();
        if elapsed > self.timeout {
            warn!(op, elapsed_ms = elapsed.as_millis() as u64, "late response discarded");
            return Err(GatewayError::Timeout(self.timeout));
        }

        let result = operation.decode(response);
        match &result {
            Ok(_) => debug!(op, elapsed_us = elapsed.as_micros() as u64, "remote call completed"),
            Err(e) => warn!(op, error = %e, "remote call rejected"),
        }
        result
    }

    /// Register a method sensor type on the collector
    pub fn register_sensor_type(
        &self,
        service: &dyn ServiceRef,
        platform_id: PlatformId,
        signature: &SensorTypeConfig,
    ) -> Result<SensorTypeId, GatewayError> {
        self.execute(&register_sensor_type(platform_id, signature), service)
    }
}

impl Default for RemoteCallGateway {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}
