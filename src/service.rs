//! In-process collector endpoint.
//!
//! [`CollectorService`] answers remote requests directly from the
//! collector's registration table. It is the loopback [`ServiceRef`] used
//! when agent and collector share a process.

use invoscope_core::SensorTypeConfig;
use invoscope_registry::RegistrationTable;
use invoscope_remote::{RemoteRequest, RemoteResponse, ServiceRef, TransportError};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Loopback service backed by a [`RegistrationTable`].
#[derive(Debug, Clone)]
pub struct CollectorService {
    registrations: Arc<RegistrationTable>,
}

impl CollectorService {
    pub(crate) fn new(registrations: Arc<RegistrationTable>) -> Self {
        Self { registrations }
    }

    fn handle(&self, request: &RemoteRequest) -> RemoteResponse {
        match request {
            RemoteRequest::RegisterSensorType {
                platform_id,
                class_name,
                parameters,
            } => {
                if class_name.trim().is_empty() {
                    warn!(platform_id, "rejected sensor type without class name");
                    return RemoteResponse::Fault {
                        message: "sensor type class name must not be empty".into(),
                    };
                }
                let signature = SensorTypeConfig::new(class_name.as_str(), parameters.iter().cloned());
                RemoteResponse::SensorTypeId {
                    id: self.registrations.register(*platform_id, &signature),
                }
            }
        }
    }
}

impl ServiceRef for CollectorService {
    fn invoke(
        &self,
        request: &RemoteRequest,
        _timeout: Duration,
    ) -> Result<RemoteResponse, TransportError> {
        Ok(self.handle(request))
    }
}
