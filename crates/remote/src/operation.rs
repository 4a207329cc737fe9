//! Remote operations: bound request plus response decoder
//!
//! Adding a remote call means adding a [`RemoteRequest`] variant, its
//! response variant and a constructor returning a [`RemoteOperation`].

use invoscope_core::{GatewayError, PlatformId, SensorTypeConfig, SensorTypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request payload sent to the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RemoteRequest {
    /// Register a method sensor type for a platform
    RegisterSensorType {
        /// Registering platform
        platform_id: PlatformId,
        /// Fully-qualified sensor class name
        class_name: String,
        /// Ordered parameter type names
        parameters: Vec<String>,
    },
}

impl RemoteRequest {
    /// Operation name for logging
    pub fn name(&self) -> &'static str {
        match self {
            RemoteRequest::RegisterSensorType { .. } => "register_sensor_type",
        }
    }
}

/// Response payload returned by the collector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RemoteResponse {
    /// Id of a registered sensor type
    SensorTypeId {
        /// Assigned id
        id: SensorTypeId,
    },
    /// The collector raised an application error
    Fault {
        /// Diagnostic text supplied by the collector
        message: String,
    },
}

/// One remote call with its inputs bound
pub struct RemoteOperation<T> {
    request: RemoteRequest,
    decode: fn(RemoteResponse) -> Result<T, GatewayError>,
}

impl<T> RemoteOperation<T> {
    /// Bind a request to its response decoder
    pub fn new(request: RemoteRequest, decode: fn(RemoteResponse) -> Result<T, GatewayError>) -> Self {
        Self { request, decode }
    }

    /// Request payload
    pub fn request(&self) -> &RemoteRequest {
        &self.request
    }

    /// Operation name
    pub fn name(&self) -> &'static str {
        self.request.name()
    }

    /// Decode the collector's response
    pub fn decode(&self, response: RemoteResponse) -> Result<T, GatewayError> {
        (self.decode)(response)
    }
}

impl<T> fmt::Debug for RemoteOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteOperation")
            .field("request", &self.request)
            .finish()
    }
}

fn unexpected(response: RemoteResponse) -> GatewayError {
    match response {
        RemoteResponse::Fault { message } => GatewayError::RemoteFault(message),
        other => GatewayError::RemoteFault(format!("unexpected response: {:?}", other)),
    }
}

fn decode_sensor_type_id(response: RemoteResponse) -> Result<SensorTypeId, GatewayError> {
    match response {
        RemoteResponse::SensorTypeId { id } => Ok(id),
        other => Err(unexpected(other)),
    }
}

/// Register a method sensor type; resolves to the assigned sensor type id
pub fn register_sensor_type(
    platform_id: PlatformId,
    signature: &SensorTypeConfig,
) -> RemoteOperation<SensorTypeId> {
    RemoteOperation::new(
        RemoteRequest::RegisterSensorType {
            platform_id,
            class_name: signature.class_name.clone(),
            parameters: signature.parameters.clone(),
        },
        decode_sensor_type_id,
    )
}
