//! Agent-side remote calls to the collector
//!
//! A remote call is a [`RemoteOperation`]: the bound request plus the
//! decoder of its response. [`RemoteCallGateway::execute`] performs exactly
//! one round trip through a [`ServiceRef`] and reports a typed
//! [`GatewayError`](invoscope_core::GatewayError) on failure. Retry and
//! reconnect policy belong to the transport, never to the gateway.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod gateway;
pub mod operation;
pub mod transport;

pub use gateway::{RemoteCallGateway, DEFAULT_TIMEOUT};
pub use operation::{register_sensor_type, RemoteOperation, RemoteRequest, RemoteResponse};
pub use transport::{ServiceRef, TransportError};
