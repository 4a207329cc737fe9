//! Registration Tests
//!
//! Tests for sensor type registration:
//! - Local idempotent registration
//! - Registration through the remote call gateway and loopback service
//! - Typed gateway failures for unreachable and faulting services

use crate::*;
use invoscope::prelude::*;
use invoscope_remote::{RemoteRequest, RemoteResponse, TransportError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn bar() -> SensorTypeConfig {
    SensorTypeConfig::new("com.foo.Bar", ["int", "string"])
}

/// Service whose transport is down
struct Unreachable;

impl ServiceRef for Unreachable {
    fn invoke(
        &self,
        _request: &RemoteRequest,
        _timeout: Duration,
    ) -> std::result::Result<RemoteResponse, TransportError> {
        Err(TransportError::Unreachable("connection refused".into()))
    }
}

// =============================================================================
// Local Registration
// =============================================================================

#[test]
fn test_register_is_idempotent() {
    let collector = create_collector();
    let a = collector.register_sensor_type(7, &bar());
    let b = collector.register_sensor_type(7, &bar());
    assert_eq!(a, b);
    assert_eq!(collector.registrations().len(), 1);
}

#[test]
fn test_distinct_signatures_get_distinct_ids() {
    let collector = create_collector();
    let a = collector.register_sensor_type(7, &bar());
    let b = collector.register_sensor_type(7, &SensorTypeConfig::new("com.foo.Bar", ["int"]));
    let c = collector.register_sensor_type(8, &bar());
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_eq!(collector.registrations().platform_entries(7).len(), 2);
}

#[test]
fn test_platform_teardown_drops_entries() {
    let collector = create_collector();
    collector.register_sensor_type(7, &bar());
    collector.register_sensor_type(7, &SensorTypeConfig::new("com.foo.Baz", ["long"]));
    assert_eq!(collector.registrations().drop_platform(7), 2);
    assert!(collector.registrations().lookup(7, &bar()).is_none());
}

// =============================================================================
// Gateway Registration
// =============================================================================

#[test]
fn test_register_through_gateway() {
    let collector = create_collector();
    let service = collector.service();

    let remote = collector
        .gateway()
        .register_sensor_type(&service, 7, &bar())
        .unwrap();
    let local = collector.register_sensor_type(7, &bar());
    assert_eq!(remote, local);
}

/// Two agents racing the same registration through the gateway
#[test]
fn test_concurrent_gateway_registration_converges() {
    let collector = Arc::new(create_collector());

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let collector = Arc::clone(&collector);
            thread::spawn(move || {
                let service = collector.service();
                collector
                    .gateway()
                    .register_sensor_type(&service, 7, &bar())
                    .unwrap()
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids[0], ids[1]);

    let entries = collector.registrations().platform_entries(7);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0.class_name, "com.foo.Bar");
}

#[test]
fn test_remote_fault_is_reported() {
    let collector = create_collector();
    let service = collector.service();
    let err = collector
        .gateway()
        .register_sensor_type(&service, 7, &SensorTypeConfig::new("  ", ["int"]))
        .unwrap_err();

    let err = Error::from(err);
    assert!(matches!(err, Error::RemoteFault(ref msg) if msg.contains("class name")));
    assert!(err.is_retryable());
    assert!(collector.registrations().is_empty());
}

#[test]
fn test_unreachable_service_is_connection_error() {
    let collector = create_collector();
    let err = collector
        .gateway()
        .register_sensor_type(&Unreachable, 7, &bar())
        .unwrap_err();
    assert!(matches!(Error::from(err), Error::Connection(_)));
}
