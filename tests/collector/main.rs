//! Collector Comprehensive Test Suite
//!
//! Tests organized by functionality:
//! - overview: filter predicates, ordering, limits, comparators
//! - detail: template lookups, trace lookups, eviction, in-place updates
//! - registration: sensor type registration locally and through the gateway
//! - correlation: call trees and cross-platform trace forests
//! - concurrency: ingestion racing queries and registrations
//! - properties: proptest checks of the overview contract
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test collector
//! cargo test --test collector overview::
//! ```

use invoscope::prelude::*;

mod concurrency;
mod correlation;
mod detail;
mod properties;
mod registration;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Route collector logs through the test harness (first call wins)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Collector with default settings
pub fn create_collector() -> Collector {
    init_tracing();
    Collector::new()
}

/// Collector retaining at most `capacity` records per platform
pub fn create_bounded_collector(capacity: usize) -> Collector {
    init_tracing();
    Collector::builder()
        .buffer_capacity_per_platform(capacity)
        .build()
        .expect("valid configuration")
}

/// Timestamp from milliseconds
pub fn ts(ms: i64) -> Timestamp {
    Timestamp::from_millis(ms)
}

/// Leaf record with sensor type 1
pub fn record(platform_id: u64, method_id: u64, ms: i64) -> InvocationSequence {
    InvocationSequence::new(platform_id, method_id, 1, ts(ms))
}

/// Ids of overview rows, in result order
pub fn row_ids(rows: &[InvocationSummary]) -> Vec<u64> {
    rows.iter().map(|row| row.id).collect()
}
