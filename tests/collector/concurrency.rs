//! Concurrency Tests
//!
//! Tests for thread safety of the shared collector:
//! - Concurrent ingestion on many platforms
//! - Queries racing ingestion and eviction
//! - Detail lookups racing eviction of their target
//! - Concurrent registration of one signature

use crate::*;
use invoscope::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

// =============================================================================
// Ingestion
// =============================================================================

#[test]
fn test_concurrent_ingestion_assigns_unique_ids() {
    let collector = Arc::new(create_collector());
    let num_threads = 8;
    let per_thread = 250;

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let collector = Arc::clone(&collector);
            thread::spawn(move || {
                (0..per_thread)
                    .map(|i| collector.insert(record(1 + t % 3, 1, i)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert_eq!(collector.buffer().len(), total);
}

// =============================================================================
// Queries During Writes
// =============================================================================

#[test]
fn test_overview_during_ingestion_and_eviction() {
    let collector = Arc::new(create_bounded_collector(100));
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let collector = Arc::clone(&collector);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 0..5_000u64 {
                collector.insert(record(1, i % 4, i as i64).with_trace_id(i % 10));
            }
            done.store(true, Ordering::Release);
        })
    };

    let reader = {
        let collector = Arc::clone(&collector);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let filter = OverviewFilter::method(1, 2);
            while !done.load(Ordering::Acquire) {
                let rows = collector.overview(&filter, Some(1_000), None).unwrap();
                assert!(rows.len() <= 100);
                for pair in rows.windows(2) {
                    assert!(pair[0].timestamp >= pair[1].timestamp);
                }
                for row in &rows {
                    assert_eq!(row.method_id, 2);
                    assert_eq!(row.platform_id, 1);
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(collector.buffer().platform_len(1), 100);
}

#[test]
fn test_detail_racing_eviction_is_whole_or_not_found() {
    let collector = Arc::new(create_bounded_collector(16));
    let tree = || {
        record(1, 1, 0)
            .with_child(record(1, 2, 1).with_child(record(1, 3, 2)))
            .with_child(record(1, 4, 3))
    };
    let target = collector.insert(tree());
    let template = DetailTemplate::new(1, 1, 1).with_id(target);

    let writer = {
        let collector = Arc::clone(&collector);
        thread::spawn(move || {
            for _ in 0..2_000 {
                collector.insert(record(1, 9, 0));
            }
        })
    };

    for _ in 0..2_000 {
        match collector.detail(&template) {
            Ok(detail) => {
                assert_eq!(detail.child_count, 3);
                assert_eq!(detail.iter_preorder().count(), 4);
            }
            Err(e) => assert!(e.is_not_found()),
        }
    }
    writer.join().unwrap();
    assert!(collector.detail(&template).unwrap_err().is_not_found());
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_concurrent_same_signature_registration() {
    let collector = Arc::new(create_collector());
    let barrier = Arc::new(Barrier::new(16));
    let signature = SensorTypeConfig::new("com.foo.Bar", ["int", "string"]);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let collector = Arc::clone(&collector);
            let barrier = Arc::clone(&barrier);
            let signature = signature.clone();
            thread::spawn(move || {
                barrier.wait();
                collector.register_sensor_type(7, &signature)
            })
        })
        .collect();

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(ids.iter().all(|&id| id == ids[0]));
    assert_eq!(collector.registrations().platform_entries(7).len(), 1);
}
