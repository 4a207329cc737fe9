//! Detail Tests
//!
//! Tests for single-record and per-trace lookups:
//! - Template matching and full hydration of nested children
//! - Trace lookups across platforms
//! - Eviction yields NotFound, never a partial record
//! - In-place updates of non-indexed fields
//! - Detail lists and buffer clearing

use crate::*;
use invoscope::prelude::*;

fn call_tree() -> InvocationSequence {
    record(1, 100, 0)
        .with_child(
            record(1, 101, 1)
                .with_child(record(1, 102, 2))
                .with_child(record(1, 103, 3)),
        )
        .with_child(record(1, 104, 4))
}

// =============================================================================
// Template Lookups
// =============================================================================

#[test]
fn test_detail_is_fully_hydrated() {
    let collector = create_collector();
    let id = collector.insert(call_tree());

    let detail = collector
        .detail(&DetailTemplate::new(1, 1, 100).with_id(id))
        .unwrap();
    assert_eq!(detail.id, id);
    assert_eq!(detail.child_count, 4);

    let methods: Vec<_> = detail.iter_preorder().map(|r| r.method_id).collect();
    assert_eq!(methods, vec![100, 101, 102, 103, 104]);
}

#[test]
fn test_detail_without_id_returns_latest_match() {
    let collector = create_collector();
    collector.insert(record(1, 100, 500));
    let latest = collector.insert(record(1, 100, 100));

    let detail = collector.detail(&DetailTemplate::new(1, 1, 100)).unwrap();
    assert_eq!(detail.id, latest);
}

#[test]
fn test_detail_template_must_match_exactly() {
    let collector = create_collector();
    let id = collector.insert(record(1, 100, 0));

    for template in [
        DetailTemplate::new(2, 1, 100).with_id(id),
        DetailTemplate::new(1, 2, 100).with_id(id),
        DetailTemplate::new(1, 1, 101).with_id(id),
        DetailTemplate::new(1, 1, 100).with_id(id + 1),
    ] {
        assert!(collector.detail(&template).unwrap_err().is_not_found());
    }
}

#[test]
fn test_detail_of_evicted_record_is_not_found() {
    let collector = create_bounded_collector(2);
    let first = collector.insert(call_tree());
    let template = DetailTemplate::new(1, 1, 100).with_id(first);
    assert!(collector.detail(&template).is_ok());

    collector.insert(record(1, 100, 10));
    collector.insert(record(1, 100, 20));

    let err = collector.detail(&template).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(collector.buffer().platform_len(1), 2);
}

// =============================================================================
// Trace Lookups
// =============================================================================

#[test]
fn test_detail_by_trace_exact_set() {
    let collector = create_collector();
    let a = collector.insert(record(1, 1, 10).with_trace_id(42));
    let b = collector.insert(record(2, 1, 20).with_trace_id(42));
    let c = collector.insert(record(3, 2, 5).with_trace_id(42));
    collector.insert(record(1, 1, 10).with_trace_id(43));
    collector.insert(record(2, 1, 10));

    let mut ids: Vec<_> = collector
        .detail_by_trace(42)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![a, b, c]);
}

#[test]
fn test_detail_by_unknown_trace_is_empty() {
    let collector = create_collector();
    collector.insert(record(1, 1, 10).with_trace_id(42));
    assert!(collector.detail_by_trace(9_999).unwrap().is_empty());
}

#[test]
fn test_detail_by_trace_keeps_child_order() {
    let collector = create_collector();
    collector.insert(call_tree().with_trace_id(5));
    let records = collector.detail_by_trace(5).unwrap();
    let children: Vec<_> = records[0]
        .nested_sequences
        .iter()
        .map(|c| c.method_id)
        .collect();
    assert_eq!(children, vec![101, 104]);
}

// =============================================================================
// In-Place Updates
// =============================================================================

#[test]
fn test_attach_late_span_reference() {
    let collector = create_collector();
    let id = collector.insert(record(1, 1, 10).with_trace_id(42));
    let before = collector.detail(&DetailTemplate::new(1, 1, 1).with_id(id)).unwrap();

    collector
        .update_in_place(id, |fields| {
            *fields.span_ident = Some(SpanIdent::root(42, 7));
        })
        .unwrap();

    let after = collector.detail(&DetailTemplate::new(1, 1, 1).with_id(id)).unwrap();
    assert_eq!(after.span_ident, Some(SpanIdent::root(42, 7)));
    assert!(before.span_ident.is_none(), "earlier handles are unchanged");

    // Indices still see the record under its original keys
    assert_eq!(collector.detail_by_trace(42).unwrap().len(), 1);
}

#[test]
fn test_update_of_missing_record() {
    let collector = create_collector();
    let err = collector.update_in_place(12, |_| {}).unwrap_err();
    assert!(err.is_not_found());
}

// =============================================================================
// Detail Lists and Clearing
// =============================================================================

#[test]
fn test_detail_list_returns_full_records() {
    let collector = create_collector();
    collector.insert(call_tree());
    collector.insert(record(1, 100, 50));
    collector.insert(record(1, 200, 60));
    collector.insert(record(2, 100, 70));

    let list = collector
        .detail_list(1, Some(100), None, None, None, None)
        .unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].timestamp, ts(50));
    assert_eq!(list[1].nested_sequences.len(), 2);

    let windowed = collector
        .detail_list(1, None, Some(10), Some(ts(55)), None, None)
        .unwrap();
    assert_eq!(windowed.len(), 1);
    assert_eq!(windowed[0].method_id, 200);
}

#[test]
fn test_clear_buffer_removes_everything() {
    let collector = create_collector();
    let id = collector.insert(record(1, 1, 10).with_trace_id(3));
    collector.insert(record(2, 1, 10));
    collector.clear_buffer();

    assert!(collector.overview(&OverviewFilter::any(), None, None).unwrap().is_empty());
    assert!(collector.detail(&DetailTemplate::new(1, 1, 1).with_id(id)).is_err());
    assert!(collector.detail_by_trace(3).unwrap().is_empty());

    // Ids keep ascending after a clear
    assert!(collector.insert(record(1, 1, 10)) > id);
}

// =============================================================================
// Deep Call Trees
// =============================================================================

fn deep_chain(depth: u64) -> InvocationSequence {
    let mut node = record(1, 0, 0);
    for level in 1..depth {
        node = record(1, level, level as i64).with_child(node);
    }
    node
}

#[test]
fn test_deep_record_survives_queries_and_eviction() {
    let collector = create_bounded_collector(1);
    let deep = collector.insert(deep_chain(200_000));

    let rows = collector.overview(&OverviewFilter::platform(1), None, None).unwrap();
    assert_eq!(row_ids(&rows), vec![deep]);
    assert_eq!(rows[0].child_count, 199_999);

    let next = collector.insert(record(1, 1, 1));
    let template = DetailTemplate::new(1, 1, 199_999).with_id(deep);
    assert!(collector.detail(&template).unwrap_err().is_not_found());
    assert_eq!(row_ids(&collector.overview(&OverviewFilter::any(), None, None).unwrap()), vec![next]);
}

#[test]
fn test_update_deep_record_while_reader_holds_it() {
    let collector = create_collector();
    let id = collector.insert(deep_chain(200_000).with_trace_id(77));
    let template = DetailTemplate::new(1, 1, 199_999).with_id(id);
    let held = collector.detail(&template).unwrap();

    collector
        .update_in_place(id, |fields| {
            *fields.span_ident = Some(SpanIdent::root(77, 1));
        })
        .unwrap();

    assert!(held.span_ident.is_none());
    let updated = collector.detail(&template).unwrap();
    assert_eq!(updated.span_ident, Some(SpanIdent::root(77, 1)));
    assert_eq!(updated.iter_preorder().count(), 200_000);

    collector.clear_buffer();
    assert_eq!(held.iter_preorder().count(), 200_000);
}
