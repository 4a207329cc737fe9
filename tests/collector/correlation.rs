//! Correlation Tests
//!
//! Tests for presentation trees built from stored records:
//! - Single-record call trees
//! - Cross-platform trace forests
//! - Lazily attached span details

use crate::*;
use invoscope::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct StaticSpans {
    calls: AtomicUsize,
}

impl SpanLookup for StaticSpans {
    fn lookup(&self, trace_id: u64, span_id: u64) -> Option<SpanDetails> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(SpanDetails {
            trace_id,
            span_id,
            operation: format!("span-{}", span_id),
            duration_ms: Some(1.5),
            tags: vec![("http.method".into(), "GET".into())],
        })
    }
}

fn methods_with_depth(tree: &InvocationTree) -> Vec<(u64, usize)> {
    tree.iter_preorder()
        .map(|(id, depth)| (tree.node(id).unwrap().record.method_id, depth))
        .collect()
}

#[test]
fn test_invocation_tree_of_stored_record() {
    let collector = create_collector();
    let id = collector.insert(
        record(1, 1, 0)
            .with_child(record(1, 2, 1).with_child(record(1, 3, 2)))
            .with_child(record(1, 4, 3)),
    );

    let tree = collector
        .invocation_tree(&DetailTemplate::new(1, 1, 1).with_id(id))
        .unwrap();
    assert_eq!(tree.len(), 4);
    assert_eq!(methods_with_depth(&tree), vec![(1, 0), (2, 1), (3, 2), (4, 1)]);
}

#[test]
fn test_invocation_tree_not_found() {
    let collector = create_collector();
    let err = collector
        .invocation_tree(&DetailTemplate::new(1, 1, 1))
        .unwrap_err();
    assert!(err.is_not_found());
}

/// Front end on platform 1 calls a back end on platform 2
#[test]
fn test_trace_tree_links_platforms() {
    let collector = create_collector();
    collector.insert(
        record(1, 10, 0)
            .with_span(SpanIdent::root(99, 1))
            .with_child(record(1, 11, 1).with_span(SpanIdent::child_of(99, 2, 1))),
    );
    collector.insert(record(2, 20, 5).with_span(SpanIdent::child_of(99, 3, 2)));
    collector.insert(record(3, 30, 6).with_trace_id(99));

    let tree = collector.trace_tree(99).unwrap();
    assert_eq!(tree.roots().len(), 2, "unlinked record stays a root");
    assert_eq!(
        methods_with_depth(&tree),
        vec![(10, 0), (11, 1), (20, 2), (30, 0)]
    );
}

#[test]
fn test_trace_tree_of_unknown_trace_is_empty() {
    let collector = create_collector();
    assert!(collector.trace_tree(1).unwrap().is_empty());
}

#[test]
fn test_span_details_attached_lazily() {
    let spans = Arc::new(StaticSpans {
        calls: AtomicUsize::new(0),
    });
    let collector = Collector::builder()
        .span_lookup(spans.clone())
        .build()
        .unwrap();
    let id = collector.insert(record(1, 1, 0).with_span(SpanIdent::root(5, 6)));

    let tree = collector
        .invocation_tree(&DetailTemplate::new(1, 1, 1).with_id(id))
        .unwrap();
    assert_eq!(spans.calls.load(Ordering::SeqCst), 0);

    let details = tree.span_details(tree.roots()[0]).unwrap();
    assert_eq!(details.operation, "span-6");
    tree.span_details(tree.roots()[0]);
    assert_eq!(spans.calls.load(Ordering::SeqCst), 1);

    // Presentation data never reaches the stored record
    let stored = collector.detail(&DetailTemplate::new(1, 1, 1).with_id(id)).unwrap();
    assert_eq!(stored.span_ident, Some(SpanIdent::root(5, 6)));
}
