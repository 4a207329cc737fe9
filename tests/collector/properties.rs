//! Property Tests
//!
//! proptest checks of the overview and trace lookup contract over random
//! record sets and filters.

use crate::*;
use invoscope::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct RecordShape {
    platform_id: u64,
    method_id: u64,
    ms: i64,
    duration: f64,
    application_id: u64,
    business_transaction_id: u64,
    trace_id: u64,
}

fn shape_strategy() -> impl Strategy<Value = RecordShape> {
    (1u64..4, 1u64..5, 0i64..50, 0u32..20, 0u64..3, 0u64..3, 0u64..4).prop_map(
        |(platform_id, method_id, ms, duration, application_id, business_transaction_id, trace_id)| {
            RecordShape {
                platform_id,
                method_id,
                ms,
                duration: f64::from(duration),
                application_id,
                business_transaction_id,
                trace_id,
            }
        },
    )
}

fn filter_strategy() -> impl Strategy<Value = OverviewFilter> {
    (
        0u64..4,
        proptest::option::of(1u64..5),
        proptest::option::of(0i64..50),
        proptest::option::of(0i64..50),
        0u64..3,
        0u64..3,
    )
        .prop_map(|(platform_id, method_id, from, to, app, bt)| {
            // Inverted ranges are rejected before scanning
            let (from, to) = match (from, to) {
                (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
                other => other,
            };
            let mut filter = OverviewFilter::platform(platform_id)
                .between(from.map(Timestamp::from_millis), to.map(Timestamp::from_millis))
                .business_context(app, bt);
            filter.method_id = method_id;
            filter
        })
}

fn populate(collector: &Collector, shapes: &[RecordShape]) {
    for s in shapes {
        collector.insert(
            InvocationSequence::new(s.platform_id, s.method_id, 1, ts(s.ms))
                .with_duration(s.duration)
                .with_business_context(s.application_id, s.business_transaction_id)
                .with_trace_id(s.trace_id),
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_results_satisfy_filter_and_limit(
        shapes in proptest::collection::vec(shape_strategy(), 0..60),
        filter in filter_strategy(),
        limit in 0usize..30,
    ) {
        let collector = create_collector();
        populate(&collector, &shapes);

        let rows = collector.overview(&filter, Some(limit), None).unwrap();
        prop_assert!(rows.len() <= limit);

        for row in &rows {
            let stored = collector.buffer().get(row.id).unwrap();
            prop_assert!(filter.matches(&stored));
        }

        let expected = shapes
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let stored = collector.buffer().get(*i as u64 + 1).unwrap();
                filter.matches(&stored)
            })
            .count();
        prop_assert_eq!(rows.len(), expected.min(limit));
    }

    #[test]
    fn prop_results_totally_ordered(
        shapes in proptest::collection::vec(shape_strategy(), 0..60),
        descending in any::<bool>(),
    ) {
        let collector = create_collector();
        populate(&collector, &shapes);

        let direction = if descending { SortDirection::Descending } else { SortDirection::Ascending };
        let comparator = collector.comparator(fields::DURATION, direction).unwrap();
        let rows = collector
            .overview(&OverviewFilter::any(), Some(1_000), Some(&comparator))
            .unwrap();
        prop_assert_eq!(rows.len(), shapes.len());

        for pair in rows.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let ka = a.timer_data.as_ref().and_then(TimerData::duration).unwrap_or(a.duration);
            let kb = b.timer_data.as_ref().and_then(TimerData::duration).unwrap_or(b.duration);
            if ka == kb {
                prop_assert!(a.id < b.id);
            } else if descending {
                prop_assert!(ka > kb);
            } else {
                prop_assert!(ka < kb);
            }
        }
    }

    #[test]
    fn prop_detail_by_trace_is_exact(
        shapes in proptest::collection::vec(shape_strategy(), 0..60),
        trace_id in 0u64..4,
    ) {
        let collector = create_collector();
        populate(&collector, &shapes);

        let found: Vec<u64> = collector
            .detail_by_trace(trace_id)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        let expected: Vec<u64> = shapes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.trace_id == trace_id)
            .map(|(i, _)| i as u64 + 1)
            .collect();
        prop_assert_eq!(found, expected);
    }
}
