//! FILENAME: tests/test_properties.rs
//! Randomised invariants over generated data sets.

use pivot_engine::{
    aggregate, apply_filters, group, record, AggregationType, Dimension, EmptyAveragePolicy,
    FilterConfig, FilterOperator, Measure, PivotEngine, PivotOptions, Record,
};
use proptest::prelude::*;

const REGIONS: [&str; 4] = ["North", "South", "East", "West"];
const PRODUCTS: [&str; 3] = ["Widget", "Gadget", "Gizmo"];

fn arb_record() -> impl Strategy<Value = Record> {
    (0..REGIONS.len(), 0..PRODUCTS.len(), -500i64..5000).prop_map(|(r, p, sales)| {
        record! {
            "region" => REGIONS[r],
            "product" => PRODUCTS[p],
            "sales" => sales,
        }
    })
}

fn arb_data() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(arb_record(), 0..60)
}

fn arb_filter() -> impl Strategy<Value = FilterConfig> {
    prop_oneof![
        (0..REGIONS.len()).prop_map(|r| FilterConfig::new("region", FilterOperator::Equals, REGIONS[r])),
        "[a-z]{0,2}".prop_map(|s| FilterConfig::new("product", FilterOperator::Contains, s)),
        (-500i64..5000).prop_map(|v| FilterConfig::new("sales", FilterOperator::GreaterThan, v)),
        (-500i64..5000).prop_map(|v| FilterConfig::new("sales", FilterOperator::LessThan, v)),
    ]
}

#[derive(Clone, Debug)]
enum PageOp {
    Next,
    Previous,
    GoTo(usize),
    Size(usize),
}

fn arb_page_op() -> impl Strategy<Value = PageOp> {
    prop_oneof![
        Just(PageOp::Next),
        Just(PageOp::Previous),
        (0usize..20).prop_map(PageOp::GoTo),
        (1usize..15).prop_map(PageOp::Size),
    ]
}

fn options() -> PivotOptions {
    PivotOptions {
        rows: vec![Dimension::new("region", "Region")],
        columns: vec![Dimension::new("product", "Product")],
        measures: vec![Measure::new("sales", "Sales", AggregationType::Sum)],
        ..PivotOptions::default()
    }
}

fn all_indices(data: &[Record]) -> Vec<usize> {
    (0..data.len()).collect()
}

proptest! {
    #[test]
    fn pagination_stays_in_bounds(data in arb_data(), ops in prop::collection::vec(arb_page_op(), 0..25)) {
        let mut engine = PivotEngine::from_parts(data, options()).unwrap();

        for op in ops {
            match op {
                PageOp::Next => { engine.next_page(); }
                PageOp::Previous => { engine.previous_page(); }
                PageOp::GoTo(page) => { engine.go_to_page(page); }
                PageOp::Size(size) => { engine.set_page_size(size); }
            }

            let pagination = engine.get_pagination();
            let row_count = engine.state().processed_data.row_keys.len();
            let expected_pages = row_count.div_ceil(pagination.page_size).max(1);
            prop_assert_eq!(pagination.total_pages, expected_pages);
            prop_assert!(pagination.current_page >= 1);
            prop_assert!(pagination.current_page <= pagination.total_pages);
            prop_assert!(engine.state().processed_data.rows.len() <= pagination.page_size);
        }
    }

    #[test]
    fn group_sums_add_up_to_direct_sum(data in arb_data()) {
        let measures = vec![Measure::new("sales", "Sales", AggregationType::Sum)];
        let indices = all_indices(&data);
        let grouping = group(&data, &indices, &["region".to_string()], &["product".to_string()]);

        let mut from_groups = 0.0;
        for g in &grouping.groups {
            from_groups += aggregate(&data, &g.items, &measures, EmptyAveragePolicy::Zero)["sum_sales"];
        }
        let direct: f64 = data
            .iter()
            .filter_map(|r| r.get("sales").and_then(|v| v.as_number()))
            .sum();

        prop_assert!((from_groups - direct).abs() < 1e-6);
        let grouped: usize = grouping.groups.iter().map(|g| g.items.len()).sum();
        prop_assert_eq!(grouped, data.len());
    }

    #[test]
    fn engine_totals_match_groups(data in arb_data()) {
        let engine = PivotEngine::from_parts(data, options()).unwrap();
        let state = engine.get_state();
        let from_groups: f64 = state.groups.iter().map(|g| g.aggregates["sum_sales"]).sum();
        prop_assert!((state.processed_data.totals["sum_sales"] - from_groups).abs() < 1e-6);
    }

    #[test]
    fn filtering_is_idempotent(data in arb_data(), filters in prop::collection::vec(arb_filter(), 0..3)) {
        let once = apply_filters(&data, &all_indices(&data), &filters);
        let twice = apply_filters(&data, &once, &filters);
        prop_assert_eq!(&once, &twice);
        prop_assert!(once.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn group_keys_are_stable_and_unique(data in arb_data()) {
        let indices = all_indices(&data);
        let rows = ["region".to_string()];
        let columns = ["product".to_string()];
        let first = group(&data, &indices, &rows, &columns);
        let second = group(&data, &indices, &rows, &columns);

        let keys: Vec<&str> = first.groups.iter().map(|g| g.key.as_str()).collect();
        let again: Vec<&str> = second.groups.iter().map(|g| g.key.as_str()).collect();
        prop_assert_eq!(&keys, &again);

        let mut unique = keys.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn manual_row_order_is_a_permutation(data in arb_data(), swaps in prop::collection::vec((0usize..5, 0usize..5), 0..8)) {
        let mut engine = PivotEngine::from_parts(data, options()).unwrap();
        let mut before = engine.state().processed_data.row_keys.clone();

        for (from, to) in swaps {
            engine.swap_rows(from, to);
        }

        let mut after = engine.state().processed_data.row_keys.clone();
        before.sort();
        after.sort();
        prop_assert_eq!(before, after);
    }
}
