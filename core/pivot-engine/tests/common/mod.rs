//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for pivot engine integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pivot_engine::{
    record, AggregationType, Dimension, Measure, PivotEngine, PivotEvent, PivotOptions, Record,
};

// ============================================================================
// FIXTURES
// ============================================================================

/// The three-record data set used throughout the scenarios.
pub fn scenario_a_data() -> Vec<Record> {
    vec![
        record! { "p" => "A", "r" => "N", "sales" => 100 },
        record! { "p" => "A", "r" => "S", "sales" => 200 },
        record! { "p" => "B", "r" => "N", "sales" => 50 },
    ]
}

/// rows = [p], columns = [r], sum(sales).
pub fn scenario_a_options() -> PivotOptions {
    PivotOptions {
        rows: vec![Dimension::new("p", "Product")],
        columns: vec![Dimension::new("r", "Region")],
        measures: vec![Measure::new("sales", "Sales", AggregationType::Sum)],
        ..PivotOptions::default()
    }
}

pub fn scenario_a_engine() -> PivotEngine {
    PivotEngine::from_parts(scenario_a_data(), scenario_a_options()).expect("valid configuration")
}

pub struct SalesFixture;

impl SalesFixture {
    pub fn data() -> Vec<Record> {
        [
            ("North", "Widget", "Q1", 10000.0, 100.0),
            ("North", "Widget", "Q2", 12000.0, 120.0),
            ("North", "Gadget", "Q1", 8000.0, 80.0),
            ("North", "Gadget", "Q2", 9000.0, 90.0),
            ("South", "Widget", "Q1", 15000.0, 150.0),
            ("South", "Widget", "Q2", 14000.0, 140.0),
            ("South", "Gadget", "Q1", 11000.0, 110.0),
            ("South", "Gadget", "Q2", 13000.0, 130.0),
            ("East", "Widget", "Q1", 9000.0, 90.0),
            ("East", "Widget", "Q2", 11000.0, 110.0),
            ("East", "Gadget", "Q1", 7000.0, 70.0),
            ("East", "Gadget", "Q2", 8500.0, 85.0),
        ]
        .into_iter()
        .map(|(region, product, quarter, sales, quantity)| {
            record! {
                "region" => region,
                "product" => product,
                "quarter" => quarter,
                "sales" => sales,
                "quantity" => quantity,
            }
        })
        .collect()
    }

    /// rows = [region], columns = [quarter], sum(sales), avg(sales), count(sales).
    pub fn options() -> PivotOptions {
        PivotOptions {
            rows: vec![Dimension::new("region", "Region")],
            columns: vec![Dimension::new("quarter", "Quarter")],
            measures: vec![
                Measure::new("sales", "Sales", AggregationType::Sum),
                Measure::new("sales", "Avg Sales", AggregationType::Avg),
                Measure::new("sales", "Orders", AggregationType::Count),
            ],
            dimensions: vec![Dimension::new("product", "Product")],
            ..PivotOptions::default()
        }
    }

    pub fn engine() -> PivotEngine {
        PivotEngine::from_parts(Self::data(), Self::options()).expect("valid configuration")
    }

    pub fn total_sales() -> f64 {
        127500.0
    }
}

// ============================================================================
// EVENT RECORDER
// ============================================================================

/// Collects event names emitted by an engine.
pub fn record_events(engine: &mut PivotEngine) -> Arc<Mutex<Vec<&'static str>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.subscribe(move |event: &PivotEvent<Record>| {
        sink.lock().unwrap().push(event.name());
    });
    events
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

pub fn row_keys(engine: &PivotEngine) -> Vec<String> {
    engine.state().processed_data.row_keys.clone()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}
