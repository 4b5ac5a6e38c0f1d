//! FILENAME: core/pivot-engine/benches/pivot_calculations.rs
//! Recompute cost of the engine over a generated sales table.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pivot_engine::{
    record, AggregationType, Dimension, FilterConfig, FilterOperator, Measure, PivotEngine,
    PivotOptions, Record, SortDirection, ViewMode,
};

const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];
const PRODUCTS: [&str; 8] = ["Widget", "Gadget", "Gizmo", "Doohickey", "Sprocket", "Bolt", "Nut", "Cog"];
const QUARTERS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];

fn generate(size: usize) -> Vec<Record> {
    (0..size)
        .map(|i| {
            record! {
                "region" => REGIONS[i % REGIONS.len()],
                "product" => PRODUCTS[(i / 3) % PRODUCTS.len()],
                "quarter" => QUARTERS[(i / 7) % QUARTERS.len()],
                "sales" => ((i * 37) % 1000) as f64 + 0.5,
                "quantity" => (i % 50) as i64,
            }
        })
        .collect()
}

fn options() -> PivotOptions {
    PivotOptions {
        rows: vec![Dimension::new("region", "Region"), Dimension::new("product", "Product")],
        columns: vec![Dimension::new("quarter", "Quarter")],
        measures: vec![
            Measure::new("sales", "Sales", AggregationType::Sum),
            Measure::new("sales", "Avg Sales", AggregationType::Avg),
            Measure::new("quantity", "Units", AggregationType::Max),
        ],
        page_size: 25,
        ..PivotOptions::default()
    }
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");
    for size in [1_000usize, 10_000, 50_000] {
        let data = generate(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| PivotEngine::from_parts(black_box(data.clone()), options()).unwrap());
        });
    }
    group.finish();
}

fn bench_mutations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutations");
    let mut engine = PivotEngine::from_parts(generate(10_000), options()).unwrap();

    group.bench_function("sort_toggle_measure", |b| {
        let mut direction = SortDirection::Asc;
        b.iter(|| {
            direction = direction.reversed();
            engine.sort(black_box("sales"), direction)
        });
    });

    group.bench_function("set_filters", |b| {
        let mut threshold = 0i64;
        b.iter(|| {
            threshold = (threshold + 97) % 1000;
            engine.set_filters(vec![FilterConfig::new("sales", FilterOperator::GreaterThan, threshold)])
        });
    });

    group.bench_function("raw_mode_round_trip", |b| {
        b.iter(|| {
            engine.set_view_mode(ViewMode::Raw);
            engine.set_view_mode(ViewMode::Processed)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_construction, bench_mutations);
criterion_main!(benches);
