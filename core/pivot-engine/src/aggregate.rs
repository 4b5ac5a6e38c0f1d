//! FILENAME: core/pivot-engine/src/aggregate.rs
//! Aggregation Engine - reduces each group to one number per measure.
//!
//! Every record contributes exactly one value per measure (the formula's
//! result, or the field read loosely with missing/non-numeric as 0), so
//! `count` is the group's record count and empty reductions resolve to 0.

use std::collections::BTreeMap;

use crate::definition::{AggregationType, EmptyAveragePolicy, Measure};
use crate::record::PivotRecord;

// ============================================================================
// AGGREGATE ACCUMULATOR
// ============================================================================

/// Accumulator for computing aggregates incrementally.
/// Stores the intermediate state needed for every aggregation type.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateAccumulator {
    pub sum: f64,
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AggregateAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Merges another accumulator into this one.
    pub fn merge(&mut self, other: &AggregateAccumulator) {
        if other.count == 0 {
            return;
        }
        self.sum += other.sum;
        self.count += other.count;
        if let Some(other_min) = other.min {
            self.min = Some(self.min.map_or(other_min, |m| m.min(other_min)));
        }
        if let Some(other_max) = other.max {
            self.max = Some(self.max.map_or(other_max, |m| m.max(other_max)));
        }
    }

    /// Computes the final aggregate value.
    pub fn compute(&self, aggregation: AggregationType, empty_average: EmptyAveragePolicy) -> f64 {
        match aggregation {
            AggregationType::Sum => self.sum,
            AggregationType::Count => self.count as f64,
            AggregationType::Avg => {
                if self.count > 0 {
                    self.sum / (self.count as f64)
                } else {
                    match empty_average {
                        EmptyAveragePolicy::Zero => 0.0,
                        EmptyAveragePolicy::NaN => f64::NAN,
                    }
                }
            }
            AggregationType::Min => self.min.unwrap_or(0.0),
            AggregationType::Max => self.max.unwrap_or(0.0),
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// One accumulator per measure over the records at `items`.
pub fn accumulate<R: PivotRecord>(
    records: &[R],
    items: &[usize],
    measures: &[Measure],
) -> Vec<AggregateAccumulator> {
    let mut accumulators = vec![AggregateAccumulator::new(); measures.len()];
    for record in items.iter().filter_map(|&i| records.get(i)) {
        for (acc, measure) in accumulators.iter_mut().zip(measures) {
            acc.add(measure.value_of(record));
        }
    }
    accumulators
}

/// Resolves accumulators into the `"{aggregation}_{uniqueName}"` map.
pub fn finish(
    accumulators: &[AggregateAccumulator],
    measures: &[Measure],
    empty_average: EmptyAveragePolicy,
) -> BTreeMap<String, f64> {
    measures
        .iter()
        .zip(accumulators)
        .map(|(measure, acc)| (measure.key(), acc.compute(measure.aggregation, empty_average)))
        .collect()
}

/// Aggregates the records at `items`. Pure; called once per group per recompute.
pub fn aggregate<R: PivotRecord>(
    records: &[R],
    items: &[usize],
    measures: &[Measure],
    empty_average: EmptyAveragePolicy,
) -> BTreeMap<String, f64> {
    finish(&accumulate(records, items, measures), measures, empty_average)
}
