//! FILENAME: core/pivot-engine/src/filter.rs
//! Filter Engine - conjunctive predicates evaluated against raw records
//! before grouping, so filters change group membership.

use cells::CellValue;

use crate::definition::{FilterConfig, FilterOperator};
use crate::record::PivotRecord;

/// Whether `record` satisfies a single filter. Never panics on odd data:
/// non-numeric values simply fail numeric comparisons.
pub fn matches_filter<R: PivotRecord + ?Sized>(record: &R, filter: &FilterConfig) -> bool {
    let value = record
        .field(&filter.field)
        .map(|v| v.into_owned())
        .unwrap_or(CellValue::Empty);

    match filter.operator {
        FilterOperator::Equals => values_equal(&value, &filter.value),
        FilterOperator::Contains => value
            .display_value()
            .to_lowercase()
            .contains(&filter.value.display_value().to_lowercase()),
        FilterOperator::GreaterThan => match (value.parse_float(), filter.value.parse_float()) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        },
        FilterOperator::LessThan => match (value.parse_float(), filter.value.parse_float()) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        },
    }
}

/// Numeric equality when both sides read as numbers, otherwise exact
/// equality of the display strings.
fn values_equal(a: &CellValue, b: &CellValue) -> bool {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x == y,
        _ => a.display_value() == b.display_value(),
    }
}

/// Returns the indices of the records at `indices` passing every filter,
/// in their original order. An empty filter list is the identity.
pub fn apply_filters<R: PivotRecord>(records: &[R], indices: &[usize], filters: &[FilterConfig]) -> Vec<usize> {
    if filters.is_empty() {
        return indices.to_vec();
    }
    indices
        .iter()
        .copied()
        .filter(|&i| {
            records
                .get(i)
                .is_some_and(|record| filters.iter().all(|f| matches_filter(record, f)))
        })
        .collect()
}
