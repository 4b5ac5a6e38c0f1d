//! FILENAME: core/pivot-engine/src/view.rs
//! Pivot View - the immutable snapshot handed to consumers.
//!
//! This module assembles one full recompute into an `EngineState`:
//! - `processedData`: headers, the current page of aggregated rows, totals
//! - `rawData`: the current page of filtered, ordered records
//! - the configuration and per-mode UI state that produced them
//!
//! Values are kept raw. Formatting is applied per displayed cell through
//! `PivotEngine::format_value`.

use std::collections::BTreeMap;
use std::ops::Range;

use cells::FormatSpec;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::aggregate::{finish, AggregateAccumulator};
use crate::definition::{Dimension, EmptyAveragePolicy, Measure, SortConfig, ViewMode};
use crate::group::{Group, Grouping};
use crate::pagination::PaginationState;

// ============================================================================
// PROCESSED (AGGREGATED) VIEW
// ============================================================================

/// One value column: a column key crossed with a selected measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedHeader {
    pub column_key: String,
    /// One label per column field (empty without column fields).
    pub column_labels: Vec<String>,
    /// `"{aggregation}_{uniqueName}"`.
    pub measure_key: String,
    /// The measure's caption.
    pub caption: String,
}

/// One row of the aggregated table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRow {
    pub key: String,
    /// One label per row field.
    pub labels: Vec<String>,
    /// Aligned with `ProcessedData::headers`; `None` where the row and
    /// column have no records in common.
    pub cells: Vec<Option<f64>>,
    /// Aggregates over every record in the row, per measure key.
    pub row_totals: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedData {
    pub headers: Vec<ProcessedHeader>,
    /// Every visible row key in display order (all pages).
    pub row_keys: Vec<String>,
    /// Every visible column key in display order.
    pub column_keys: Vec<String>,
    /// The rows on the current page.
    pub rows: Vec<ProcessedRow>,
    /// Aligned with `headers`.
    pub column_totals: Vec<f64>,
    /// Grand totals over all filtered records, per measure key.
    pub totals: BTreeMap<String, f64>,
}

/// Inputs for [`ProcessedData::build`].
pub struct ProcessedInput<'a> {
    pub grouping: &'a Grouping,
    /// Per group, one accumulator per measure.
    pub accumulators: &'a [Vec<AggregateAccumulator>],
    pub measures: &'a [Measure],
    /// Indices into `measures` that get value columns.
    pub selected: &'a [usize],
    pub row_keys: Vec<String>,
    pub column_keys: Vec<String>,
    pub page: Range<usize>,
    pub empty_average: EmptyAveragePolicy,
}

impl ProcessedData {
    pub fn build(input: ProcessedInput<'_>) -> Self {
        let ProcessedInput {
            grouping,
            accumulators,
            measures,
            selected,
            row_keys,
            column_keys,
            page,
            empty_average,
        } = input;
        let groups = &grouping.groups;

        let mut cell_index: FxHashMap<(&str, &str), usize> = FxHashMap::default();
        let mut by_row: FxHashMap<&str, Vec<AggregateAccumulator>> = FxHashMap::default();
        let mut by_column: FxHashMap<&str, Vec<AggregateAccumulator>> = FxHashMap::default();
        let mut grand = vec![AggregateAccumulator::new(); measures.len()];

        for (idx, (group, accs)) in groups.iter().zip(accumulators).enumerate() {
            cell_index.insert((group.row_key.as_str(), group.column_key.as_str()), idx);
            merge_into(by_row.entry(group.row_key.as_str()).or_default(), accs);
            merge_into(by_column.entry(group.column_key.as_str()).or_default(), accs);
            merge_into(&mut grand, accs);
        }

        let mut headers = Vec::with_capacity(column_keys.len() * selected.len());
        let mut column_totals = Vec::with_capacity(headers.capacity());
        for column_key in &column_keys {
            let labels = grouping
                .column_labels
                .get(column_key)
                .map(|l| l.to_vec())
                .unwrap_or_default();
            for &m in selected {
                let measure = &measures[m];
                headers.push(ProcessedHeader {
                    column_key: column_key.clone(),
                    column_labels: labels.clone(),
                    measure_key: measure.key(),
                    caption: measure.label().to_string(),
                });
                let total = by_column
                    .get(column_key.as_str())
                    .and_then(|accs| accs.get(m))
                    .map_or(0.0, |acc| acc.compute(measure.aggregation, empty_average));
                column_totals.push(total);
            }
        }

        let rows = row_keys
            .get(page)
            .unwrap_or(&[])
            .iter()
            .map(|row_key| {
                let cells = headers
                    .iter()
                    .map(|header| {
                        cell_index
                            .get(&(row_key.as_str(), header.column_key.as_str()))
                            .and_then(|&g| groups[g].aggregates.get(&header.measure_key))
                            .copied()
                    })
                    .collect();
                let row_totals = by_row
                    .get(row_key.as_str())
                    .map(|accs| finish(accs, measures, empty_average))
                    .unwrap_or_default();
                ProcessedRow {
                    key: row_key.clone(),
                    labels: grouping
                        .row_labels
                        .get(row_key)
                        .map(|l| l.to_vec())
                        .unwrap_or_default(),
                    cells,
                    row_totals,
                }
            })
            .collect();

        ProcessedData {
            headers,
            totals: finish(&grand, measures, empty_average),
            row_keys,
            column_keys,
            rows,
            column_totals,
        }
    }
}

fn merge_into(target: &mut Vec<AggregateAccumulator>, source: &[AggregateAccumulator]) {
    if target.len() < source.len() {
        target.resize(source.len(), AggregateAccumulator::new());
    }
    for (t, s) in target.iter_mut().zip(source) {
        t.merge(s);
    }
}

// ============================================================================
// RAW (FLAT) VIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawData<R> {
    /// Visible field names in display order.
    pub columns: Vec<String>,
    /// Records on the current page.
    pub rows: Vec<R>,
    /// Positions of `rows` in the engine's record list.
    pub row_indices: Vec<usize>,
    /// Filtered record count across all pages.
    pub total_rows: usize,
}

impl<R> Default for RawData<R> {
    fn default() -> Self {
        RawData {
            columns: Vec::new(),
            rows: Vec::new(),
            row_indices: Vec::new(),
            total_rows: 0,
        }
    }
}

impl<R: Clone> RawData<R> {
    pub fn build(records: &[R], visible: &[usize], columns: Vec<String>, page: Range<usize>) -> Self {
        let row_indices: Vec<usize> = visible.get(page).unwrap_or(&[]).to_vec();
        RawData {
            columns,
            rows: row_indices.iter().filter_map(|&i| records.get(i).cloned()).collect(),
            row_indices,
            total_rows: visible.len(),
        }
    }
}

// ============================================================================
// ENGINE STATE
// ============================================================================

/// The snapshot of one full recompute. Immutable once published.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState<R> {
    /// Active row dimensions.
    pub rows: Vec<Dimension>,
    /// Active column dimensions.
    pub columns: Vec<Dimension>,
    pub measures: Vec<Measure>,
    /// Measure keys that get value columns.
    pub selected_measures: Vec<String>,
    pub processed_data: ProcessedData,
    pub raw_data: RawData<R>,
    pub groups: Vec<Group>,
    /// Pagination of the active view mode.
    pub pagination: PaginationState,
    /// Sort of the active view mode.
    pub sort_config: Option<SortConfig>,
    pub view_mode: ViewMode,
    pub formatting: BTreeMap<String, FormatSpec>,
}

impl<R> Default for EngineState<R> {
    fn default() -> Self {
        EngineState {
            rows: Vec::new(),
            columns: Vec::new(),
            measures: Vec::new(),
            selected_measures: Vec::new(),
            processed_data: ProcessedData::default(),
            raw_data: RawData::default(),
            groups: Vec::new(),
            pagination: PaginationState::default(),
            sort_config: None,
            view_mode: ViewMode::default(),
            formatting: BTreeMap::new(),
        }
    }
}

impl<R> EngineState<R> {
    /// Row count of the branch selected by `view_mode`.
    pub fn visible_row_count(&self) -> usize {
        match self.view_mode {
            ViewMode::Processed => self.processed_data.row_keys.len(),
            ViewMode::Raw => self.raw_data.total_rows,
        }
    }
}
