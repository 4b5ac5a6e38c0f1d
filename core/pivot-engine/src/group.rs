//! FILENAME: core/pivot-engine/src/group.rs
//! Grouping Engine - partitions records by their row+column dimension values.
//!
//! A group key is the `|`-joined display values of every active row field
//! followed by every active column field. Groups come out in first-seen
//! order; visible ordering is imposed later by sorting and manual order.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use smallvec::SmallVec;

use crate::definition::KEY_SEPARATOR;
use crate::record::PivotRecord;

/// Display values of the active fields for one record.
pub type KeySegments = SmallVec<[String; 4]>;

/// The records sharing identical values across the active axes, plus their
/// computed aggregates. Items are indices into the engine's record list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub key: String,
    /// The row-field part of `key`.
    pub row_key: String,
    /// The column-field part of `key`.
    pub column_key: String,
    pub items: Vec<usize>,
    /// `"{aggregation}_{uniqueName}"` -> value.
    pub aggregates: BTreeMap<String, f64>,
}

/// Output of one grouping pass.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub groups: Vec<Group>,
    /// Distinct row keys in first-seen order.
    pub row_keys: Vec<String>,
    /// Distinct column keys in first-seen order.
    pub column_keys: Vec<String>,
    /// Row labels (one segment per row field) for each row key.
    pub row_labels: FxHashMap<String, KeySegments>,
    /// Column labels (one segment per column field) for each column key.
    pub column_labels: FxHashMap<String, KeySegments>,
    /// Number of (record, field) pairs where the field was missing.
    pub missing_segments: usize,
}

/// Joins key segments with the reserved separator.
pub fn join_key(segments: &[String]) -> String {
    let mut key = String::new();
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(segment);
    }
    key
}

/// Groups the records at `indices` by `row_fields` then `column_fields`.
///
/// A record missing a field contributes an empty segment. With no fields at
/// all every record lands in a single group keyed by the empty string.
pub fn group<R: PivotRecord>(
    records: &[R],
    indices: &[usize],
    row_fields: &[String],
    column_fields: &[String],
) -> Grouping {
    let mut grouping = Grouping::default();
    let mut by_key: FxHashMap<String, usize> = FxHashMap::default();
    let mut seen_rows: FxHashSet<String> = FxHashSet::default();
    let mut seen_columns: FxHashSet<String> = FxHashSet::default();

    for &idx in indices {
        let Some(record) = records.get(idx) else {
            continue;
        };

        let mut segments: KeySegments = SmallVec::with_capacity(row_fields.len() + column_fields.len());
        for field in row_fields.iter().chain(column_fields.iter()) {
            match record.field(field) {
                Some(value) => segments.push(value.display_value()),
                None => {
                    grouping.missing_segments += 1;
                    segments.push(String::new());
                }
            }
        }

        let key = join_key(&segments);
        if let Some(&group_idx) = by_key.get(&key) {
            grouping.groups[group_idx].items.push(idx);
            continue;
        }

        let (row_segments, column_segments) = segments.split_at(row_fields.len());
        let row_key = join_key(row_segments);
        let column_key = join_key(column_segments);

        if seen_rows.insert(row_key.clone()) {
            grouping.row_keys.push(row_key.clone());
            grouping
                .row_labels
                .insert(row_key.clone(), row_segments.iter().cloned().collect());
        }
        if seen_columns.insert(column_key.clone()) {
            grouping.column_keys.push(column_key.clone());
            grouping
                .column_labels
                .insert(column_key.clone(), column_segments.iter().cloned().collect());
        }

        by_key.insert(key.clone(), grouping.groups.len());
        grouping.groups.push(Group {
            key,
            row_key,
            column_key,
            items: vec![idx],
            aggregates: BTreeMap::new(),
        });
    }

    grouping
}
