//! FILENAME: core/pivot-engine/src/sort.rs
//! Sort Engine - orders raw records (raw mode) or distinct row/column keys
//! (processed mode). All sorts are stable: ties keep their input order.

use std::cmp::Ordering;

use cells::{compare_text_keys, compare_values, CellValue};
use rustc_hash::FxHashMap;

use crate::definition::SortDirection;
use crate::group::{Group, KeySegments};
use crate::record::PivotRecord;

/// What a list of group keys is ordered by.
#[derive(Debug, Clone, Copy)]
pub enum KeySort<'a> {
    /// The `index`-th dimension segment of each key.
    Segment {
        labels: &'a FxHashMap<String, KeySegments>,
        index: usize,
    },
    /// A measure's aggregate per row key, summed over every column or taken
    /// from the single `column_key` when given.
    Measure {
        groups: &'a [Group],
        aggregate_key: &'a str,
        column_key: Option<&'a str>,
    },
}

/// Returns `indices` ordered by `field`. Numeric values compare numerically,
/// everything else by locale string compare; missing fields sort as empty.
pub fn sort_records<R: PivotRecord>(
    records: &[R],
    indices: &[usize],
    field: &str,
    direction: SortDirection,
) -> Vec<usize> {
    let values: FxHashMap<usize, CellValue> = indices
        .iter()
        .map(|&i| {
            let value = records
                .get(i)
                .and_then(|r| r.field(field).map(|v| v.into_owned()))
                .unwrap_or_default();
            (i, value)
        })
        .collect();

    let mut sorted = indices.to_vec();
    match direction {
        SortDirection::Asc => sorted.sort_by(|a, b| compare_values(&values[a], &values[b])),
        SortDirection::Desc => sorted.sort_by(|a, b| compare_values(&values[b], &values[a])),
    }
    sorted
}

/// Returns `keys` ordered according to `by`.
pub fn sort_keys(keys: &[String], by: KeySort<'_>, direction: SortDirection) -> Vec<String> {
    let mut sorted = keys.to_vec();
    match by {
        KeySort::Segment { labels, index } => {
            sort_directed(&mut sorted, direction, |a, b| {
                compare_text_keys(segment(labels, a, index), segment(labels, b, index))
            });
        }
        KeySort::Measure {
            groups,
            aggregate_key,
            column_key,
        } => {
            let totals = measure_totals(groups, aggregate_key, column_key);
            let total = |key: &String| totals.get(key.as_str()).copied().unwrap_or(0.0);
            sort_directed(&mut sorted, direction, |a, b| {
                total(a).total_cmp(&total(b))
            });
        }
    }
    sorted
}

/// Sum of `aggregate_key` per row key across the selected columns.
pub fn measure_totals<'g>(
    groups: &'g [Group],
    aggregate_key: &str,
    column_key: Option<&str>,
) -> FxHashMap<&'g str, f64> {
    let mut totals: FxHashMap<&str, f64> = FxHashMap::default();
    for group in groups {
        if column_key.is_some_and(|c| c != group.column_key) {
            continue;
        }
        let value = group.aggregates.get(aggregate_key).copied().unwrap_or(0.0);
        *totals.entry(group.row_key.as_str()).or_insert(0.0) += value;
    }
    totals
}

fn segment<'a>(labels: &'a FxHashMap<String, KeySegments>, key: &str, index: usize) -> &'a str {
    labels
        .get(key)
        .and_then(|segments| segments.get(index))
        .map_or("", String::as_str)
}

fn sort_directed<T, F>(items: &mut [T], direction: SortDirection, mut compare: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    match direction {
        SortDirection::Asc => items.sort_by(|a, b| compare(a, b)),
        SortDirection::Desc => items.sort_by(|a, b| compare(b, a)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::definition::{AggregationType, EmptyAveragePolicy, Measure};
    use crate::group::group;
    use crate::record;
    use crate::record::Record;

    fn data() -> Vec<Record> {
        vec![
            record! { "p" => "b", "r" => "N", "sales" => 10 },
            record! { "p" => "A", "r" => "S", "sales" => 200 },
            record! { "p" => "C", "r" => "N", "sales" => 9 },
            record! { "p" => "a", "r" => "N", "sales" => 50 },
            record! { "p" => "A", "r" => "N", "sales" => 100 },
        ]
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn records_sort_numerically_and_stably() {
        let data = data();
        let all: Vec<usize> = (0..data.len()).collect();

        assert_eq!(sort_records(&data, &all, "sales", SortDirection::Asc), vec![2, 0, 3, 4, 1]);
        assert_eq!(sort_records(&data, &all, "sales", SortDirection::Desc), vec![1, 4, 3, 0, 2]);

        // "N" ties keep input order in both directions.
        assert_eq!(sort_records(&data, &all, "r", SortDirection::Asc), vec![0, 2, 3, 4, 1]);
        assert_eq!(sort_records(&data, &all, "r", SortDirection::Desc), vec![1, 0, 2, 3, 4]);
    }

    #[test]
    fn text_sort_is_case_insensitive() {
        let data = data();
        let all: Vec<usize> = (0..data.len()).collect();
        let sorted = sort_records(&data, &all, "p", SortDirection::Asc);
        let names: Vec<String> = sorted.iter().map(|&i| data[i]["p"].display_value()).collect();
        assert_eq!(names, vec!["a", "A", "A", "b", "C"]);
    }

    #[test]
    fn keys_sort_by_dimension_segment() {
        let data = data();
        let all: Vec<usize> = (0..data.len()).collect();
        let grouping = group(&data, &all, &keys(&["p"]), &keys(&["r"]));
        let by = KeySort::Segment {
            labels: &grouping.row_labels,
            index: 0,
        };

        assert_eq!(sort_keys(&grouping.row_keys, by, SortDirection::Asc), keys(&["a", "A", "b", "C"]));
        assert_eq!(sort_keys(&grouping.row_keys, by, SortDirection::Desc), keys(&["C", "b", "A", "a"]));
    }

    #[test]
    fn keys_sort_by_measure_total_or_single_column() {
        let data = data();
        let all: Vec<usize> = (0..data.len()).collect();
        let measures = vec![Measure::new("sales", "Sales", AggregationType::Sum)];
        let mut grouping = group(&data, &all, &keys(&["p"]), &keys(&["r"]));
        for g in grouping.groups.iter_mut() {
            g.aggregates = aggregate(&data, &g.items, &measures, EmptyAveragePolicy::Zero);
        }

        let total = KeySort::Measure {
            groups: &grouping.groups,
            aggregate_key: "sum_sales",
            column_key: None,
        };
        // A = 200 + 100, a = 50, b = 10, C = 9
        assert_eq!(sort_keys(&grouping.row_keys, total, SortDirection::Desc), keys(&["A", "a", "b", "C"]));

        let south_only = KeySort::Measure {
            groups: &grouping.groups,
            aggregate_key: "sum_sales",
            column_key: Some("S"),
        };
        // Only A has a South value; the rest tie at 0 and keep input order.
        assert_eq!(sort_keys(&grouping.row_keys, south_only, SortDirection::Desc), keys(&["A", "b", "C", "a"]));
    }

    #[test]
    fn mixed_number_and_text_records_sort_without_panicking() {
        let data: Vec<Record> = (0..3000)
            .map(|n: i64| {
                if n % 2 == 0 {
                    record! { "v" => (n * 7919) % 3001 }
                } else {
                    record! { "v" => format!("{}u", (n * 7919) % 3001) }
                }
            })
            .collect();
        let all: Vec<usize> = (0..data.len()).collect();

        let sorted = sort_records(&data, &all, "v", SortDirection::Asc);
        let first_text = sorted
            .iter()
            .position(|&i| data[i]["v"].as_number().is_none())
            .unwrap();
        assert_eq!(first_text, 1500);
        assert!(sorted.windows(2).all(|w| compare_values(&data[w[0]]["v"], &data[w[1]]["v"]).is_le()));

        let descending = sort_records(&data, &all, "v", SortDirection::Desc);
        assert!(descending[..1500].iter().all(|&i| data[i]["v"].as_number().is_none()));
    }

    #[test]
    fn mixed_segments_put_numbers_before_text() {
        let raw = ["3", "10x", "0x", "25x", "10", "0", "1", "b", "A"];
        let mut labels: FxHashMap<String, KeySegments> = FxHashMap::default();
        for k in raw {
            labels.insert(k.to_string(), std::iter::once(k.to_string()).collect());
        }
        let by = KeySort::Segment { labels: &labels, index: 0 };
        assert_eq!(
            sort_keys(&keys(&raw), by, SortDirection::Asc),
            keys(&["0", "1", "3", "10", "0x", "10x", "25x", "A", "b"])
        );
    }

    #[test]
    fn nan_measure_totals_do_not_break_the_order() {
        let groups: Vec<Group> = ["x", "y", "z"]
            .iter()
            .zip([f64::NAN, 2.0, 1.0])
            .map(|(key, value)| Group {
                key: key.to_string(),
                row_key: key.to_string(),
                column_key: String::new(),
                items: Vec::new(),
                aggregates: std::iter::once(("avg_v".to_string(), value)).collect(),
            })
            .collect();
        let by = KeySort::Measure {
            groups: &groups,
            aggregate_key: "avg_v",
            column_key: None,
        };
        assert_eq!(sort_keys(&keys(&["x", "y", "z"]), by, SortDirection::Asc), keys(&["z", "y", "x"]));
    }

    #[test]
    fn numeric_segments_compare_as_numbers() {
        let mut labels: FxHashMap<String, KeySegments> = FxHashMap::default();
        for k in ["10", "9", "100"] {
            labels.insert(k.to_string(), std::iter::once(k.to_string()).collect());
        }
        let by = KeySort::Segment { labels: &labels, index: 0 };
        assert_eq!(sort_keys(&keys(&["10", "9", "100"]), by, SortDirection::Asc), keys(&["9", "10", "100"]));
    }
}
