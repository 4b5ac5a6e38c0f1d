//! FILENAME: core/cells/src/cell.rs
//! PURPOSE: Defines the scalar value a record field can hold.
//! CONTEXT: Records handed to the pivot engine are maps from field name to
//! `CellValue`. The engine never mutates them; it only reads values through
//! the coercions below (numeric for aggregation/filters, text for keys).

use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A single scalar field value.
///
/// Serialized untagged so that a plain JSON object such as
/// `{"region": "North", "sales": 100, "active": true, "note": null}`
/// deserializes directly into a record. Dates never come out of JSON on
/// their own (an ISO string stays `Text`); hosts construct them explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    Text(String),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Midnight on the given calendar day. `None` for an invalid date.
    pub fn date(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(CellValue::Date)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Strict numeric reading: numbers, dates (epoch milliseconds) and text
    /// that is entirely a number. Everything else is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Date(dt) => Some(dt.and_utc().timestamp_millis() as f64),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
            _ => None,
        }
    }

    /// Loose numeric conversion used for measures: anything that does not
    /// read as a number counts as 0. Booleans count as 1/0.
    pub fn to_number_lossy(&self) -> f64 {
        match self {
            CellValue::Empty => 0.0,
            CellValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => other.as_number().unwrap_or(0.0),
        }
    }

    /// Reads the longest numeric prefix of the value, the way a lenient
    /// text-to-number parse does ("75 units" -> 75). `None` when no digits lead.
    pub fn parse_float(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if !n.is_nan() => Some(*n),
            CellValue::Date(dt) => Some(dt.and_utc().timestamp_millis() as f64),
            CellValue::Text(s) => parse_float_prefix(s),
            _ => None,
        }
    }

    /// Returns the display value of the cell as a String.
    /// This is also the segment used when the value takes part in a group key.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_plain_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    dt.format("%Y-%m-%d").to_string()
                } else {
                    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
                }
            }
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Boolean(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Empty, Into::into)
    }
}

// ============================================================================
// COMPARISON
// ============================================================================

/// Sort class of a value. Values of different classes never compare by
/// content: empties first, then numbers (numeric text and dates included),
/// then text, then booleans.
fn sort_class(value: &CellValue) -> u8 {
    match value {
        CellValue::Empty => 0,
        CellValue::Boolean(_) => 3,
        _ if value.as_number().is_some() => 1,
        _ => 2,
    }
}

/// Orders two values by sort class, then numerically, by
/// [`locale_compare`] on display strings, or false-before-true within the
/// class. Defines a total order.
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    let (class_a, class_b) = (sort_class(a), sort_class(b));
    if class_a != class_b {
        return class_a.cmp(&class_b);
    }
    match (a, b) {
        (CellValue::Boolean(x), CellValue::Boolean(y)) => x.cmp(y),
        _ => match (a.as_number(), b.as_number()) {
            (Some(na), Some(nb)) => na.total_cmp(&nb),
            _ => locale_compare(&a.display_value(), &b.display_value()),
        },
    }
}

/// Case-insensitive comparison; on a case-only tie lowercase sorts first.
pub fn locale_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Orders two key strings: keys that parse as numbers come first in
/// numeric order, the rest follow by [`locale_compare`].
pub fn compare_text_keys(a: &str, b: &str) -> Ordering {
    let parse = |s: &str| s.trim().parse::<f64>().ok().filter(|n| !n.is_nan());
    match (parse(a), parse(b)) {
        (Some(na), Some(nb)) => na.total_cmp(&nb).then_with(|| locale_compare(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => locale_compare(a, b),
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// Format without unnecessary decimal places.
fn format_plain_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

fn parse_float_prefix(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if frac_end > frac_start || digits > 0 {
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    // Optional exponent, only consumed when it is complete.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}
