//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot Table Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a pivot table:
//! dimensions, measures, filters, sorts and the options the engine is built
//! from. These structures are designed to be:
//! - Serializable (hosts may ship them as JSON)
//! - Validated once, at configuration time
//! - Immutable snapshots of user intent

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use cells::{CellValue, ConditionalFormatRule, FormatSpec};
use rustc_hash::FxHashSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{PivotError, PivotResult};
use crate::record::PivotRecord;

/// Separator between the segments of a group key.
pub const KEY_SEPARATOR: char = '|';

/// Rows per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 10;

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    #[default]
    Sum,
    #[serde(alias = "average")]
    Avg,
    Min,
    Max,
    Count,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Avg => "avg",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::Count => "count",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationType {
    type Err = PivotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationType::Sum),
            "avg" | "average" => Ok(AggregationType::Avg),
            "min" => Ok(AggregationType::Min),
            "max" => Ok(AggregationType::Max),
            "count" => Ok(AggregationType::Count),
            _ => Err(PivotError::UnknownAggregation(s.to_string())),
        }
    }
}

/// What `avg` yields for a group with no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmptyAveragePolicy {
    #[default]
    Zero,
    #[serde(rename = "nan")]
    NaN,
}

// ============================================================================
// DIMENSIONS
// ============================================================================

/// A field used to group records into rows or columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimension {
    pub unique_name: String,
    #[serde(default)]
    pub caption: String,
    /// Free-form type hint from the host ("string", "date", ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
}

impl Dimension {
    pub fn new(unique_name: impl Into<String>, caption: impl Into<String>) -> Self {
        Dimension {
            unique_name: unique_name.into(),
            caption: caption.into(),
            field_type: None,
        }
    }

    pub fn validate(&self) -> PivotResult<()> {
        if self.unique_name.trim().is_empty() {
            return Err(PivotError::InvalidDimension(format!(
                "dimension '{}' has an empty uniqueName",
                self.caption
            )));
        }
        Ok(())
    }
}

pub fn validate_dimensions(dimensions: &[Dimension]) -> PivotResult<()> {
    dimensions.iter().try_for_each(Dimension::validate)
}

// ============================================================================
// MEASURES
// ============================================================================

/// Computes a measure's per-record value in place of reading a field.
pub trait MeasureEvaluator: fmt::Debug + Send + Sync {
    fn evaluate(&self, record: &dyn PivotRecord) -> f64;
}

/// Wraps a closure as a [`MeasureEvaluator`].
pub struct FnEvaluator<F> {
    name: String,
    f: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&dyn PivotRecord) -> f64 + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        FnEvaluator { name: name.into(), f }
    }
}

impl<F> fmt::Debug for FnEvaluator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEvaluator").field("name", &self.name).finish()
    }
}

impl<F> MeasureEvaluator for FnEvaluator<F>
where
    F: Fn(&dyn PivotRecord) -> f64 + Send + Sync,
{
    fn evaluate(&self, record: &dyn PivotRecord) -> f64 {
        let value = (self.f)(record);
        if value.is_nan() {
            0.0
        } else {
            value
        }
    }
}

/// `numerator / denominator` per record; a zero denominator yields 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRatio {
    pub numerator: String,
    pub denominator: String,
}

impl MeasureEvaluator for FieldRatio {
    fn evaluate(&self, record: &dyn PivotRecord) -> f64 {
        let read = |name: &str| record.field(name).map_or(0.0, |v| v.to_number_lossy());
        let denominator = read(&self.denominator);
        if denominator == 0.0 {
            0.0
        } else {
            read(&self.numerator) / denominator
        }
    }
}

/// A numeric field (or derived formula) aggregated per group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub unique_name: String,
    #[serde(default)]
    pub caption: String,
    pub aggregation: AggregationType,
    /// Per-record evaluator; when absent the field `unique_name` is read.
    #[serde(skip)]
    pub formula: Option<Arc<dyn MeasureEvaluator>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatSpec>,
}

impl Measure {
    pub fn new(
        unique_name: impl Into<String>,
        caption: impl Into<String>,
        aggregation: AggregationType,
    ) -> Self {
        Measure {
            unique_name: unique_name.into(),
            caption: caption.into(),
            aggregation,
            formula: None,
            format: None,
        }
    }

    pub fn with_formula(mut self, formula: impl MeasureEvaluator + 'static) -> Self {
        self.formula = Some(Arc::new(formula));
        self
    }

    pub fn with_format(mut self, format: FormatSpec) -> Self {
        self.format = Some(format);
        self
    }

    /// The aggregate key, `"{aggregation}_{uniqueName}"`.
    pub fn key(&self) -> String {
        aggregate_key(self.aggregation, &self.unique_name)
    }

    /// Per-record value: the formula when present, otherwise the field read
    /// loosely (missing or non-numeric counts as 0).
    pub fn value_of<R: PivotRecord>(&self, record: &R) -> f64 {
        match &self.formula {
            Some(formula) => formula.evaluate(record),
            None => record
                .field(&self.unique_name)
                .map_or(0.0, |v| v.to_number_lossy()),
        }
    }

    pub fn label(&self) -> &str {
        if self.caption.is_empty() {
            &self.unique_name
        } else {
            &self.caption
        }
    }

    pub fn validate(&self) -> PivotResult<()> {
        if self.unique_name.trim().is_empty() {
            return Err(PivotError::InvalidMeasure(format!(
                "measure '{}' has an empty uniqueName",
                self.caption
            )));
        }
        Ok(())
    }
}

pub fn aggregate_key(aggregation: AggregationType, unique_name: &str) -> String {
    format!("{}_{}", aggregation.as_str(), unique_name)
}

/// Validates each measure and rejects two measures with the same key.
pub fn validate_measures(measures: &[Measure]) -> PivotResult<()> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    for measure in measures {
        measure.validate()?;
        let key = measure.key();
        if !seen.insert(key.clone()) {
            return Err(PivotError::DuplicateMeasure(key));
        }
    }
    Ok(())
}

// ============================================================================
// FILTER DEFINITIONS
// ============================================================================

/// Filter operators. A list of filters is ANDed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterOperator {
    Equals,
    Contains,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterConfig {
    pub field: String,
    pub operator: FilterOperator,
    pub value: CellValue,
}

impl FilterConfig {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<CellValue>) -> Self {
        FilterConfig {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

// ============================================================================
// SORT DEFINITIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Whether a sort field names a dimension or a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortTarget {
    Dimension,
    Measure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortConfig {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub sort_type: Option<SortTarget>,
    /// Picks one of several measures on the same field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<AggregationType>,
    /// Sort rows by this column's aggregate instead of the row total.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_key: Option<String>,
}

impl SortConfig {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        SortConfig {
            field: field.into(),
            direction,
            sort_type: None,
            aggregation: None,
            column_key: None,
        }
    }

    pub fn measure(field: impl Into<String>, direction: SortDirection, aggregation: AggregationType) -> Self {
        SortConfig {
            sort_type: Some(SortTarget::Measure),
            aggregation: Some(aggregation),
            ..SortConfig::new(field, direction)
        }
    }
}

// ============================================================================
// VIEW MODE & GROUPING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Processed,
    Raw,
}

/// Overrides which fields form the row and column axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupConfig {
    pub row_fields: Vec<String>,
    pub column_fields: Vec<String>,
}

impl GroupConfig {
    pub fn validate(&self) -> PivotResult<()> {
        match self
            .row_fields
            .iter()
            .chain(self.column_fields.iter())
            .find(|f| f.trim().is_empty())
        {
            Some(_) => Err(PivotError::InvalidDimension(
                "group config contains an empty field name".to_string(),
            )),
            None => Ok(()),
        }
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

/// Everything the engine is configured with, apart from the records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PivotOptions {
    /// Fields placed on the row axis (ordered from outer to inner).
    pub rows: Vec<Dimension>,
    /// Fields placed on the column axis (ordered from outer to inner).
    pub columns: Vec<Dimension>,
    pub measures: Vec<Measure>,
    /// Pool of dimensions available to the host's field list.
    pub dimensions: Vec<Dimension>,
    /// Used for measures added without an explicit aggregation.
    pub default_aggregation: AggregationType,
    pub group_config: Option<GroupConfig>,
    pub initial_sort: Option<SortConfig>,
    /// Per-field formats, taking precedence over a measure's own format.
    pub formatting: BTreeMap<String, FormatSpec>,
    pub conditional_formatting: Vec<ConditionalFormatRule>,
    pub page_size: usize,
    pub empty_average: EmptyAveragePolicy,
    pub view_mode: ViewMode,
}

impl Default for PivotOptions {
    fn default() -> Self {
        PivotOptions {
            rows: Vec::new(),
            columns: Vec::new(),
            measures: Vec::new(),
            dimensions: Vec::new(),
            default_aggregation: AggregationType::Sum,
            group_config: None,
            initial_sort: None,
            formatting: BTreeMap::new(),
            conditional_formatting: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            empty_average: EmptyAveragePolicy::Zero,
            view_mode: ViewMode::Processed,
        }
    }
}

impl PivotOptions {
    /// Checks everything that must fail fast at construction time.
    pub fn validate(&self) -> PivotResult<()> {
        validate_dimensions(&self.rows)?;
        validate_dimensions(&self.columns)?;
        validate_dimensions(&self.dimensions)?;
        validate_measures(&self.measures)?;
        if let Some(group_config) = &self.group_config {
            group_config.validate()?;
        }
        if self.page_size == 0 {
            return Err(PivotError::InvalidConfig("pageSize must be positive".to_string()));
        }
        Ok(())
    }
}

/// Records plus options: the full configuration input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "R: Deserialize<'de>"))]
pub struct PivotConfig<R> {
    #[serde(default)]
    pub data: Vec<R>,
    #[serde(flatten)]
    pub options: PivotOptions,
}

impl<R> PivotConfig<R> {
    pub fn new(data: Vec<R>, options: PivotOptions) -> Self {
        PivotConfig { data, options }
    }
}

impl<R: DeserializeOwned> PivotConfig<R> {
    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> PivotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
