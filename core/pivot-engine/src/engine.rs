//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot Engine - the stateful facade a host instantiates.
//!
//! The engine owns the records, the configuration and the per-mode UI state
//! (sort, manual order, pagination). Every successful mutation runs a full
//! synchronous recompute:
//!
//!   filter -> group -> aggregate -> order -> paginate -> snapshot
//!
//! and then notifies listeners. Mutations that would not change anything
//! return `false` and notify nobody.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use cells::{format_value, CellValue, FormatSpec, StyleAttributes, TextAlign};
use rustc_hash::FxHashSet;

use crate::aggregate::{accumulate, finish, AggregateAccumulator};
use crate::definition::{
    validate_dimensions, validate_measures, Dimension, FilterConfig, GroupConfig, Measure,
    PivotConfig, PivotOptions, SortConfig, SortDirection, SortTarget, ViewMode,
};
use crate::error::PivotResult;
use crate::events::{Listener, Listeners, PivotEvent, SubscriptionId};
use crate::filter::apply_filters;
use crate::group::{group, Group, Grouping};
use crate::order::AxisOrder;
use crate::pagination::{PaginationConfig, PaginationState};
use crate::record::{PivotRecord, Record};
use crate::sort::{sort_keys, sort_records, KeySort};
use crate::view::{EngineState, ProcessedData, ProcessedInput, RawData};

// ============================================================================
// PER-MODE STATE
// ============================================================================

/// UI state kept independently for each view mode, so switching modes
/// restores what the user left behind.
#[derive(Debug, Clone)]
struct ModeState<K> {
    sort: Option<SortConfig>,
    rows: AxisOrder<K>,
    columns: AxisOrder<String>,
    pagination: PaginationState,
}

impl<K> ModeState<K> {
    fn new(page_size: usize) -> Self {
        ModeState {
            sort: None,
            rows: AxisOrder::default(),
            columns: AxisOrder::default(),
            pagination: PaginationState::new(page_size),
        }
    }
}

/// How a processed-mode sort resolves against the active axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortPlan {
    /// Row keys by the n-th row field.
    RowSegment(usize),
    /// Column keys by the n-th column field.
    ColumnSegment(usize),
    /// Row keys by the aggregate of the n-th measure.
    Measure(usize),
}

fn plan_sort(
    sort: &SortConfig,
    row_fields: &[String],
    column_fields: &[String],
    measures: &[Measure],
) -> Option<SortPlan> {
    let dimension = || {
        row_fields
            .iter()
            .position(|f| *f == sort.field)
            .map(SortPlan::RowSegment)
            .or_else(|| {
                column_fields
                    .iter()
                    .position(|f| *f == sort.field)
                    .map(SortPlan::ColumnSegment)
            })
    };
    let measure = || {
        measures
            .iter()
            .position(|m| {
                m.unique_name == sort.field && sort.aggregation.map_or(true, |a| a == m.aggregation)
            })
            .or_else(|| measures.iter().position(|m| m.key() == sort.field))
            .map(SortPlan::Measure)
    };

    match sort.sort_type {
        Some(SortTarget::Dimension) => dimension(),
        Some(SortTarget::Measure) => measure(),
        None => dimension().or_else(measure),
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// The pivot engine over records of type `R`.
pub struct PivotEngine<R = Record> {
    data: Vec<R>,
    options: PivotOptions,
    filters: Vec<FilterConfig>,
    /// `None` selects every measure.
    selected_measures: Option<Vec<String>>,
    processed: ModeState<String>,
    /// Raw-mode row keys are record indices.
    raw: ModeState<usize>,
    /// Visible raw record order across all pages.
    raw_rows: Vec<usize>,
    state: Arc<EngineState<R>>,
    listeners: Listeners<R>,
}

impl<R: PivotRecord + Clone> PivotEngine<R> {
    /// Builds an engine, failing fast on misconfiguration.
    pub fn new(config: PivotConfig<R>) -> PivotResult<Self> {
        Self::from_parts(config.data, config.options)
    }

    pub fn from_parts(data: Vec<R>, options: PivotOptions) -> PivotResult<Self> {
        options.validate()?;

        let mut engine = PivotEngine {
            processed: ModeState::new(options.page_size),
            raw: ModeState::new(options.page_size),
            data,
            options,
            filters: Vec::new(),
            selected_measures: None,
            raw_rows: Vec::new(),
            state: Arc::new(EngineState::default()),
            listeners: Listeners::default(),
        };

        // The initial sort seeds every mode it is valid for.
        if let Some(sort) = engine.options.initial_sort.clone() {
            if engine.sort_applies(ViewMode::Processed, &sort) {
                engine.processed.sort = Some(sort.clone());
            }
            if engine.sort_applies(ViewMode::Raw, &sort) {
                engine.raw.sort = Some(sort);
            }
        }

        engine.recompute();
        log::debug!(
            target: "pivot",
            "engine created: {} records, {} measures, view={:?}",
            engine.data.len(),
            engine.options.measures.len(),
            engine.options.view_mode
        );
        Ok(engine)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// The latest snapshot. Cheap to clone and never mutated afterwards.
    pub fn get_state(&self) -> Arc<EngineState<R>> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> &EngineState<R> {
        &self.state
    }

    pub fn get_pagination(&self) -> PaginationState {
        self.state.pagination
    }

    pub fn get_grouped_data(&self) -> &[Group] {
        &self.state.groups
    }

    /// All records, as supplied.
    pub fn get_data(&self) -> &[R] {
        &self.data
    }

    /// The raw branch of the snapshot: filtered, ordered, current page.
    pub fn get_raw_data(&self) -> &RawData<R> {
        &self.state.raw_data
    }

    pub fn get_filters(&self) -> &[FilterConfig] {
        &self.filters
    }

    pub fn view_mode(&self) -> ViewMode {
        self.options.view_mode
    }

    pub fn options(&self) -> &PivotOptions {
        &self.options
    }

    /// Formats `value` with the format configured for `field`: the
    /// `formatting` entry first, then the measure's own format, then a plain
    /// number with no decimals.
    pub fn format_value(&self, value: &CellValue, field: &str) -> String {
        format_value(value, &self.format_spec(field))
    }

    pub fn format_spec(&self, field: &str) -> Cow<'_, FormatSpec> {
        match self.configured_format(field) {
            Some(spec) => Cow::Borrowed(spec),
            None => Cow::Owned(FormatSpec::number(0)),
        }
    }

    /// Alignment for cells of `field`: the format's explicit `align`, else
    /// right for measures and numeric formats, else left.
    pub fn get_field_alignment(&self, field: &str) -> TextAlign {
        if let Some(spec) = self.configured_format(field) {
            if let Some(align) = spec.align {
                return align;
            }
            if spec.is_numeric() {
                return TextAlign::Right;
            }
        }
        if self.find_measure(field).is_some() {
            TextAlign::Right
        } else {
            TextAlign::Left
        }
    }

    /// The first configured conditional style matching `value` in `field`.
    pub fn conditional_style(&self, field: &str, value: f64) -> Option<&StyleAttributes> {
        self.options
            .conditional_formatting
            .iter()
            .find(|rule| rule.applies_to(field) && rule.matches(value))
            .map(|rule| &rule.format)
    }

    // ========================================================================
    // CONFIGURATION MUTATIONS
    // ========================================================================

    pub fn set_measures(&mut self, measures: Vec<Measure>) -> PivotResult<()> {
        validate_measures(&measures)?;
        self.options.measures = measures;
        if let Some(selected) = self.selected_measures.as_mut() {
            let keys: FxHashSet<String> = self.options.measures.iter().map(Measure::key).collect();
            selected.retain(|k| keys.contains(k));
        }
        self.refresh();
        Ok(())
    }

    /// Chooses which measure keys get value columns. Unknown keys are
    /// ignored.
    pub fn set_selected_measures<I, S>(&mut self, keys: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested: FxHashSet<String> = keys.into_iter().map(Into::into).collect();
        let selected: Vec<String> = self
            .options
            .measures
            .iter()
            .map(Measure::key)
            .filter(|k| requested.contains(k))
            .collect();
        if selected == self.state.selected_measures {
            return false;
        }
        self.selected_measures = Some(selected);
        self.refresh();
        true
    }

    /// Replaces the pool of available dimensions.
    pub fn set_dimensions(&mut self, dimensions: Vec<Dimension>) -> PivotResult<()> {
        validate_dimensions(&dimensions)?;
        self.options.dimensions = dimensions;
        self.refresh();
        Ok(())
    }

    pub fn set_rows(&mut self, rows: Vec<Dimension>) -> PivotResult<()> {
        validate_dimensions(&rows)?;
        self.options.rows = rows;
        self.refresh();
        Ok(())
    }

    pub fn set_columns(&mut self, columns: Vec<Dimension>) -> PivotResult<()> {
        validate_dimensions(&columns)?;
        self.options.columns = columns;
        self.refresh();
        Ok(())
    }

    /// Overrides the axis fields; `None` reverts to the configured rows and
    /// columns.
    pub fn set_group_config(&mut self, config: Option<GroupConfig>) -> PivotResult<()> {
        if let Some(config) = &config {
            config.validate()?;
        }
        self.options.group_config = config;
        self.refresh();
        Ok(())
    }

    /// Replaces the records. Raw-mode manual row order refers to record
    /// positions and is cleared.
    pub fn set_data(&mut self, data: Vec<R>) {
        self.data = data;
        self.raw.rows.reset();
        self.refresh();
    }

    /// Replaces the filter list. Filters on fields unknown to the schema
    /// are kept but skipped.
    pub fn set_filters(&mut self, filters: Vec<FilterConfig>) -> bool {
        if filters == self.filters {
            return false;
        }
        self.filters = filters;
        self.refresh();
        true
    }

    pub fn clear_filters(&mut self) -> bool {
        self.set_filters(Vec::new())
    }

    // ========================================================================
    // SORTING
    // ========================================================================

    /// Sorts the active view mode by `field`.
    pub fn sort(&mut self, field: impl Into<String>, direction: SortDirection) -> bool {
        self.set_sort(Some(SortConfig::new(field, direction)))
    }

    /// Sets or clears the active mode's sort. A field outside the active
    /// schema is a no-op.
    pub fn set_sort(&mut self, sort: Option<SortConfig>) -> bool {
        let mode = self.options.view_mode;
        if let Some(config) = &sort {
            if !self.sort_applies(mode, config) {
                log::debug!(target: "pivot", "sort ignored: '{}' is not sortable in {:?} mode", config.field, mode);
                return false;
            }
        }
        let slot = match mode {
            ViewMode::Processed => &mut self.processed.sort,
            ViewMode::Raw => &mut self.raw.sort,
        };
        if *slot == sort {
            return false;
        }
        *slot = sort;
        self.refresh();
        true
    }

    // ========================================================================
    // PAGINATION
    // ========================================================================

    pub fn set_pagination(&mut self, config: PaginationConfig) -> bool {
        self.update_pagination(|p, rows| p.set(config, rows))
    }

    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        self.update_pagination(|p, rows| p.set_page_size(page_size, rows))
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.update_pagination(|p, _| p.go_to(page))
    }

    pub fn next_page(&mut self) -> bool {
        self.update_pagination(|p, _| p.next())
    }

    pub fn previous_page(&mut self) -> bool {
        self.update_pagination(|p, _| p.previous())
    }

    fn update_pagination(&mut self, update: impl FnOnce(&mut PaginationState, usize) -> bool) -> bool {
        let rows = self.state.visible_row_count();
        let pagination = match self.options.view_mode {
            ViewMode::Processed => &mut self.processed.pagination,
            ViewMode::Raw => &mut self.raw.pagination,
        };
        let changed = update(pagination, rows);
        if changed {
            self.refresh();
        }
        changed
    }

    // ========================================================================
    // MANUAL ORDER
    // ========================================================================

    pub fn swap_rows(&mut self, from: usize, to: usize) -> bool {
        let changed = match self.options.view_mode {
            ViewMode::Processed => self.processed.rows.swap(&self.state.processed_data.row_keys, from, to),
            ViewMode::Raw => self.raw.rows.swap(&self.raw_rows, from, to),
        };
        self.finish_reorder(changed)
    }

    pub fn swap_columns(&mut self, from: usize, to: usize) -> bool {
        let changed = match self.options.view_mode {
            ViewMode::Processed => self
                .processed
                .columns
                .swap(&self.state.processed_data.column_keys, from, to),
            ViewMode::Raw => self.raw.columns.swap(&self.state.raw_data.columns, from, to),
        };
        self.finish_reorder(changed)
    }

    pub fn drag_row(&mut self, from: usize, to: usize) -> bool {
        let changed = match self.options.view_mode {
            ViewMode::Processed => self.processed.rows.drag(&self.state.processed_data.row_keys, from, to),
            ViewMode::Raw => self.raw.rows.drag(&self.raw_rows, from, to),
        };
        self.finish_reorder(changed)
    }

    pub fn drag_column(&mut self, from: usize, to: usize) -> bool {
        let changed = match self.options.view_mode {
            ViewMode::Processed => self
                .processed
                .columns
                .drag(&self.state.processed_data.column_keys, from, to),
            ViewMode::Raw => self.raw.columns.drag(&self.state.raw_data.columns, from, to),
        };
        self.finish_reorder(changed)
    }

    /// Clears the active mode's manual row and column order.
    pub fn reset(&mut self) -> bool {
        let (rows, columns) = match self.options.view_mode {
            ViewMode::Processed => (self.processed.rows.reset(), self.processed.columns.reset()),
            ViewMode::Raw => (self.raw.rows.reset(), self.raw.columns.reset()),
        };
        self.finish_reorder(rows || columns)
    }

    fn finish_reorder(&mut self, changed: bool) -> bool {
        if changed {
            self.refresh();
        } else {
            log::trace!(target: "pivot", "reorder ignored");
        }
        changed
    }

    // ========================================================================
    // VIEW MODE
    // ========================================================================

    pub fn set_view_mode(&mut self, mode: ViewMode) -> bool {
        if mode == self.options.view_mode {
            return false;
        }
        self.options.view_mode = mode;
        self.refresh();
        true
    }

    // ========================================================================
    // LISTENERS
    // ========================================================================

    pub fn subscribe(&mut self, listener: impl FnMut(&PivotEvent<R>) + Send + 'static) -> SubscriptionId {
        let boxed: Listener<R> = Box::new(listener);
        self.listeners.add(boxed)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    pub(crate) fn emit(&mut self, event: PivotEvent<R>) {
        self.listeners.emit(&event);
    }

    // ========================================================================
    // RECOMPUTE
    // ========================================================================

    /// Recomputes the snapshot and notifies listeners of what changed.
    fn refresh(&mut self) {
        let previous_mode = self.state.view_mode;
        let previous_pagination = self.state.pagination;

        self.recompute();

        if self.state.view_mode != previous_mode {
            self.emit(PivotEvent::ViewModeChange(self.state.view_mode));
        }
        self.emit(PivotEvent::StateChange(Arc::clone(&self.state)));
        if self.state.pagination != previous_pagination {
            self.emit(PivotEvent::PaginationChange(self.state.pagination));
        }
    }

    fn recompute(&mut self) {
        let started = Instant::now();
        let row_fields = self.row_fields();
        let column_fields = self.column_fields();
        let empty_average = self.options.empty_average;

        // 1. Filter
        let all: Vec<usize> = (0..self.data.len()).collect();
        let active_filters: Vec<FilterConfig> = self
            .filters
            .iter()
            .filter(|f| self.is_known_field(&f.field))
            .cloned()
            .collect();
        if active_filters.len() < self.filters.len() {
            log::debug!(
                target: "pivot",
                "skipping {} filter(s) on unknown fields",
                self.filters.len() - active_filters.len()
            );
        }
        let filtered = apply_filters(&self.data, &all, &active_filters);

        // 2. Group + aggregate
        let mut grouping = group(&self.data, &filtered, &row_fields, &column_fields);
        if grouping.missing_segments > 0 {
            log::warn!(
                target: "pivot",
                "{} dimension value(s) missing from records; grouped under an empty key",
                grouping.missing_segments
            );
        }
        let measures = &self.options.measures;
        let accumulators: Vec<Vec<AggregateAccumulator>> = grouping
            .groups
            .iter()
            .map(|g| accumulate(&self.data, &g.items, measures))
            .collect();
        for (group, accs) in grouping.groups.iter_mut().zip(&accumulators) {
            group.aggregates = finish(accs, measures, empty_average);
        }

        // 3. Processed order + pagination
        let stale_sort = self.processed.sort.as_ref().filter(|sort| {
            plan_sort(sort, &row_fields, &column_fields, &self.options.measures).is_none()
        });
        if let Some(sort) = stale_sort {
            log::debug!(target: "pivot", "dropping sort on '{}': field left the configuration", sort.field);
            self.processed.sort = None;
        }
        let (computed_rows, computed_columns) = self.processed_order(&grouping, &row_fields, &column_fields);
        let row_keys = self.processed.rows.apply(&computed_rows);
        let column_keys = self.processed.columns.apply(&computed_columns);
        self.processed.pagination.update_row_count(row_keys.len());
        let processed_page = self.processed.pagination.page_range(row_keys.len());

        // 4. Raw order + pagination
        let raw_sorted = match &self.raw.sort {
            Some(sort) => sort_records(&self.data, &filtered, &sort.field, sort.direction),
            None => filtered.clone(),
        };
        let raw_rows = self.raw.rows.apply(&raw_sorted);
        let raw_columns = self.raw.columns.apply(&self.schema_fields());
        self.raw.pagination.update_row_count(raw_rows.len());
        let raw_page = self.raw.pagination.page_range(raw_rows.len());

        // 5. Snapshot
        let selected = self.selected_measure_indices();
        let measures = &self.options.measures;
        let processed_data = ProcessedData::build(ProcessedInput {
            grouping: &grouping,
            accumulators: &accumulators,
            measures,
            selected: &selected,
            row_keys,
            column_keys,
            page: processed_page,
            empty_average,
        });
        let raw_data = RawData::build(&self.data, &raw_rows, raw_columns, raw_page);
        self.raw_rows = raw_rows;

        let view_mode = self.options.view_mode;
        let (pagination, sort_config) = match view_mode {
            ViewMode::Processed => (self.processed.pagination, self.processed.sort.clone()),
            ViewMode::Raw => (self.raw.pagination, self.raw.sort.clone()),
        };

        log::debug!(
            target: "pivot",
            "recompute: {} records, {} filtered, {} groups, {}x{} keys, view={:?} page {}/{} in {:?}",
            self.data.len(),
            filtered.len(),
            grouping.groups.len(),
            processed_data.row_keys.len(),
            processed_data.column_keys.len(),
            view_mode,
            pagination.current_page,
            pagination.total_pages,
            started.elapsed()
        );

        self.state = Arc::new(EngineState {
            rows: self.axis_dimensions(&row_fields),
            columns: self.axis_dimensions(&column_fields),
            measures: measures.clone(),
            selected_measures: selected.iter().map(|&i| measures[i].key()).collect(),
            processed_data,
            raw_data,
            groups: grouping.groups,
            pagination,
            sort_config,
            view_mode,
            formatting: self.options.formatting.clone(),
        });
    }

    /// Computed (pre-manual-order) row and column keys for processed mode.
    fn processed_order(
        &self,
        grouping: &Grouping,
        row_fields: &[String],
        column_fields: &[String],
    ) -> (Vec<String>, Vec<String>) {
        let mut rows = grouping.row_keys.clone();
        let mut columns = grouping.column_keys.clone();

        let Some(sort) = &self.processed.sort else {
            return (rows, columns);
        };
        let measures = &self.options.measures;
        match plan_sort(sort, row_fields, column_fields, measures) {
            Some(SortPlan::RowSegment(index)) => {
                let by = KeySort::Segment {
                    labels: &grouping.row_labels,
                    index,
                };
                rows = sort_keys(&rows, by, sort.direction);
            }
            Some(SortPlan::ColumnSegment(index)) => {
                let by = KeySort::Segment {
                    labels: &grouping.column_labels,
                    index,
                };
                columns = sort_keys(&columns, by, sort.direction);
            }
            Some(SortPlan::Measure(m)) => {
                let aggregate_key = measures[m].key();
                let by = KeySort::Measure {
                    groups: &grouping.groups,
                    aggregate_key: &aggregate_key,
                    column_key: sort.column_key.as_deref(),
                };
                rows = sort_keys(&rows, by, sort.direction);
            }
            None => {}
        }
        (rows, columns)
    }

    // ========================================================================
    // SCHEMA HELPERS
    // ========================================================================

    fn row_fields(&self) -> Vec<String> {
        match &self.options.group_config {
            Some(config) => config.row_fields.clone(),
            None => self.options.rows.iter().map(|d| d.unique_name.clone()).collect(),
        }
    }

    fn column_fields(&self) -> Vec<String> {
        match &self.options.group_config {
            Some(config) => config.column_fields.clone(),
            None => self.options.columns.iter().map(|d| d.unique_name.clone()).collect(),
        }
    }

    /// Dimension descriptors for the given axis fields, falling back to a
    /// bare dimension for fields configured only through `groupConfig`.
    fn axis_dimensions(&self, fields: &[String]) -> Vec<Dimension> {
        fields
            .iter()
            .map(|field| {
                self.options
                    .rows
                    .iter()
                    .chain(&self.options.columns)
                    .chain(&self.options.dimensions)
                    .find(|d| d.unique_name == *field)
                    .cloned()
                    .unwrap_or_else(|| Dimension::new(field.clone(), ""))
            })
            .collect()
    }

    fn configured_fields(&self) -> Vec<&str> {
        let options = &self.options;
        let mut fields: Vec<&str> = Vec::new();
        let dimension_names = options
            .rows
            .iter()
            .chain(&options.columns)
            .chain(&options.dimensions)
            .map(|d| d.unique_name.as_str());
        let group_names = options
            .group_config
            .iter()
            .flat_map(|g| g.row_fields.iter().chain(&g.column_fields))
            .map(String::as_str);
        let measure_names = options.measures.iter().map(|m| m.unique_name.as_str());

        for name in dimension_names.chain(group_names).chain(measure_names) {
            if !fields.contains(&name) {
                fields.push(name);
            }
        }
        fields
    }

    /// Whether `field` is configured or present on any record.
    fn is_known_field(&self, field: &str) -> bool {
        self.configured_fields().contains(&field) || self.data.iter().any(|r| r.has_field(field))
    }

    /// Raw-mode columns: record field names in first-seen order, or the
    /// configured fields for records that do not list their names.
    fn schema_fields(&self) -> Vec<String> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut fields = Vec::new();
        for record in &self.data {
            for name in record.field_names() {
                if seen.insert(name.clone()) {
                    fields.push(name);
                }
            }
        }
        if fields.is_empty() {
            fields = self.configured_fields().into_iter().map(str::to_string).collect();
        }
        fields
    }

    fn sort_applies(&self, mode: ViewMode, sort: &SortConfig) -> bool {
        match mode {
            ViewMode::Processed => plan_sort(
                sort,
                &self.row_fields(),
                &self.column_fields(),
                &self.options.measures,
            )
            .is_some(),
            ViewMode::Raw => self.is_known_field(&sort.field),
        }
    }

    fn selected_measure_indices(&self) -> Vec<usize> {
        let measures = &self.options.measures;
        match &self.selected_measures {
            None => (0..measures.len()).collect(),
            Some(keys) => measures
                .iter()
                .enumerate()
                .filter(|(_, m)| keys.contains(&m.key()))
                .map(|(i, _)| i)
                .collect(),
        }
    }

    /// The measure named `field`, by unique name or aggregate key.
    fn find_measure(&self, field: &str) -> Option<&Measure> {
        let measures = &self.options.measures;
        measures
            .iter()
            .find(|m| m.unique_name == field)
            .or_else(|| measures.iter().find(|m| m.key() == field))
    }

    fn configured_format(&self, field: &str) -> Option<&FormatSpec> {
        self.options
            .formatting
            .get(field)
            .or_else(|| self.find_measure(field).and_then(|m| m.format.as_ref()))
    }
}
