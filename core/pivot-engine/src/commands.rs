//! FILENAME: core/pivot-engine/src/commands.rs
//! PURPOSE: Adapter boundary for event-driven hosts.
//! CONTEXT: A UI shell forwards user interactions as `PivotCommand`s (or
//! their JSON form). Nothing crosses back as an error: failures are emitted
//! to listeners as `PivotEvent::Error` and the call returns `false`.

use cells::FormatSpec;
use serde::{Deserialize, Serialize};

use crate::definition::{
    AggregationType, Dimension, FilterConfig, GroupConfig, Measure, SortConfig, SortDirection,
    ViewMode,
};
use crate::engine::PivotEngine;
use crate::error::{PivotError, PivotResult};
use crate::events::PivotEvent;
use crate::pagination::PaginationConfig;
use crate::record::PivotRecord;

/// Measure as sent by a host, with the aggregation as free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureRequest {
    pub unique_name: String,
    #[serde(default)]
    pub caption: Option<String>,
    /// "sum", "avg", "average", "min", "max", "count". Defaults to the
    /// engine's `defaultAggregation`.
    #[serde(default)]
    pub aggregation: Option<String>,
    #[serde(default)]
    pub format: Option<FormatSpec>,
}

impl MeasureRequest {
    pub fn into_measure(self, default_aggregation: AggregationType) -> PivotResult<Measure> {
        let aggregation = match &self.aggregation {
            Some(text) => text.parse::<AggregationType>()?,
            None => default_aggregation,
        };
        let caption = self.caption.unwrap_or_else(|| self.unique_name.clone());
        let mut measure = Measure::new(self.unique_name, caption, aggregation);
        measure.format = self.format;
        Ok(measure)
    }
}

/// Every mutation an adapter can request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PivotCommand {
    Sort {
        field: String,
        #[serde(default)]
        direction: SortDirection,
    },
    SetSort {
        sort: Option<SortConfig>,
    },
    SetMeasures {
        measures: Vec<MeasureRequest>,
    },
    SetSelectedMeasures {
        keys: Vec<String>,
    },
    SetDimensions {
        dimensions: Vec<Dimension>,
    },
    SetRows {
        rows: Vec<Dimension>,
    },
    SetColumns {
        columns: Vec<Dimension>,
    },
    SetGroupConfig {
        config: Option<GroupConfig>,
    },
    SetFilters {
        filters: Vec<FilterConfig>,
    },
    ClearFilters,
    SetPagination(PaginationConfig),
    GoToPage {
        page: usize,
    },
    NextPage,
    PreviousPage,
    SetPageSize {
        page_size: usize,
    },
    SwapRows {
        from: usize,
        to: usize,
    },
    SwapColumns {
        from: usize,
        to: usize,
    },
    DragRow {
        from: usize,
        to: usize,
    },
    DragColumn {
        from: usize,
        to: usize,
    },
    SetViewMode {
        mode: ViewMode,
    },
    Reset,
}

impl<R: PivotRecord + Clone> PivotEngine<R> {
    /// Applies `command`. Returns whether state changed; any error is
    /// emitted as a `pivotError` event instead of being returned.
    pub fn dispatch(&mut self, command: PivotCommand) -> bool {
        match self.apply_command(command) {
            Ok(changed) => changed,
            Err(err) => self.report(err),
        }
    }

    /// Parses and applies a JSON command, e.g.
    /// `{"type": "goToPage", "page": 2}`.
    pub fn dispatch_json(&mut self, json: &str) -> bool {
        match serde_json::from_str::<PivotCommand>(json) {
            Ok(command) => self.dispatch(command),
            Err(err) => self.report(PivotError::InvalidCommand(err.to_string())),
        }
    }

    fn report(&mut self, err: PivotError) -> bool {
        log::warn!(target: "pivot", "command failed: {}", err);
        self.emit(PivotEvent::Error(err));
        false
    }

    fn apply_command(&mut self, command: PivotCommand) -> PivotResult<bool> {
        let changed = match command {
            PivotCommand::Sort { field, direction } => self.sort(field, direction),
            PivotCommand::SetSort { sort } => self.set_sort(sort),
            PivotCommand::SetMeasures { measures } => {
                let default_aggregation = self.options().default_aggregation;
                let measures = measures
                    .into_iter()
                    .map(|m| m.into_measure(default_aggregation))
                    .collect::<PivotResult<Vec<_>>>()?;
                self.set_measures(measures)?;
                true
            }
            PivotCommand::SetSelectedMeasures { keys } => self.set_selected_measures(keys),
            PivotCommand::SetDimensions { dimensions } => {
                self.set_dimensions(dimensions)?;
                true
            }
            PivotCommand::SetRows { rows } => {
                self.set_rows(rows)?;
                true
            }
            PivotCommand::SetColumns { columns } => {
                self.set_columns(columns)?;
                true
            }
            PivotCommand::SetGroupConfig { config } => {
                self.set_group_config(config)?;
                true
            }
            PivotCommand::SetFilters { filters } => self.set_filters(filters),
            PivotCommand::ClearFilters => self.clear_filters(),
            PivotCommand::SetPagination(config) => self.set_pagination(config),
            PivotCommand::GoToPage { page } => self.go_to_page(page),
            PivotCommand::NextPage => self.next_page(),
            PivotCommand::PreviousPage => self.previous_page(),
            PivotCommand::SetPageSize { page_size } => self.set_page_size(page_size),
            PivotCommand::SwapRows { from, to } => self.swap_rows(from, to),
            PivotCommand::SwapColumns { from, to } => self.swap_columns(from, to),
            PivotCommand::DragRow { from, to } => self.drag_row(from, to),
            PivotCommand::DragColumn { from, to } => self.drag_column(from, to),
            PivotCommand::SetViewMode { mode } => self.set_view_mode(mode),
            PivotCommand::Reset => self.reset(),
        };
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::PivotOptions;
    use crate::record;
    use crate::record::Record;
    use std::sync::{Arc, Mutex};

    fn engine() -> PivotEngine {
        let data: Vec<Record> = vec![
            record! { "p" => "A", "sales" => 100 },
            record! { "p" => "B", "sales" => 50 },
        ];
        let options = PivotOptions {
            rows: vec![Dimension::new("p", "Product")],
            measures: vec![Measure::new("sales", "Sales", AggregationType::Sum)],
            default_aggregation: AggregationType::Max,
            ..PivotOptions::default()
        };
        PivotEngine::from_parts(data, options).unwrap()
    }

    fn capture_errors(engine: &mut PivotEngine) -> Arc<Mutex<Vec<PivotError>>> {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        engine.subscribe(move |event| {
            if let PivotEvent::Error(err) = event {
                sink.lock().unwrap().push(err.clone());
            }
        });
        errors
    }

    #[test]
    fn json_commands_drive_the_engine() {
        let mut engine = engine();
        assert!(engine.dispatch_json(r#"{"type": "sort", "field": "sales", "direction": "asc"}"#));
        assert_eq!(engine.state().processed_data.row_keys, vec!["B", "A"]);

        assert!(engine.dispatch_json(r#"{"type": "setPageSize", "pageSize": 1}"#));
        assert!(engine.dispatch_json(r#"{"type": "goToPage", "page": 9}"#));
        assert_eq!(engine.get_pagination().current_page, 2);
    }

    #[test]
    fn unknown_aggregation_becomes_an_error_event() {
        let mut engine = engine();
        let errors = capture_errors(&mut engine);

        let changed = engine.dispatch_json(
            r#"{"type": "setMeasures", "measures": [{"uniqueName": "sales", "aggregation": "median"}]}"#,
        );

        assert!(!changed);
        assert_eq!(
            *errors.lock().unwrap(),
            vec![PivotError::UnknownAggregation("median".to_string())]
        );
        assert_eq!(engine.state().measures[0].key(), "sum_sales");
    }

    #[test]
    fn malformed_json_is_an_invalid_command() {
        let mut engine = engine();
        let errors = capture_errors(&mut engine);

        assert!(!engine.dispatch_json(r#"{"type": "teleport"}"#));
        let errors = errors.lock().unwrap();
        assert!(matches!(errors.as_slice(), [PivotError::InvalidCommand(_)]));
        assert!(!errors[0].is_configuration());
    }

    #[test]
    fn missing_aggregation_uses_the_default() {
        let mut engine = engine();
        assert!(engine.dispatch(PivotCommand::SetMeasures {
            measures: vec![MeasureRequest {
                unique_name: "sales".into(),
                caption: None,
                aggregation: None,
                format: None,
            }],
        }));
        assert_eq!(engine.state().processed_data.totals["max_sales"], 100.0);
        assert_eq!(engine.state().measures[0].caption, "sales");
    }
}
