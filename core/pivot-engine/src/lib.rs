//! FILENAME: core/pivot-engine/src/lib.rs
//! Headless pivot table engine.
//!
//! Turns host-owned records into a grouped, aggregated, sorted, paginated
//! view and keeps that view consistent under any sequence of mutations.
//! It depends on `cells` only for shared value, formatting and style types.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot table IS)
//! - `record`: How the engine reads host records
//! - `filter`, `group`, `aggregate`, `sort`: The pure pipeline stages
//! - `order`, `pagination`: Per-mode UI overlays
//! - `view`: The immutable snapshot consumers render (WHAT we display)
//! - `engine`: The stateful facade (HOW it all fits together)
//! - `events`, `commands`: Notification and the adapter boundary

pub mod aggregate;
pub mod commands;
pub mod definition;
pub mod engine;
pub mod error;
pub mod events;
pub mod filter;
pub mod group;
pub mod order;
pub mod pagination;
pub mod record;
pub mod sort;
pub mod view;

pub use aggregate::{aggregate, AggregateAccumulator};
pub use commands::{MeasureRequest, PivotCommand};
pub use definition::*;
pub use engine::PivotEngine;
pub use error::{PivotError, PivotResult};
pub use events::{Listener, PivotEvent, SubscriptionId};
pub use filter::{apply_filters, matches_filter};
pub use group::{group, Group, Grouping};
pub use order::AxisOrder;
pub use pagination::{PaginationConfig, PaginationState};
pub use record::{PivotRecord, Record};
pub use sort::{sort_keys, sort_records, KeySort};
pub use view::{EngineState, ProcessedData, ProcessedHeader, ProcessedRow, RawData};

pub use cells::{
    match_conditional_format, CellValue, ConditionOperator, ConditionalFormatRule, FormatSpec,
    FormatType, StyleAttributes, TextAlign,
};
