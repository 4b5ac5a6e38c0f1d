//! FILENAME: core/pivot-engine/src/error.rs

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the pivot engine.
///
/// Only misconfiguration is an error. Out-of-range indices, unknown sort or
/// filter fields and records missing fields are absorbed by the engine.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum PivotError {
    #[error("Unknown aggregation: {0}")]
    UnknownAggregation(String),

    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),

    #[error("Invalid measure: {0}")]
    InvalidMeasure(String),

    #[error("Duplicate measure: {0}")]
    DuplicateMeasure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

impl PivotError {
    /// Configuration errors are raised at setup time and must fail fast.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, PivotError::InvalidCommand(_))
    }
}

impl From<serde_json::Error> for PivotError {
    fn from(err: serde_json::Error) -> Self {
        PivotError::InvalidConfig(err.to_string())
    }
}

pub type PivotResult<T> = Result<T, PivotError>;
