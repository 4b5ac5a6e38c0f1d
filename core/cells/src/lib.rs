//! FILENAME: core/cells/src/lib.rs
//! PURPOSE: Main library entry point for shared cell types.
//! CONTEXT: Re-exports the scalar value, formatting and conditional style
//! types used by the pivot engine and its consumers.

pub mod cell;
pub mod conditional;
pub mod number_format;
pub mod style;

// Re-export commonly used types at the crate root
pub use cell::{compare_text_keys, compare_values, locale_compare, CellValue};
pub use conditional::{
    match_conditional_format, ConditionOperator, ConditionalCondition, ConditionalFormatRule,
};
pub use number_format::{format_number, format_value, FormatSpec, FormatType};
pub use style::{StyleAttributes, TextAlign};
