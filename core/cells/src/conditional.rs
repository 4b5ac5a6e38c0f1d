//! FILENAME: core/cells/src/conditional.rs
//! PURPOSE: Conditional formatting rules (value range -> visual attributes).
//! CONTEXT: Evaluated by the consumer per displayed cell. Rules are checked in
//! order and the first matching rule wins.

use serde::{Deserialize, Serialize};

use crate::style::StyleAttributes;

/// Cell value comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "Greater than", alias = "greaterThan")]
    GreaterThan,
    #[serde(rename = "Less than", alias = "lessThan")]
    LessThan,
    #[serde(rename = "Equal to", alias = "equalTo")]
    EqualTo,
    #[serde(rename = "Between", alias = "between")]
    Between,
}

/// The comparison part of a rule. Values are kept as entered by the user and
/// parsed on evaluation; an unparsable bound never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalCondition {
    pub operator: ConditionOperator,
    pub value1: String,
    /// Upper bound for `Between`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
}

/// A conditional formatting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalFormatRule {
    /// Field (usually a measure) the rule is restricted to. `None` applies
    /// to every value cell.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub condition: ConditionalCondition,
    pub format: StyleAttributes,
}

impl ConditionalFormatRule {
    pub fn new(operator: ConditionOperator, value1: impl ToString, format: StyleAttributes) -> Self {
        ConditionalFormatRule {
            field: None,
            condition: ConditionalCondition {
                operator,
                value1: value1.to_string(),
                value2: None,
            },
            format,
        }
    }

    pub fn between(low: impl ToString, high: impl ToString, format: StyleAttributes) -> Self {
        ConditionalFormatRule {
            field: None,
            condition: ConditionalCondition {
                operator: ConditionOperator::Between,
                value1: low.to_string(),
                value2: Some(high.to_string()),
            },
            format,
        }
    }

    pub fn for_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Whether the rule targets `field` (rules without a field target all).
    pub fn applies_to(&self, field: &str) -> bool {
        self.field.as_deref().map_or(true, |f| f == field)
    }

    pub fn matches(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let value1: f64 = match self.condition.value1.trim().parse() {
            Ok(v) => v,
            Err(_) => return false,
        };

        match self.condition.operator {
            ConditionOperator::GreaterThan => value > value1,
            ConditionOperator::LessThan => value < value1,
            ConditionOperator::EqualTo => (value - value1).abs() < f64::EPSILON,
            ConditionOperator::Between => {
                if let Some(ref v2_str) = self.condition.value2 {
                    if let Ok(value2) = v2_str.trim().parse::<f64>() {
                        let min = value1.min(value2);
                        let max = value1.max(value2);
                        return value >= min && value <= max;
                    }
                }
                false
            }
        }
    }
}

/// Returns the style of the first rule matching `value`, if any.
pub fn match_conditional_format(value: f64, rules: &[ConditionalFormatRule]) -> Option<&StyleAttributes> {
    rules.iter().find(|rule| rule.matches(value)).map(|rule| &rule.format)
}
