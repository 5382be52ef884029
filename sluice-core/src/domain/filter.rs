//! Filter domain types
//!
//! A [`Filter`] is an AND of typed [`Predicate`]s used by list endpoints.
//! Predicates are validated when built, so every value of the type pairs its
//! operation with a compatible operand.
//!
//! On the wire a predicate carries `key`, `operation` and exactly one of
//! `int_value`, `long_value` (string encoded), `string_value`,
//! `timestamp_value` (RFC3339), `int_values`, `long_values`, `string_values`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Comparison applied by a predicate
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    #[default]
    #[serde(rename = "OPERATION_UNSPECIFIED")]
    Unspecified,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEquals,
    LessThan,
    LessThanEquals,
    In,
    IsSubstring,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Unspecified => "OPERATION_UNSPECIFIED",
            Operation::Equals => "EQUALS",
            Operation::NotEquals => "NOT_EQUALS",
            Operation::GreaterThan => "GREATER_THAN",
            Operation::GreaterThanEquals => "GREATER_THAN_EQUALS",
            Operation::LessThan => "LESS_THAN",
            Operation::LessThanEquals => "LESS_THAN_EQUALS",
            Operation::In => "IN",
            Operation::IsSubstring => "IS_SUBSTRING",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single value a predicate compares against
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i32),
    Long(i64),
    String(String),
    Timestamp(DateTime<Utc>),
    IntValues(Vec<i32>),
    LongValues(Vec<i64>),
    StringValues(Vec<String>),
}

impl Operand {
    /// Whether this operand is one of the list variants used with `IN`
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Operand::IntValues(_) | Operand::LongValues(_) | Operand::StringValues(_)
        )
    }

    /// Wire field name carrying this operand
    pub fn field_name(&self) -> &'static str {
        match self {
            Operand::Int(_) => "int_value",
            Operand::Long(_) => "long_value",
            Operand::String(_) => "string_value",
            Operand::Timestamp(_) => "timestamp_value",
            Operand::IntValues(_) => "int_values",
            Operand::LongValues(_) => "long_values",
            Operand::StringValues(_) => "string_values",
        }
    }
}

/// Predicate validation failure, always naming the offending key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("predicate has an empty key")]
    EmptyKey,

    #[error("predicate '{key}' has no operation")]
    UnspecifiedOperation { key: String },

    #[error("predicate '{key}' has no operand")]
    MissingOperand { key: String },

    #[error("predicate '{key}' has more than one operand: {fields}")]
    MultipleOperands { key: String, fields: String },

    #[error("predicate '{key}': operation {operation} cannot be used with {operand}")]
    OperandMismatch {
        key: String,
        operation: Operation,
        operand: &'static str,
    },

    #[error("predicate '{key}': '{value}' is not a valid 64-bit integer")]
    InvalidLong { key: String, value: String },
}

/// A single typed condition on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PredicateWire", into = "PredicateWire")]
pub struct Predicate {
    key: String,
    operation: Operation,
    operand: Operand,
}

impl Predicate {
    /// Build a predicate, rejecting operation/operand combinations that can
    /// never be evaluated
    pub fn new(
        key: impl Into<String>,
        operation: Operation,
        operand: Operand,
    ) -> Result<Self, FilterError> {
        let key = key.into();
        validate(&key, operation, &operand)?;
        Ok(Self {
            key,
            operation,
            operand,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }
}

fn validate(key: &str, operation: Operation, operand: &Operand) -> Result<(), FilterError> {
    if key.is_empty() {
        return Err(FilterError::EmptyKey);
    }

    let compatible = match operation {
        Operation::Unspecified => {
            return Err(FilterError::UnspecifiedOperation {
                key: key.to_string(),
            });
        }
        Operation::In => operand.is_array(),
        Operation::IsSubstring => matches!(operand, Operand::String(_)),
        Operation::Equals
        | Operation::NotEquals
        | Operation::GreaterThan
        | Operation::GreaterThanEquals
        | Operation::LessThan
        | Operation::LessThanEquals => !operand.is_array(),
    };

    if compatible {
        Ok(())
    } else {
        Err(FilterError::OperandMismatch {
            key: key.to_string(),
            operation,
            operand: operand.field_name(),
        })
    }
}

/// Logical AND of predicates; empty matches everything
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Parse the JSON filter encoding, validating every predicate
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// =============================================================================
// Wire Representation
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntValues {
    #[serde(default)]
    pub values: Vec<i32>,
}

/// A 64-bit integer on the wire: decimal string (the canonical encoding) or
/// JSON number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LongValue {
    Number(i64),
    Text(String),
}

impl From<i64> for LongValue {
    fn from(value: i64) -> Self {
        LongValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LongValues {
    #[serde(default)]
    pub values: Vec<LongValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringValues {
    #[serde(default)]
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PredicateWire {
    #[serde(default)]
    key: String,
    #[serde(default)]
    operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    int_value: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    long_value: Option<LongValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp_value: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    int_values: Option<IntValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    long_values: Option<LongValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_values: Option<StringValues>,
}

fn parse_long(key: &str, value: &LongValue) -> Result<i64, FilterError> {
    match value {
        LongValue::Number(v) => Ok(*v),
        LongValue::Text(text) => text.parse::<i64>().map_err(|_| FilterError::InvalidLong {
            key: key.to_string(),
            value: text.clone(),
        }),
    }
}

impl TryFrom<PredicateWire> for Predicate {
    type Error = FilterError;

    fn try_from(wire: PredicateWire) -> Result<Self, Self::Error> {
        let key = wire.key;
        let mut operands = Vec::with_capacity(1);

        if let Some(v) = wire.int_value {
            operands.push(Operand::Int(v));
        }
        if let Some(v) = wire.long_value {
            operands.push(Operand::Long(parse_long(&key, &v)?));
        }
        if let Some(v) = wire.string_value {
            operands.push(Operand::String(v));
        }
        if let Some(v) = wire.timestamp_value {
            operands.push(Operand::Timestamp(v));
        }
        if let Some(v) = wire.int_values {
            operands.push(Operand::IntValues(v.values));
        }
        if let Some(v) = wire.long_values {
            let values = v
                .values
                .iter()
                .map(|s| parse_long(&key, s))
                .collect::<Result<Vec<_>, _>>()?;
            operands.push(Operand::LongValues(values));
        }
        if let Some(v) = wire.string_values {
            operands.push(Operand::StringValues(v.values));
        }

        if operands.len() > 1 {
            let fields = operands
                .iter()
                .map(Operand::field_name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(FilterError::MultipleOperands { key, fields });
        }

        match operands.pop() {
            Some(operand) => Predicate::new(key, wire.operation, operand),
            None if key.is_empty() => Err(FilterError::EmptyKey),
            None => Err(FilterError::MissingOperand { key }),
        }
    }
}

impl From<Predicate> for PredicateWire {
    fn from(predicate: Predicate) -> Self {
        let mut wire = PredicateWire {
            key: predicate.key,
            operation: predicate.operation,
            ..Default::default()
        };

        match predicate.operand {
            Operand::Int(v) => wire.int_value = Some(v),
            Operand::Long(v) => wire.long_value = Some(LongValue::from(v)),
            Operand::String(v) => wire.string_value = Some(v),
            Operand::Timestamp(v) => wire.timestamp_value = Some(v),
            Operand::IntValues(values) => wire.int_values = Some(IntValues { values }),
            Operand::LongValues(values) => {
                wire.long_values = Some(LongValues {
                    values: values.into_iter().map(LongValue::from).collect(),
                })
            }
            Operand::StringValues(values) => wire.string_values = Some(StringValues { values }),
        }

        wire
    }
}
