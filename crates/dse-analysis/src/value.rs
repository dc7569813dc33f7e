//! Values assigned to variables by a data point

use serde::{Deserialize, Serialize};
use std::fmt;

const DOUBLE_TOLERANCE: f64 = 1.0e-8;

/// Kind of value a variable takes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Index into a discrete variable's measures
    Integer,
    /// Continuous value
    Double,
}

/// One entry of a data point's value vector
///
/// `Null` is a typed placeholder: a discrete position with no measure picked,
/// or a continuous position when converting from a measure selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value_type", content = "value")]
pub enum VariableValue {
    Integer(i64),
    Double(f64),
    Null(ValueType),
}

impl VariableValue {
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, VariableValue::Null(_))
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            VariableValue::Integer(_) | VariableValue::Null(ValueType::Integer) => ValueType::Integer,
            VariableValue::Double(_) | VariableValue::Null(ValueType::Double) => ValueType::Double,
        }
    }

    /// Non-negative integer view, usable as a measure index
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            VariableValue::Integer(i) => usize::try_from(*i).ok(),
            VariableValue::Double(_) | VariableValue::Null(_) => None,
        }
    }

    /// Numeric view; integers convert
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            VariableValue::Integer(i) => Some(*i as f64),
            VariableValue::Double(d) => Some(*d),
            VariableValue::Null(_) => None,
        }
    }

    /// Comparison used to find duplicate data points: a null on either side
    /// matches anything, doubles compare within a small tolerance.
    #[must_use]
    pub fn matches(&self, other: &VariableValue) -> bool {
        match (self, other) {
            (VariableValue::Null(_), _) | (_, VariableValue::Null(_)) => true,
            (VariableValue::Integer(a), VariableValue::Integer(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => {
                    (x - y).abs() <= DOUBLE_TOLERANCE * x.abs().max(y.abs()).max(1.0)
                }
                _ => false,
            },
        }
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Integer(value)
    }
}

impl From<usize> for VariableValue {
    fn from(value: usize) -> Self {
        VariableValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Double(value)
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Integer(i) => write!(f, "{i}"),
            VariableValue::Double(d) => write!(f, "{d}"),
            VariableValue::Null(_) => f.write_str("null"),
        }
    }
}
