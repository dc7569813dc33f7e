//! Script arguments

use crate::error::BclError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a script argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgumentType {
    Boolean,
    Double,
    Integer,
    String,
    Choice,
    Path,
}

/// A concrete argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
}

impl ArgumentValue {
    /// Numeric view, when there is one
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            ArgumentValue::Integer(i) => Some(*i as f64),
            ArgumentValue::Double(d) => Some(*d),
            ArgumentValue::Boolean(_) | ArgumentValue::String(_) => None,
        }
    }
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Boolean(b) => write!(f, "{b}"),
            ArgumentValue::Integer(i) => write!(f, "{i}"),
            ArgumentValue::Double(d) => write!(f, "{d}"),
            ArgumentValue::String(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ArgumentValue {
    fn from(value: f64) -> Self {
        ArgumentValue::Double(value)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        ArgumentValue::Integer(value)
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        ArgumentValue::Boolean(value)
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::String(value.to_string())
    }
}

/// A named input of a measure script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    name: String,
    #[serde(default)]
    display_name: String,
    argument_type: ArgumentType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    value: Option<ArgumentValue>,
    #[serde(default)]
    default_value: Option<ArgumentValue>,
    #[serde(default)]
    choices: Vec<String>,
}

impl Argument {
    /// Create an argument with no value and no default
    #[must_use]
    pub fn new(name: impl Into<String>, argument_type: ArgumentType, required: bool) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            argument_type,
            required,
            value: None,
            default_value: None,
            choices: Vec::new(),
        }
    }

    #[must_use]
    pub fn make_double_argument(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentType::Double, required)
    }

    #[must_use]
    pub fn make_integer_argument(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentType::Integer, required)
    }

    #[must_use]
    pub fn make_bool_argument(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentType::Boolean, required)
    }

    #[must_use]
    pub fn make_string_argument(name: impl Into<String>, required: bool) -> Self {
        Self::new(name, ArgumentType::String, required)
    }

    #[must_use]
    pub fn make_choice_argument(
        name: impl Into<String>,
        choices: impl IntoIterator<Item = impl Into<String>>,
        required: bool,
    ) -> Self {
        let mut arg = Self::new(name, ArgumentType::Choice, required);
        arg.choices = choices.into_iter().map(Into::into).collect();
        arg
    }

    #[inline]
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the default; an ill-typed default is dropped with a warning
    #[must_use]
    pub fn with_default(mut self, default: impl Into<ArgumentValue>) -> Self {
        match self.coerce(default.into()) {
            Ok(v) => self.default_value = Some(v),
            Err(e) => tracing::warn!("Ignoring default for argument '{}': {}", self.name, e),
        }
        self
    }

    /// Set the value, returning the argument for chaining
    pub fn with_value(mut self, value: impl Into<ArgumentValue>) -> Result<Self, BclError> {
        self.set_value(value)?;
        Ok(self)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn argument_type(&self) -> ArgumentType {
        self.argument_type
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    #[must_use]
    pub fn value(&self) -> Option<&ArgumentValue> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&ArgumentValue> {
        self.default_value.as_ref()
    }

    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    #[must_use]
    pub fn has_default_value(&self) -> bool {
        self.default_value.is_some()
    }

    /// A required argument needs a value or a default
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.required || self.has_value() || self.has_default_value()
    }

    /// The value the script will see: the explicit value, else the default
    #[must_use]
    pub fn effective_value(&self) -> Option<&ArgumentValue> {
        self.value.as_ref().or(self.default_value.as_ref())
    }

    fn invalid(&self, reason: impl Into<String>) -> BclError {
        BclError::InvalidArgumentValue {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn coerce(&self, value: ArgumentValue) -> Result<ArgumentValue, BclError> {
        match (self.argument_type, value) {
            (ArgumentType::Boolean, v @ ArgumentValue::Boolean(_))
            | (ArgumentType::Integer, v @ ArgumentValue::Integer(_))
            | (ArgumentType::Double, v @ ArgumentValue::Double(_))
            | (ArgumentType::String | ArgumentType::Path, v @ ArgumentValue::String(_)) => Ok(v),
            #[allow(clippy::cast_precision_loss)]
            (ArgumentType::Double, ArgumentValue::Integer(i)) => Ok(ArgumentValue::Double(i as f64)),
            (ArgumentType::Choice, ArgumentValue::String(s)) => {
                if self.choices.iter().any(|c| *c == s) {
                    Ok(ArgumentValue::String(s))
                } else {
                    Err(self.invalid(format!("'{s}' is not one of {:?}", self.choices)))
                }
            }
            (t, v) => Err(self.invalid(format!("{v:?} does not fit a {t:?} argument"))),
        }
    }

    /// Set the value, checking it against the declared type
    pub fn set_value(&mut self, value: impl Into<ArgumentValue>) -> Result<(), BclError> {
        let value = self.coerce(value.into())?;
        self.value = Some(value);
        Ok(())
    }

    /// Parse a textual value according to the declared type
    pub fn set_value_from_string(&mut self, text: &str) -> Result<(), BclError> {
        let value = match self.argument_type {
            ArgumentType::Boolean => text
                .trim()
                .parse::<bool>()
                .map(ArgumentValue::Boolean)
                .map_err(|e| self.invalid(e.to_string()))?,
            ArgumentType::Integer => text
                .trim()
                .parse::<i64>()
                .map(ArgumentValue::Integer)
                .map_err(|e| self.invalid(e.to_string()))?,
            ArgumentType::Double => text
                .trim()
                .parse::<f64>()
                .map(ArgumentValue::Double)
                .map_err(|e| self.invalid(e.to_string()))?,
            ArgumentType::String | ArgumentType::Choice | ArgumentType::Path => {
                ArgumentValue::String(text.to_string())
            }
        };
        self.set_value(value)
    }

    pub fn clear_value(&mut self) {
        self.value = None;
    }

    /// Textual form of the effective value
    #[must_use]
    pub fn value_as_string(&self) -> Option<String> {
        self.effective_value().map(ToString::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_accepts_integers() {
        let mut arg = Argument::make_double_argument("wwr", true);
        arg.set_value(1_i64).unwrap();
        assert_eq!(arg.value(), Some(&ArgumentValue::Double(1.0)));
        assert!(arg.set_value("high").is_err());
    }

    #[test]
    fn test_choice_validation() {
        let mut arg = Argument::make_choice_argument("facade", ["North", "South"], true);
        assert!(arg.set_value("North").is_ok());
        assert!(arg.set_value("Up").is_err());
        assert_eq!(arg.value_as_string().as_deref(), Some("North"));
    }

    #[test]
    fn test_completeness() {
        let arg = Argument::make_double_argument("offset", true);
        assert!(!arg.is_complete());
        assert!(arg.clone().with_default(0.5).is_complete());
        assert!(Argument::make_double_argument("optional", false).is_complete());
    }

    #[test]
    fn test_set_value_from_string() {
        let mut arg = Argument::make_integer_argument("stories", false);
        arg.set_value_from_string(" 3 ").unwrap();
        assert_eq!(arg.value(), Some(&ArgumentValue::Integer(3)));
        assert!(arg.set_value_from_string("three").is_err());
        assert_eq!(arg.value(), Some(&ArgumentValue::Integer(3)));
    }

    #[test]
    fn test_effective_value_prefers_explicit_value() {
        let mut arg = Argument::make_double_argument("wwr", true).with_default(0.4);
        assert_eq!(arg.value_as_string().as_deref(), Some("0.4"));
        arg.set_value(0.25).unwrap();
        assert_eq!(arg.value_as_string().as_deref(), Some("0.25"));
    }
}
