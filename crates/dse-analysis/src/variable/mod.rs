//! Variables: the parametric dimensions of a problem
//!
//! Input variables sit in the workflow and choose what runs:
//! - [`MeasureGroup`] picks one of several measures (discrete)
//! - [`RubyContinuousVariable`] sets a numeric script argument (continuous)
//!
//! [`OutputAttributeVariable`] reads a number back out of a finished data
//! point and only appears inside response functions.

mod measure_group;
mod output_attribute;
mod ruby_continuous;

pub use measure_group::MeasureGroup;
pub(crate) use measure_group::MeasureGroupData;
pub use output_attribute::OutputAttributeVariable;
pub(crate) use output_attribute::OutputAttributeVariableData;
pub use ruby_continuous::RubyContinuousVariable;
pub(crate) use ruby_continuous::RubyContinuousVariableData;

use crate::error::AnalysisError;
use crate::object::{analysis_object_enum, ParentLink};
use crate::options::WorkflowOptions;
use crate::uncertainty::UncertaintyDescription;
use crate::value::{ValueType, VariableValue};
use dse_runmanager::{FileType, WorkItem};

/// A variable that can be plugged into a workflow step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputVariable {
    MeasureGroup(MeasureGroup),
    RubyContinuous(RubyContinuousVariable),
}

analysis_object_enum!(InputVariable {
    MeasureGroup(MeasureGroup),
    RubyContinuous(RubyContinuousVariable),
});

impl InputVariable {
    #[must_use]
    pub fn is_discrete(&self) -> bool {
        matches!(self, InputVariable::MeasureGroup(_))
    }

    #[must_use]
    pub fn is_continuous(&self) -> bool {
        !self.is_discrete()
    }

    #[must_use]
    pub fn as_measure_group(&self) -> Option<&MeasureGroup> {
        match self {
            InputVariable::MeasureGroup(g) => Some(g),
            InputVariable::RubyContinuous(_) => None,
        }
    }

    #[must_use]
    pub fn as_ruby_continuous(&self) -> Option<&RubyContinuousVariable> {
        match self {
            InputVariable::RubyContinuous(v) => Some(v),
            InputVariable::MeasureGroup(_) => None,
        }
    }

    /// Kind of value a data point stores for this variable
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        match self {
            InputVariable::MeasureGroup(_) => ValueType::Integer,
            InputVariable::RubyContinuous(_) => ValueType::Double,
        }
    }

    #[must_use]
    pub fn is_valid(&self, value: &VariableValue) -> bool {
        match self {
            InputVariable::MeasureGroup(g) => g.is_valid(value),
            InputVariable::RubyContinuous(v) => v.is_valid(value),
        }
    }

    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        match self {
            InputVariable::MeasureGroup(g) => g.input_file_type(),
            InputVariable::RubyContinuous(v) => v.input_file_type(),
        }
    }

    #[must_use]
    pub fn output_file_type(&self) -> Option<FileType> {
        match self {
            InputVariable::MeasureGroup(g) => g.output_file_type(),
            InputVariable::RubyContinuous(v) => v.output_file_type(),
        }
    }

    pub fn create_work_item(
        &self,
        value: &VariableValue,
        options: &WorkflowOptions,
    ) -> Result<WorkItem, AnalysisError> {
        match self {
            InputVariable::MeasureGroup(g) => g.create_work_item(value, options),
            InputVariable::RubyContinuous(v) => v.create_work_item(value, options),
        }
    }

    #[must_use]
    pub fn uncertainty_description(&self) -> Option<UncertaintyDescription> {
        match self {
            InputVariable::MeasureGroup(g) => g.uncertainty_description(),
            InputVariable::RubyContinuous(v) => v.uncertainty_description(),
        }
    }

    pub fn set_uncertainty_description(&self, description: Option<UncertaintyDescription>) {
        match self {
            InputVariable::MeasureGroup(g) => g.set_uncertainty_description(description),
            InputVariable::RubyContinuous(v) => v.set_uncertainty_description(description),
        }
    }

    #[must_use]
    pub fn duplicate(&self) -> Self {
        match self {
            InputVariable::MeasureGroup(g) => InputVariable::MeasureGroup(g.duplicate()),
            InputVariable::RubyContinuous(v) => InputVariable::RubyContinuous(v.duplicate()),
        }
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        match self {
            InputVariable::MeasureGroup(g) => g.set_parent(parent),
            InputVariable::RubyContinuous(v) => v.set_parent(parent),
        }
    }
}

/// Any variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    MeasureGroup(MeasureGroup),
    RubyContinuous(RubyContinuousVariable),
    OutputAttribute(OutputAttributeVariable),
}

analysis_object_enum!(Variable {
    MeasureGroup(MeasureGroup),
    RubyContinuous(RubyContinuousVariable),
    OutputAttribute(OutputAttributeVariable),
});

impl Variable {
    /// The workflow-facing view, if this is an input variable
    #[must_use]
    pub fn as_input_variable(&self) -> Option<InputVariable> {
        match self {
            Variable::MeasureGroup(g) => Some(InputVariable::MeasureGroup(g.clone())),
            Variable::RubyContinuous(v) => Some(InputVariable::RubyContinuous(v.clone())),
            Variable::OutputAttribute(_) => None,
        }
    }

    #[must_use]
    pub fn is_discrete(&self) -> bool {
        matches!(self, Variable::MeasureGroup(_))
    }
}

impl From<InputVariable> for Variable {
    fn from(variable: InputVariable) -> Self {
        match variable {
            InputVariable::MeasureGroup(g) => Variable::MeasureGroup(g),
            InputVariable::RubyContinuous(v) => Variable::RubyContinuous(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{NullMeasure, RubyMeasure};
    use crate::object::AnalysisObject;
    use dse_bcl::Argument;

    #[test]
    fn test_dispatch() {
        let group = MeasureGroup::new("g", vec![NullMeasure::new(true).into()]).unwrap();
        let measure = RubyMeasure::from_script("a.rb", Some(FileType::Idf), Some(FileType::Idf), false);
        let rcv = RubyContinuousVariable::new("x", Argument::make_double_argument("x", true), measure);

        let discrete: InputVariable = group.clone().into();
        let continuous: InputVariable = rcv.into();
        assert!(discrete.is_discrete());
        assert_eq!(discrete.value_type(), ValueType::Integer);
        assert_eq!(continuous.value_type(), ValueType::Double);
        assert_eq!(continuous.input_file_type(), Some(FileType::Idf));
        assert_eq!(discrete.uuid(), group.uuid());

        let any: Variable = discrete.into();
        assert!(any.is_discrete());
        assert!(any.as_input_variable().is_some());
        let output: Variable = OutputAttributeVariable::new("eui", "site_eui").into();
        assert!(output.as_input_variable().is_none());
    }
}
