//! Continuous variables bound to one argument of a script measure

use crate::continuous::{ContinuousRange, ContinuousVariable};
use crate::error::AnalysisError;
use crate::measure::RubyMeasure;
use crate::object::{analysis_object_handle, AnalysisObject, ChangeType, ObjectBase, ParentLink, ParentObject};
use crate::options::WorkflowOptions;
use crate::problem::StepTypes;
use crate::uncertainty::UncertaintyDescription;
use crate::value::VariableValue;
use dse_bcl::{Argument, ArgumentType, ArgumentValue};
use dse_runmanager::{FileType, WorkItem};
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct RubyContinuousVariableData {
    pub(crate) base: ObjectBase,
    pub(crate) range: ContinuousRange,
    pub(crate) argument: Argument,
    pub(crate) measure: RubyMeasure,
    pub(crate) uncertainty: Option<UncertaintyDescription>,
}

/// Continuous variable that feeds one argument of a (possibly shared) script measure.
///
/// Several variables may hold the same [`RubyMeasure`] handle. Placed next to
/// each other in a workflow they form a compound chain that runs the script
/// once with every variable's value applied.
#[derive(Clone)]
pub struct RubyContinuousVariable {
    pub(crate) inner: Arc<RwLock<RubyContinuousVariableData>>,
}

analysis_object_handle!(RubyContinuousVariable, clear_dirty_with = clear_dirty_tree);

impl ContinuousVariable for RubyContinuousVariable {
    fn range(&self) -> ContinuousRange {
        self.inner.read().range
    }

    fn update_range(&self, kind: ChangeType, edit: impl FnOnce(&mut ContinuousRange) -> bool) -> bool {
        let changed = edit(&mut self.inner.write().range);
        if changed {
            self.on_change(kind);
        }
        changed
    }
}

impl RubyContinuousVariable {
    #[must_use]
    pub fn new(name: impl Into<String>, argument: Argument, measure: RubyMeasure) -> Self {
        Self::from_parts(ObjectBase::new(name), ContinuousRange::new(), argument, measure, None)
    }

    pub(crate) fn from_parts(
        base: ObjectBase,
        range: ContinuousRange,
        argument: Argument,
        measure: RubyMeasure,
        uncertainty: Option<UncertaintyDescription>,
    ) -> Self {
        if !matches!(argument.argument_type(), ArgumentType::Double | ArgumentType::Integer) {
            tracing::warn!(
                "Continuous variable bound to non-numeric argument '{}' ({:?})",
                argument.name(),
                argument.argument_type()
            );
        }
        let variable = Self {
            inner: Arc::new(RwLock::new(RubyContinuousVariableData {
                base,
                range,
                argument,
                measure: measure.clone(),
                uncertainty,
            })),
        };
        measure.attach_holder(&variable);
        variable
    }

    #[inline]
    #[must_use]
    pub fn with_range(self, range: ContinuousRange) -> Self {
        self.inner.write().range = range;
        self
    }

    pub(crate) fn link(&self) -> ParentLink {
        ParentLink::RubyContinuousVariable(Arc::downgrade(&self.inner))
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }

    /// The argument this variable sets
    #[must_use]
    pub fn argument(&self) -> Argument {
        self.inner.read().argument.clone()
    }

    pub fn set_argument(&self, argument: Argument) {
        self.inner.write().argument = argument;
        self.on_change(ChangeType::InvalidatesResults);
    }

    /// The shared measure handle
    #[must_use]
    pub fn ruby_measure(&self) -> RubyMeasure {
        self.inner.read().measure.clone()
    }

    /// Swap the underlying measure; refused when its file types do not fit the workflow
    pub fn set_ruby_measure(&self, measure: RubyMeasure) -> bool {
        let current = self.ruby_measure();
        if current == measure {
            return true;
        }
        if let Some(ParentObject::WorkflowStep(step)) = self.parent() {
            let types = StepTypes::for_measure(&measure, self.name());
            if !step.types_change_is_compatible(types) {
                tracing::info!(
                    "Measure '{}' does not fit the workflow position of variable '{}'",
                    measure.name(),
                    self.name()
                );
                return false;
            }
        }
        current.detach_holder(self);
        measure.attach_holder(self);
        self.inner.write().measure = measure;
        self.on_change(ChangeType::InvalidatesDataPoints);
        true
    }

    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        self.ruby_measure().input_file_type()
    }

    #[must_use]
    pub fn output_file_type(&self) -> Option<FileType> {
        self.ruby_measure().output_file_type()
    }

    /// Called by the shared measure before it changes its file types
    pub(crate) fn measure_types_are_compatible(
        &self,
        measure: &RubyMeasure,
        input: Option<FileType>,
        output: Option<FileType>,
    ) -> bool {
        match self.parent() {
            Some(ParentObject::WorkflowStep(step)) => step.measure_types_are_compatible(measure, input, output),
            _ => true,
        }
    }

    /// A numeric value inside the bounds
    #[must_use]
    pub fn is_valid(&self, value: &VariableValue) -> bool {
        value.as_f64().is_some_and(|v| self.is_feasible(v))
    }

    /// The bound argument carrying `value`; integer arguments are rounded
    pub(crate) fn bound_argument(&self, value: f64) -> Result<Argument, AnalysisError> {
        let mut argument = self.argument();
        let typed: ArgumentValue = match argument.argument_type() {
            #[allow(clippy::cast_possible_truncation)]
            ArgumentType::Integer => (value.round() as i64).into(),
            _ => value.into(),
        };
        argument.set_value(typed).map_err(|e| AnalysisError::InvalidValue {
            variable: self.name(),
            reason: e.to_string(),
        })?;
        Ok(argument)
    }

    /// Job specification running a copy of the measure with this variable's argument set
    pub fn create_work_item(
        &self,
        value: &VariableValue,
        options: &WorkflowOptions,
    ) -> Result<WorkItem, AnalysisError> {
        let number = value.as_f64().ok_or_else(|| AnalysisError::InvalidValue {
            variable: self.name(),
            reason: format!("{value} is not numeric"),
        })?;
        let measure = self.ruby_measure().duplicate();
        measure.add_argument(self.bound_argument(number)?);
        Ok(measure.create_work_item(options))
    }

    #[must_use]
    pub fn uncertainty_description(&self) -> Option<UncertaintyDescription> {
        self.inner.read().uncertainty.clone()
    }

    pub fn set_uncertainty_description(&self, description: Option<UncertaintyDescription>) {
        self.inner.write().uncertainty = description;
        self.on_change(ChangeType::InvalidatesResults);
    }

    /// Deep copy; the measure is duplicated as well
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let measure = self.ruby_measure().duplicate();
        self.duplicate_with_measure(measure)
    }

    /// Deep copy bound to an already duplicated measure, so copies of a
    /// compound chain keep sharing one measure
    pub(crate) fn duplicate_with_measure(&self, measure: RubyMeasure) -> Self {
        let (base, range, argument, uncertainty) = {
            let guard = self.inner.read();
            (
                guard.base.duplicate(),
                guard.range,
                guard.argument.clone(),
                guard.uncertainty.clone(),
            )
        };
        Self::from_parts(base, range, argument, measure, uncertainty)
    }

    fn clear_dirty_tree(&self) -> bool {
        self.ruby_measure().clear_dirty_flag();
        self.write_base(ObjectBase::mark_clean);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dse_runmanager::JobType;
    use pretty_assertions::assert_eq;

    fn variable(argument: Argument) -> RubyContinuousVariable {
        let measure = RubyMeasure::from_script("facade.rb", Some(FileType::Osm), Some(FileType::Osm), true);
        RubyContinuousVariable::new("wwr", argument, measure).with_range(ContinuousRange::bounded(0.15, 0.6))
    }

    #[test]
    fn test_validity_follows_bounds() {
        let v = variable(Argument::make_double_argument("wwr", true));
        assert!(v.is_valid(&VariableValue::Double(0.3)));
        assert!(!v.is_valid(&VariableValue::Integer(0)));
        assert!(!v.is_valid(&VariableValue::Double(0.9)));
        assert!(!v.is_valid(&VariableValue::Null(crate::value::ValueType::Double)));
    }

    #[test]
    fn test_work_item_carries_value() {
        let v = variable(Argument::make_double_argument("wwr", true));
        let item = v.create_work_item(&VariableValue::Double(0.25), &WorkflowOptions::new()).unwrap();
        assert_eq!(item.job_type, JobType::Ruby);
        assert_eq!(item.param("argument.wwr"), Some("0.25"));
        assert!(v.ruby_measure().argument("wwr").is_none());
    }

    #[test]
    fn test_integer_argument_is_rounded() {
        let v = variable(Argument::make_integer_argument("stories", true));
        let item = v.create_work_item(&VariableValue::Double(2.6), &WorkflowOptions::new()).unwrap();
        assert_eq!(item.param("argument.stories"), Some("3"));
    }

    #[test]
    fn test_range_edits_bump_version() {
        let v = variable(Argument::make_double_argument("wwr", true));
        let version = v.version_uuid();
        assert!(v.set_n_steps(3));
        assert_ne!(v.version_uuid(), version);
        assert_eq!(v.incremental_values().len(), 4);
        assert!(v.set_increment(0.15));
        assert_eq!(v.n_steps(), None);
    }

    #[test]
    fn test_measure_is_adopted() {
        let v = variable(Argument::make_double_argument("wwr", true));
        assert_eq!(
            v.ruby_measure().parent(),
            Some(ParentObject::RubyContinuousVariable(v.clone()))
        );
        let previous = v.ruby_measure();
        let other = RubyMeasure::from_script("other.rb", Some(FileType::Idf), Some(FileType::Idf), false);
        assert!(v.set_ruby_measure(other.clone()));
        assert_eq!(v.input_file_type(), Some(FileType::Idf));
        assert!(previous.parent().is_none());
        assert!(previous.holders().is_empty());
        assert_eq!(other.holders(), vec![v]);
    }

    #[test]
    fn test_duplicate_copies_measure() {
        let v = variable(Argument::make_double_argument("wwr", true));
        let copy = v.duplicate();
        assert!(copy.uuid_equal(&v));
        assert_ne!(copy.ruby_measure(), v.ruby_measure());
        assert!(copy.ruby_measure().uuid_and_version_equal(&v.ruby_measure()));
        assert_eq!(copy.range(), v.range());
    }
}
