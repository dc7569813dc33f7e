//! One position in a problem's pipeline

use crate::error::AnalysisError;
use crate::measure::RubyMeasure;
use crate::object::{analysis_object_handle, AnalysisObject, ChangeType, ObjectBase, ParentLink, ParentObject};
use crate::problem::StepTypes;
use crate::variable::{InputVariable, MeasureGroup, RubyContinuousVariable};
use dse_runmanager::{FileType, WorkItem};
use parking_lot::RwLock;
use std::sync::Arc;

/// What a step runs: a variable resolved per data point, or a fixed job
#[derive(Debug, Clone, PartialEq)]
pub enum StepPayload {
    InputVariable(InputVariable),
    WorkItem(WorkItem),
}

impl StepPayload {
    fn kind(&self) -> &'static str {
        match self {
            StepPayload::InputVariable(_) => "input variable",
            StepPayload::WorkItem(_) => "work item",
        }
    }
}

pub(crate) struct WorkflowStepData {
    pub(crate) base: ObjectBase,
    pub(crate) payload: StepPayload,
}

/// A workflow step holding exactly one payload
#[derive(Clone)]
pub struct WorkflowStep {
    pub(crate) inner: Arc<RwLock<WorkflowStepData>>,
}

analysis_object_handle!(WorkflowStep, clear_dirty_with = clear_dirty_tree);

impl WorkflowStep {
    #[must_use]
    pub fn from_input_variable(variable: impl Into<InputVariable>) -> Self {
        let variable = variable.into();
        let name = variable.name();
        Self::from_parts(ObjectBase::new(name), StepPayload::InputVariable(variable))
    }

    #[must_use]
    pub fn from_work_item(item: WorkItem) -> Self {
        let name = item.job_type.to_string();
        Self::from_parts(ObjectBase::new(name), StepPayload::WorkItem(item))
    }

    pub(crate) fn from_parts(base: ObjectBase, payload: StepPayload) -> Self {
        let step = Self {
            inner: Arc::new(RwLock::new(WorkflowStepData { base, payload })),
        };
        if let StepPayload::InputVariable(v) = step.payload() {
            v.set_parent(Some(step.link()));
        }
        step
    }

    pub(crate) fn link(&self) -> ParentLink {
        ParentLink::WorkflowStep(Arc::downgrade(&self.inner))
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }

    #[must_use]
    pub fn payload(&self) -> StepPayload {
        self.inner.read().payload.clone()
    }

    #[must_use]
    pub fn is_input_variable(&self) -> bool {
        matches!(self.inner.read().payload, StepPayload::InputVariable(_))
    }

    #[must_use]
    pub fn is_work_item(&self) -> bool {
        !self.is_input_variable()
    }

    pub fn input_variable(&self) -> Result<InputVariable, AnalysisError> {
        match &self.inner.read().payload {
            StepPayload::InputVariable(v) => Ok(v.clone()),
            other => Err(AnalysisError::WrongPayload {
                requested: "input variable",
                actual: other.kind(),
            }),
        }
    }

    pub fn work_item(&self) -> Result<WorkItem, AnalysisError> {
        match &self.inner.read().payload {
            StepPayload::WorkItem(item) => Ok(item.clone()),
            other => Err(AnalysisError::WrongPayload {
                requested: "work item",
                actual: other.kind(),
            }),
        }
    }

    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        match self.payload() {
            StepPayload::InputVariable(v) => v.input_file_type(),
            StepPayload::WorkItem(item) => item.input_file_type,
        }
    }

    #[must_use]
    pub fn output_file_type(&self) -> Option<FileType> {
        match self.payload() {
            StepPayload::InputVariable(v) => v.output_file_type(),
            StepPayload::WorkItem(item) => item.output_file_type,
        }
    }

    /// Whether the step may start declaring `input`/`output` where it sits
    #[must_use]
    pub fn file_types_are_compatible(&self, input: Option<FileType>, output: Option<FileType>) -> bool {
        if (input, output) == (self.input_file_type(), self.output_file_type()) {
            return true;
        }
        match self.parent() {
            Some(ParentObject::Problem(problem)) => problem.file_types_are_compatible(self, input, output),
            _ => true,
        }
    }

    pub(crate) fn types_change_is_compatible(&self, types: StepTypes) -> bool {
        match self.parent() {
            Some(ParentObject::Problem(problem)) => problem.step_change_is_compatible(self, types),
            _ => true,
        }
    }

    pub(crate) fn measure_types_are_compatible(
        &self,
        measure: &RubyMeasure,
        input: Option<FileType>,
        output: Option<FileType>,
    ) -> bool {
        match self.parent() {
            Some(ParentObject::Problem(problem)) => problem.measure_types_are_compatible(measure, input, output),
            _ => true,
        }
    }

    /// Replace the payload with a variable; refused when it does not fit the workflow
    pub fn set_input_variable(&self, variable: impl Into<InputVariable>) -> bool {
        let variable = variable.into();
        if !self.types_change_is_compatible(StepTypes::for_input_variable(&variable)) {
            tracing::info!("Variable '{}' does not fit at step '{}'", variable.name(), self.name());
            return false;
        }
        variable.set_parent(Some(self.link()));
        self.replace_payload(StepPayload::InputVariable(variable));
        true
    }

    /// Replace the payload with a fixed job; refused when it does not fit the workflow
    pub fn set_work_item(&self, item: WorkItem) -> bool {
        if !self.types_change_is_compatible(StepTypes::for_work_item(&item)) {
            tracing::info!("Work item {} does not fit at step '{}'", item.job_type, self.name());
            return false;
        }
        self.replace_payload(StepPayload::WorkItem(item));
        true
    }

    fn replace_payload(&self, payload: StepPayload) {
        let old = std::mem::replace(&mut self.inner.write().payload, payload);
        let swapped_kind = match &old {
            StepPayload::InputVariable(v) => {
                v.set_parent(None);
                self.is_work_item()
            }
            StepPayload::WorkItem(_) => self.is_input_variable(),
        };
        self.on_change(if swapped_kind {
            ChangeType::InvalidatesDataPoints
        } else {
            ChangeType::InvalidatesResults
        });
    }

    /// Deep copy of the step and its payload
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let payload = match self.payload() {
            StepPayload::InputVariable(v) => StepPayload::InputVariable(v.duplicate()),
            item @ StepPayload::WorkItem(_) => item,
        };
        self.duplicate_with_payload(payload)
    }

    pub(crate) fn duplicate_with_payload(&self, payload: StepPayload) -> Self {
        let base = self.inner.read().base.duplicate();
        Self::from_parts(base, payload)
    }

    fn clear_dirty_tree(&self) -> bool {
        if let StepPayload::InputVariable(v) = self.payload() {
            v.clear_dirty_flag();
        }
        self.write_base(ObjectBase::mark_clean);
        true
    }
}

impl From<InputVariable> for WorkflowStep {
    fn from(variable: InputVariable) -> Self {
        Self::from_input_variable(variable)
    }
}

impl From<MeasureGroup> for WorkflowStep {
    fn from(group: MeasureGroup) -> Self {
        Self::from_input_variable(group)
    }
}

impl From<RubyContinuousVariable> for WorkflowStep {
    fn from(variable: RubyContinuousVariable) -> Self {
        Self::from_input_variable(variable)
    }
}

impl From<WorkItem> for WorkflowStep {
    fn from(item: WorkItem) -> Self {
        Self::from_work_item(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::NullMeasure;
    use dse_runmanager::JobType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_payload_access() {
        let step = WorkflowStep::from(WorkItem::new(JobType::EnergyPlus));
        assert!(step.is_work_item());
        assert_eq!(step.input_file_type(), Some(FileType::Idf));
        assert_eq!(step.output_file_type(), Some(FileType::Sql));
        assert!(matches!(
            step.input_variable(),
            Err(AnalysisError::WrongPayload { requested: "input variable", .. })
        ));
        assert_eq!(step.work_item().unwrap().job_type, JobType::EnergyPlus);
    }

    #[test]
    fn test_variable_is_adopted() {
        let group = MeasureGroup::new("g", vec![NullMeasure::new(true).into()]).unwrap();
        let step = WorkflowStep::from(group.clone());
        assert!(step.is_input_variable());
        assert_eq!(group.parent(), Some(ParentObject::WorkflowStep(step.clone())));
        assert_eq!(step.name(), "g");
    }

    #[test]
    fn test_payload_swap_detaches_old_variable() {
        let group = MeasureGroup::new("g", vec![NullMeasure::new(true).into()]).unwrap();
        let step = WorkflowStep::from(group.clone());
        let version = step.version_uuid();
        assert!(step.set_work_item(WorkItem::new(JobType::ModelToIdf)));
        assert!(step.is_work_item());
        assert!(group.parent().is_none());
        assert_ne!(step.version_uuid(), version);
    }
}
