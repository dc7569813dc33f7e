//! The problem: an ordered workflow of steps plus response functions
//!
//! A problem is the consistency authority for its workflow. Every structural
//! mutation builds the candidate step list, runs the file type chain check
//! over it, and only then commits. Rejections return `false` and leave the
//! workflow untouched.
//!
//! The variables of a problem are not stored separately: they are the input
//! variable payloads of its workflow steps, in order.

mod chain;
mod classification;
mod conversion;
mod execution;

pub(crate) use chain::StepTypes;
pub use execution::WorkflowStepJob;

use crate::error::AnalysisError;
use crate::function::LinearFunction;
use crate::measure::{Measure, RubyMeasure};
use crate::object::{analysis_object_handle, AnalysisObject, ChangeType, ObjectBase, ParentLink};
use crate::variable::{InputVariable, RubyContinuousVariable};
use crate::workflow_step::{StepPayload, WorkflowStep};
use dse_bcl::{Argument, BclMeasure};
use dse_runmanager::{FileType, JobType};
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) struct ProblemData {
    pub(crate) base: ObjectBase,
    pub(crate) workflow: Vec<WorkflowStep>,
    pub(crate) responses: Vec<LinearFunction>,
}

/// Parametric problem definition
#[derive(Clone)]
pub struct Problem {
    pub(crate) inner: Arc<RwLock<ProblemData>>,
}

analysis_object_handle!(Problem, clear_dirty_with = clear_dirty_tree);

fn change_for(is_variable: bool) -> ChangeType {
    if is_variable {
        ChangeType::InvalidatesDataPoints
    } else {
        ChangeType::InvalidatesResults
    }
}

fn count_variables(steps: &[WorkflowStep]) -> usize {
    steps.iter().filter(|s| s.is_input_variable()).count()
}

impl Problem {
    /// An empty problem
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_parts(ObjectBase::new(name), Vec::new(), Vec::new())
    }

    /// A problem over an initial workflow, which must form a consistent chain
    pub fn with_workflow(name: impl Into<String>, workflow: Vec<WorkflowStep>) -> Result<Self, AnalysisError> {
        let name = name.into();
        let types: Vec<StepTypes> = workflow.iter().map(StepTypes::of_step).collect();
        if !chain::check_file_type_chain(None, &types) {
            return Err(AnalysisError::InconsistentWorkflow(name));
        }
        Ok(Self::from_parts(ObjectBase::new(name), workflow, Vec::new()))
    }

    /// Attach response functions to a freshly built problem
    #[must_use]
    pub fn with_responses(self, responses: Vec<LinearFunction>) -> Self {
        for f in &responses {
            f.set_parent(Some(self.link()));
        }
        self.inner.write().responses = responses;
        self
    }

    pub(crate) fn from_parts(base: ObjectBase, workflow: Vec<WorkflowStep>, responses: Vec<LinearFunction>) -> Self {
        let problem = Self {
            inner: Arc::new(RwLock::new(ProblemData {
                base,
                workflow: workflow.clone(),
                responses: responses.clone(),
            })),
        };
        let link = problem.link();
        for step in &workflow {
            step.set_parent(Some(link.clone()));
        }
        for f in &responses {
            f.set_parent(Some(link.clone()));
        }
        problem
    }

    pub(crate) fn link(&self) -> ParentLink {
        ParentLink::Problem(Arc::downgrade(&self.inner))
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }

    // Workflow queries

    #[must_use]
    pub fn workflow(&self) -> Vec<WorkflowStep> {
        self.inner.read().workflow.clone()
    }

    #[must_use]
    pub fn num_workflow_steps(&self) -> usize {
        self.inner.read().workflow.len()
    }

    #[must_use]
    pub fn workflow_step(&self, index: usize) -> Option<WorkflowStep> {
        self.inner.read().workflow.get(index).cloned()
    }

    /// Position of a step, matched by uuid
    #[must_use]
    pub fn workflow_step_index(&self, step: &WorkflowStep) -> Option<usize> {
        let uuid = step.uuid();
        self.workflow().iter().position(|s| s.uuid() == uuid)
    }

    /// First work item step of the given job type
    #[must_use]
    pub fn workflow_step_index_by_job_type(&self, job_type: JobType) -> Option<usize> {
        self.workflow()
            .iter()
            .position(|s| s.work_item().is_ok_and(|item| item.job_type == job_type))
    }

    /// Input type of the first step that declares one; what the seed must be
    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        self.workflow().iter().find_map(WorkflowStep::input_file_type)
    }

    // Variable queries

    /// Input variables in workflow order
    #[must_use]
    pub fn variables(&self) -> Vec<InputVariable> {
        self.workflow()
            .iter()
            .filter_map(|s| s.input_variable().ok())
            .collect()
    }

    #[must_use]
    pub fn num_variables(&self) -> usize {
        count_variables(&self.inner.read().workflow)
    }

    #[must_use]
    pub fn variable(&self, index: usize) -> Option<InputVariable> {
        self.variables().into_iter().nth(index)
    }

    #[must_use]
    pub fn variable_index_by_uuid(&self, uuid: Uuid) -> Option<usize> {
        self.variables().iter().position(|v| v.uuid() == uuid)
    }

    #[must_use]
    pub fn variable_by_uuid(&self, uuid: Uuid) -> Option<InputVariable> {
        self.variables().into_iter().find(|v| v.uuid() == uuid)
    }

    #[must_use]
    pub fn num_continuous_variables(&self) -> usize {
        self.variables().iter().filter(|v| v.is_continuous()).count()
    }

    #[must_use]
    pub fn num_discrete_variables(&self) -> usize {
        self.variables().iter().filter(|v| v.is_discrete()).count()
    }

    /// Discrete variables with fewer than two selected measures. They never
    /// vary, so every data point applies them the same way.
    #[must_use]
    pub fn num_static_transformations(&self) -> usize {
        self.variables()
            .iter()
            .filter_map(InputVariable::as_measure_group)
            .filter(|g| g.num_measures(true) < 2)
            .count()
    }

    #[must_use]
    pub fn all_variables_are_continuous(&self) -> bool {
        self.variables().iter().all(InputVariable::is_continuous)
    }

    #[must_use]
    pub fn all_variables_are_discrete(&self) -> bool {
        self.variables().iter().all(InputVariable::is_discrete)
    }

    #[must_use]
    pub fn all_variables_are_continuous_or_static_transformations(&self) -> bool {
        self.variables().iter().all(|v| match v {
            InputVariable::MeasureGroup(g) => g.num_measures(true) < 2,
            InputVariable::RubyContinuous(_) => true,
        })
    }

    // Response queries

    #[must_use]
    pub fn responses(&self) -> Vec<LinearFunction> {
        self.inner.read().responses.clone()
    }

    #[must_use]
    pub fn num_responses(&self) -> usize {
        self.inner.read().responses.len()
    }

    // Workflow mutators

    fn commit_workflow(&self, workflow: Vec<WorkflowStep>, kind: ChangeType) {
        let old = std::mem::replace(&mut self.inner.write().workflow, workflow.clone());
        for step in old.iter().filter(|s| !workflow.contains(s)) {
            step.set_parent(None);
        }
        let link = self.link();
        for step in &workflow {
            step.set_parent(Some(link.clone()));
        }
        self.on_change(kind);
    }

    fn try_commit(&self, candidate: Vec<WorkflowStep>, kind: ChangeType, action: &str) -> bool {
        if !self.check_workflow(&candidate) {
            tracing::info!("Cannot {} in problem '{}': file types do not chain", action, self.name());
            return false;
        }
        self.commit_workflow(candidate, kind);
        true
    }

    /// Append a step
    pub fn push(&self, step: impl Into<WorkflowStep>) -> bool {
        let step = step.into();
        self.insert(self.num_workflow_steps(), step)
    }

    /// Insert a step before `index`; `index == num_workflow_steps()` appends
    pub fn insert(&self, index: usize, step: impl Into<WorkflowStep>) -> bool {
        let step = step.into();
        let mut candidate = self.workflow();
        if index > candidate.len() {
            tracing::info!(
                "Cannot insert step at {} in problem '{}': only {} steps",
                index,
                self.name(),
                candidate.len()
            );
            return false;
        }
        if candidate.iter().any(|s| s.uuid() == step.uuid()) {
            tracing::info!("Step '{}' is already in problem '{}'", step.name(), self.name());
            return false;
        }
        let kind = change_for(step.is_input_variable());
        candidate.insert(index, step);
        self.try_commit(candidate, kind, "insert step")
    }

    /// Remove a step
    pub fn erase(&self, step: &WorkflowStep) -> bool {
        let mut candidate = self.workflow();
        let Some(index) = self.workflow_step_index(step) else {
            return false;
        };
        let removed = candidate.remove(index);
        let kind = change_for(removed.is_input_variable());
        self.try_commit(candidate, kind, "erase step")
    }

    /// Exchange the positions of two steps
    pub fn swap(&self, a: &WorkflowStep, b: &WorkflowStep) -> bool {
        let (Some(i), Some(j)) = (self.workflow_step_index(a), self.workflow_step_index(b)) else {
            return false;
        };
        let mut candidate = self.workflow();
        candidate.swap(i, j);
        let kind = change_for(candidate[i].is_input_variable() || candidate[j].is_input_variable());
        self.try_commit(candidate, kind, "swap steps")
    }

    /// Replace the whole workflow
    pub fn set_workflow(&self, workflow: Vec<WorkflowStep>) -> bool {
        let before = self.num_variables();
        let kind = change_for(before > 0 || count_variables(&workflow) > 0);
        self.try_commit(workflow, kind, "set workflow")
    }

    pub fn clear_workflow(&self) {
        let kind = change_for(self.num_variables() > 0);
        self.commit_workflow(Vec::new(), kind);
    }

    // Response mutators

    fn commit_responses(&self, responses: Vec<LinearFunction>) {
        let old = std::mem::replace(&mut self.inner.write().responses, responses.clone());
        for f in old.iter().filter(|f| !responses.contains(f)) {
            f.set_parent(None);
        }
        let link = self.link();
        for f in &responses {
            f.set_parent(Some(link.clone()));
        }
        self.on_change(ChangeType::InvalidatesResults);
    }

    pub fn push_response(&self, response: LinearFunction) {
        let mut responses = self.responses();
        responses.push(response);
        self.commit_responses(responses);
    }

    /// Insert before an existing response
    pub fn insert_response(&self, index: usize, response: LinearFunction) -> bool {
        let mut responses = self.responses();
        if index > responses.len() {
            tracing::info!(
                "Cannot insert response at {} in problem '{}': only {} responses",
                index,
                self.name(),
                responses.len()
            );
            return false;
        }
        responses.insert(index, response);
        self.commit_responses(responses);
        true
    }

    pub fn erase_response(&self, response: &LinearFunction) -> bool {
        let mut responses = self.responses();
        let Some(index) = responses.iter().position(|f| f.uuid() == response.uuid()) else {
            return false;
        };
        responses.remove(index);
        self.commit_responses(responses);
        true
    }

    pub fn swap_responses(&self, a: &LinearFunction, b: &LinearFunction) -> bool {
        let mut responses = self.responses();
        let i = responses.iter().position(|f| f.uuid() == a.uuid());
        let j = responses.iter().position(|f| f.uuid() == b.uuid());
        let (Some(i), Some(j)) = (i, j) else {
            return false;
        };
        responses.swap(i, j);
        self.commit_responses(responses);
        true
    }

    pub fn set_response_functions(&self, responses: Vec<LinearFunction>) {
        self.commit_responses(responses);
    }

    pub fn clear_response_functions(&self) {
        self.commit_responses(Vec::new());
    }

    // Catalog updates

    /// Move every use of a catalog measure to `new_version`.
    ///
    /// Discrete variables update each matching measure in place and drop the
    /// ones whose new file types no longer fit. A compound chain of continuous
    /// variables shares one measure: its variables keep their own arguments,
    /// the rest of `new_arguments` goes to the measure, and variables whose
    /// argument is gone from the new schema are removed from the workflow.
    /// With `keep_old_if_empty` and no new arguments, current argument values
    /// are kept as they are.
    pub fn update_measure(&self, new_version: &BclMeasure, new_arguments: &[Argument], keep_old_if_empty: bool) -> bool {
        let keep_old = new_arguments.is_empty() && keep_old_if_empty;
        let uses_measure = |m: &RubyMeasure| m.bcl_measure_uuid() == Some(new_version.uuid());
        let mut result = true;
        let mut chain: Vec<RubyContinuousVariable> = Vec::new();

        for variable in self.variables() {
            let continues = matches!(
                (&variable, chain.last()),
                (InputVariable::RubyContinuous(rcv), Some(prev)) if rcv.ruby_measure() == prev.ruby_measure()
            );
            if !continues && !chain.is_empty() {
                result &= self.update_compound_chain(new_version, new_arguments, keep_old, &std::mem::take(&mut chain));
            }
            match variable {
                InputVariable::MeasureGroup(group) => {
                    for measure in group.measures(false) {
                        let Measure::Ruby(ruby) = &measure else { continue };
                        if !uses_measure(ruby) {
                            continue;
                        }
                        if !update_one_measure(ruby, new_version, new_arguments, keep_old) && !group.erase(&measure) {
                            tracing::warn!(
                                "Measure '{}' of variable '{}' could not be updated or removed",
                                ruby.name(),
                                group.name()
                            );
                            result = false;
                        }
                    }
                }
                InputVariable::RubyContinuous(rcv) => {
                    if uses_measure(&rcv.ruby_measure()) {
                        chain.push(rcv);
                    }
                }
            }
        }
        if !chain.is_empty() {
            result &= self.update_compound_chain(new_version, new_arguments, keep_old, &chain);
        }
        result
    }

    fn update_compound_chain(
        &self,
        new_version: &BclMeasure,
        new_arguments: &[Argument],
        keep_old: bool,
        chain: &[RubyContinuousVariable],
    ) -> bool {
        let measure = chain[0].ruby_measure();
        let mut keep = vec![true; chain.len()];
        let ok = if keep_old {
            update_one_measure(&measure, new_version, new_arguments, true)
        } else {
            let mut remaining = new_arguments.to_vec();
            for (i, variable) in chain.iter().enumerate() {
                let argument = variable.argument();
                match remaining.iter().position(|a| a.name() == argument.name()) {
                    Some(pos) => variable.set_argument(remaining.remove(pos)),
                    None => keep[i] = false,
                }
            }
            measure.update_measure(new_version, &remaining)
        };
        if !ok {
            keep = vec![false; chain.len()];
        }

        let mut result = ok;
        for (variable, keep) in chain.iter().zip(keep) {
            if keep {
                continue;
            }
            tracing::info!(
                "Removing variable '{}': its argument is not part of measure '{}' any more",
                variable.name(),
                new_version.name()
            );
            let step = self
                .workflow()
                .into_iter()
                .find(|s| matches!(s.input_variable(), Ok(InputVariable::RubyContinuous(v)) if v == *variable));
            result &= step.is_some_and(|s| self.erase(&s));
        }
        result
    }

    /// Deep copy. Continuous variables that share a measure share its copy.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let (base, workflow, responses) = {
            let guard = self.inner.read();
            (guard.base.duplicate(), guard.workflow.clone(), guard.responses.clone())
        };
        let mut shared: Vec<(RubyMeasure, RubyMeasure)> = Vec::new();
        let steps = workflow
            .iter()
            .map(|step| match step.payload() {
                StepPayload::InputVariable(InputVariable::RubyContinuous(rcv)) => {
                    let original = rcv.ruby_measure();
                    let copy = match shared.iter().find(|(o, _)| *o == original) {
                        Some((_, copy)) => copy.clone(),
                        None => {
                            let copy = original.duplicate();
                            shared.push((original, copy.clone()));
                            copy
                        }
                    };
                    let variable = rcv.duplicate_with_measure(copy);
                    step.duplicate_with_payload(StepPayload::InputVariable(variable.into()))
                }
                _ => step.duplicate(),
            })
            .collect();
        let responses = responses.iter().map(LinearFunction::duplicate).collect();
        Self::from_parts(base, steps, responses)
    }

    fn clear_dirty_tree(&self) -> bool {
        for step in self.workflow() {
            step.clear_dirty_flag();
        }
        for f in self.responses() {
            f.clear_dirty_flag();
        }
        self.write_base(ObjectBase::mark_clean);
        true
    }
}

fn update_one_measure(measure: &RubyMeasure, new_version: &BclMeasure, new_arguments: &[Argument], keep_old: bool) -> bool {
    if keep_old {
        let current = measure.arguments();
        let ok = measure.set_bcl_measure(new_version.clone());
        if ok {
            measure.set_arguments(current);
        }
        ok
    } else {
        measure.update_measure(new_version, new_arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::NullMeasure;
    use crate::variable::{MeasureGroup, OutputAttributeVariable};
    use dse_runmanager::WorkItem;

    fn ruby(input: FileType, output: FileType) -> Measure {
        RubyMeasure::from_script("m.rb", Some(input), Some(output), false).into()
    }

    fn group(name: &str, measures: Vec<Measure>) -> WorkflowStep {
        MeasureGroup::new(name, measures).unwrap().into()
    }

    #[test]
    fn test_insert_response_up_to_the_end() {
        let problem = Problem::new("p");
        let eui = || LinearFunction::new("eui", vec![OutputAttributeVariable::new("eui", "site_eui")], vec![1.0]);
        let first = eui();
        let last = eui();
        assert!(problem.insert_response(0, first.clone()));
        assert!(problem.insert_response(1, last.clone()));
        assert!(!problem.insert_response(3, eui()));
        assert_eq!(problem.responses(), vec![first, last]);
    }

    #[test]
    fn test_rejected_insert_leaves_workflow() {
        let problem = Problem::with_workflow(
            "p",
            vec![
                group("osm", vec![ruby(FileType::Osm, FileType::Osm)]),
                WorkItem::new(JobType::ModelToIdf).into(),
            ],
        )
        .unwrap();
        let version = problem.version_uuid();
        let bad = group("idf", vec![ruby(FileType::Idf, FileType::Idf)]);
        assert!(!problem.insert(0, bad.clone()));
        assert!(!problem.insert(7, bad.clone()));
        assert_eq!(problem.num_workflow_steps(), 2);
        assert_eq!(problem.version_uuid(), version);
        assert!(bad.parent().is_none());

        assert!(problem.push(bad.clone()));
        assert_eq!(problem.num_variables(), 2);
        assert_eq!(problem.variable_index_by_uuid(bad.input_variable().unwrap().uuid()), Some(1));
    }

    #[test]
    fn test_erase_rejected_when_chain_breaks() {
        let translate: WorkflowStep = WorkItem::new(JobType::ModelToIdf).into();
        let problem = Problem::with_workflow(
            "p",
            vec![
                group("osm", vec![ruby(FileType::Osm, FileType::Osm)]),
                translate.clone(),
                group("idf", vec![ruby(FileType::Idf, FileType::Idf)]),
            ],
        )
        .unwrap();
        assert!(!problem.erase(&translate));
        assert_eq!(problem.num_workflow_steps(), 3);
        assert_eq!(problem.workflow_step_index_by_job_type(JobType::ModelToIdf), Some(1));
    }

    #[test]
    fn test_inconsistent_initial_workflow() {
        let result = Problem::with_workflow(
            "p",
            vec![
                group("idf", vec![ruby(FileType::Idf, FileType::Idf)]),
                group("osm", vec![ruby(FileType::Osm, FileType::Osm)]),
            ],
        );
        assert!(matches!(result, Err(AnalysisError::InconsistentWorkflow(name)) if name == "p"));
    }

    #[test]
    fn test_static_transformations() {
        let problem = Problem::with_workflow(
            "p",
            vec![
                group("fixed", vec![ruby(FileType::Osm, FileType::Osm)]),
                group(
                    "choice",
                    vec![NullMeasure::new(true).into(), ruby(FileType::Osm, FileType::Osm)],
                ),
            ],
        )
        .unwrap();
        assert_eq!(problem.num_static_transformations(), 1);
        assert!(problem.all_variables_are_discrete());
        assert!(!problem.all_variables_are_continuous_or_static_transformations());
        assert_eq!(problem.input_file_type(), Some(FileType::Osm));
    }

    #[test]
    fn test_duplicate_keeps_measure_sharing() {
        let measure = RubyMeasure::from_script("m.rb", Some(FileType::Osm), Some(FileType::Osm), false);
        let a = RubyContinuousVariable::new("a", Argument::make_double_argument("a", true), measure.clone());
        let b = RubyContinuousVariable::new("b", Argument::make_double_argument("b", true), measure);
        let problem = Problem::with_workflow("p", vec![a.into(), b.into()]).unwrap();

        let copy = problem.duplicate();
        let vars = copy.variables();
        let first = vars[0].as_ruby_continuous().unwrap().ruby_measure();
        let second = vars[1].as_ruby_continuous().unwrap().ruby_measure();
        assert_eq!(first, second);
        assert_ne!(first, problem.variables()[0].as_ruby_continuous().unwrap().ruby_measure());
        assert_eq!(copy.uuid(), problem.uuid());
    }
}
