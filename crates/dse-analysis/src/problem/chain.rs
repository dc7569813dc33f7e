//! File type chain checking
//!
//! Every structural change to a workflow is vetted here before it is
//! committed. The walk tracks the mainline energy model type plus every type
//! seen so far; compound chains of continuous variables sharing one measure
//! count as a single step.

use super::Problem;
use crate::measure::RubyMeasure;
use crate::object::{AnalysisObject, ParentObject};
use crate::variable::InputVariable;
use crate::workflow_step::{StepPayload, WorkflowStep};
use dse_runmanager::{FileType, WorkItem};
use std::collections::BTreeSet;
use uuid::Uuid;

/// What the chain check needs to know about one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StepTypes {
    pub(crate) input: Option<FileType>,
    pub(crate) output: Option<FileType>,
    /// Uuid and version of the shared measure, for continuous script variables
    pub(crate) compound_key: Option<(Uuid, Uuid)>,
    pub(crate) label: String,
}

impl StepTypes {
    pub(crate) fn for_measure(measure: &RubyMeasure, label: String) -> Self {
        Self {
            input: measure.input_file_type(),
            output: measure.output_file_type(),
            compound_key: Some((measure.uuid(), measure.version_uuid())),
            label,
        }
    }

    pub(crate) fn for_input_variable(variable: &InputVariable) -> Self {
        match variable {
            InputVariable::MeasureGroup(group) => Self {
                input: group.input_file_type(),
                output: group.output_file_type(),
                compound_key: None,
                label: format!("variable '{}'", group.name()),
            },
            InputVariable::RubyContinuous(rcv) => {
                Self::for_measure(&rcv.ruby_measure(), format!("variable '{}'", rcv.name()))
            }
        }
    }

    pub(crate) fn for_work_item(item: &WorkItem) -> Self {
        Self {
            input: item.input_file_type,
            output: item.output_file_type,
            compound_key: None,
            label: format!("{} work item", item.job_type),
        }
    }

    pub(crate) fn of_step(step: &WorkflowStep) -> Self {
        match step.payload() {
            StepPayload::InputVariable(v) => Self::for_input_variable(&v),
            StepPayload::WorkItem(item) => Self::for_work_item(&item),
        }
    }

    /// Same compound chain as the step before
    pub(crate) fn continues(&self, previous: &StepTypes) -> bool {
        self.compound_key.is_some() && self.compound_key == previous.compound_key
    }
}

/// Whether `steps[index]` continues a compound chain started earlier
pub(crate) fn is_continuation(steps: &[StepTypes], index: usize) -> bool {
    index > 0 && steps[index].continues(&steps[index - 1])
}

/// Walk the chain starting from an optional seed type
pub(crate) fn check_file_type_chain(seed: Option<FileType>, steps: &[StepTypes]) -> bool {
    let mut current = seed;
    let mut all: BTreeSet<FileType> = seed.into_iter().collect();

    for (i, step) in steps.iter().enumerate() {
        if is_continuation(steps, i) {
            continue;
        }

        match (current, step.input) {
            (Some(cur), Some(input)) => {
                let ok = if step.output.is_some_and(FileType::is_energy_model) {
                    input == cur
                } else {
                    all.contains(&input)
                };
                if !ok {
                    tracing::info!(
                        "Inconsistent workflow chain: {} expects {} but the available file would be {}",
                        step.label,
                        input,
                        cur
                    );
                    return false;
                }
            }
            (None, Some(input)) => {
                current = Some(input);
                all.insert(input);
            }
            _ => {}
        }

        if let Some(output) = step.output {
            if output.is_energy_model() {
                current = Some(output);
            }
            all.insert(output);
        }
    }
    true
}

impl Problem {
    /// Seed type of the owning analysis, which starts the chain
    pub(crate) fn seed_type(&self) -> Option<FileType> {
        match self.parent() {
            Some(ParentObject::Analysis(analysis)) => Some(analysis.seed().file_type()),
            _ => None,
        }
    }

    pub(crate) fn step_types(&self) -> Vec<StepTypes> {
        self.workflow().iter().map(StepTypes::of_step).collect()
    }

    /// Vet a candidate workflow
    pub(crate) fn check_workflow(&self, candidate: &[WorkflowStep]) -> bool {
        let types: Vec<StepTypes> = candidate.iter().map(StepTypes::of_step).collect();
        check_file_type_chain(self.seed_type(), &types)
    }

    fn step_position(&self, child: &WorkflowStep) -> Option<usize> {
        self.workflow().iter().position(|s| s == child)
    }

    /// Whether `child` may start declaring `input`/`output` in place.
    ///
    /// False when the step is not in this problem or sits in the middle of a
    /// compound chain. A step that starts a compound chain proposes the types
    /// for the whole chain.
    #[must_use]
    pub fn file_types_are_compatible(
        &self,
        child: &WorkflowStep,
        input: Option<FileType>,
        output: Option<FileType>,
    ) -> bool {
        let mut types = self.step_types();
        let Some(index) = self.step_position(child) else {
            tracing::debug!("Step '{}' is not in problem '{}'", child.name(), self.name());
            return false;
        };
        if is_continuation(&types, index) {
            tracing::info!(
                "Cannot change file types of step '{}' in the middle of a compound measure",
                child.name()
            );
            return false;
        }
        let mut end = index + 1;
        while end < types.len() && is_continuation(&types, end) {
            end += 1;
        }
        for t in &mut types[index..end] {
            t.input = input;
            t.output = output;
        }
        check_file_type_chain(self.seed_type(), &types)
    }

    /// Whether replacing `child`'s payload with something described by `proposed` keeps the chain valid
    pub(crate) fn step_change_is_compatible(&self, child: &WorkflowStep, proposed: StepTypes) -> bool {
        let mut types = self.step_types();
        let Some(index) = self.step_position(child) else {
            return false;
        };
        types[index] = proposed;
        check_file_type_chain(self.seed_type(), &types)
    }

    /// Whether a measure shared by continuous variables may change its types.
    ///
    /// Only steps holding this very handle change. The change gives the
    /// measure a new version, so those steps are re-keyed and stop chaining
    /// with copies that still carry the old uuid and version.
    pub(crate) fn measure_types_are_compatible(
        &self,
        measure: &RubyMeasure,
        input: Option<FileType>,
        output: Option<FileType>,
    ) -> bool {
        let workflow = self.workflow();
        let mut types = self.step_types();
        let next_key = Some((measure.uuid(), Uuid::new_v4()));
        for (step, t) in workflow.iter().zip(types.iter_mut()) {
            if let Ok(InputVariable::RubyContinuous(rcv)) = step.input_variable() {
                if rcv.ruby_measure() == *measure {
                    t.input = input;
                    t.output = output;
                    t.compound_key = next_key;
                }
            }
        }
        check_file_type_chain(self.seed_type(), &types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(input: Option<FileType>, output: Option<FileType>) -> StepTypes {
        StepTypes {
            input,
            output,
            compound_key: None,
            label: "step".into(),
        }
    }

    #[test]
    fn test_mainline_must_match() {
        let osm = Some(FileType::Osm);
        let idf = Some(FileType::Idf);
        assert!(check_file_type_chain(None, &[step(osm, osm), step(osm, idf), step(idf, idf)]));
        assert!(!check_file_type_chain(None, &[step(osm, idf), step(osm, osm)]));
        assert!(!check_file_type_chain(Some(FileType::Idf), &[step(osm, osm)]));
    }

    #[test]
    fn test_side_branches_consume_seen_types() {
        let osm = Some(FileType::Osm);
        let idf = Some(FileType::Idf);
        let sql = Some(FileType::Sql);
        let xml = Some(FileType::Xml);
        // reporting on the sql output after moving on, and reading the osm again
        assert!(check_file_type_chain(
            None,
            &[step(osm, idf), step(idf, sql), step(sql, xml), step(osm, xml)]
        ));
        assert!(!check_file_type_chain(None, &[step(osm, osm), step(sql, xml)]));
    }

    #[test]
    fn test_null_steps_are_wildcards() {
        let idf = Some(FileType::Idf);
        assert!(check_file_type_chain(None, &[step(None, None), step(idf, idf), step(None, None)]));
    }

    #[test]
    fn test_compound_continuations_are_skipped() {
        let key = Some((Uuid::new_v4(), Uuid::new_v4()));
        let mut first = step(Some(FileType::Osm), Some(FileType::Osm));
        first.compound_key = key;
        let mut second = first.clone();
        // a continuation never gets checked on its own
        second.input = Some(FileType::Sql);
        let steps = [first, second];
        assert!(is_continuation(&steps, 1));
        assert!(check_file_type_chain(None, &steps));
    }
}
