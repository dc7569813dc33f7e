//! Workflow file type chain tests
//!
//! Structural changes that would break the chain from seed model to
//! simulation output are refused and leave the problem untouched.

use dse_analysis::prelude::*;
use dse_analysis::{AnalysisError, FileReference};
use dse_bcl::Argument;
use dse_runmanager::{FileType, JobType, WorkItem};
use dse_test_utils::{choice_group, compound_problem, discrete_problem, energyplus_measure, simulation_steps};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn test_fixture_workflows_are_consistent() {
    let problem = discrete_problem();
    assert_eq!(problem.num_workflow_steps(), 5);
    assert_eq!(problem.num_variables(), 2);
    assert_eq!(problem.input_file_type(), Some(FileType::Osm));
    assert_eq!(problem.workflow_step_index_by_job_type(JobType::EnergyPlus), Some(3));

    let (compound, _) = compound_problem();
    assert_eq!(compound.num_variables(), 2);
    assert!(compound.all_variables_are_continuous());
}

#[test]
fn test_model_measure_after_translation_is_rejected() {
    let problem = discrete_problem();
    let version = problem.version_uuid();
    let before = problem.workflow();

    // osm -> osm variable once the model is already an idf
    assert!(!problem.insert(3, choice_group("late", 1)));
    assert!(!problem.push(choice_group("last", 1)));

    assert_eq!(problem.workflow(), before);
    assert_eq!(problem.version_uuid(), version);
}

#[test]
fn test_energyplus_measure_fits_between_translation_and_simulation() {
    let problem = discrete_problem();
    let idf_group = MeasureGroup::new(
        "infiltration",
        vec![NullMeasure::new(true).into(), energyplus_measure("infiltration").into()],
    )
    .unwrap();

    assert!(!problem.insert(0, idf_group.clone()));
    assert!(problem.insert(3, idf_group));
    assert_eq!(problem.num_variables(), 3);
    assert_eq!(problem.workflow_step_index_by_job_type(JobType::EnergyPlus), Some(4));
}

#[test]
fn test_erase_and_swap_keep_the_chain() {
    let problem = discrete_problem();
    let steps = problem.workflow();

    // the translation step carries the osm -> idf conversion
    assert!(!problem.erase(&steps[2]));
    assert!(!problem.swap(&steps[1], &steps[2]));

    assert!(problem.swap(&steps[0], &steps[1]));
    assert_eq!(problem.variable(0).unwrap().name(), "lighting");
    assert!(problem.erase(&steps[0]));
    assert_eq!(problem.num_variables(), 1);
}

#[test]
fn test_inconsistent_initial_workflow() {
    let mut workflow = simulation_steps();
    workflow.push(choice_group("wwr", 1).into());
    let err = Problem::with_workflow("broken", workflow).unwrap_err();
    assert!(matches!(err, AnalysisError::InconsistentWorkflow(ref name) if name == "broken"));
}

#[test]
fn test_seed_type_starts_the_chain() {
    let problem = discrete_problem();
    let err = Analysis::new("office", problem.clone(), FileReference::with_type("seed.idf", FileType::Idf))
        .unwrap_err();
    assert!(matches!(err, AnalysisError::IncompatibleSeed { seed: FileType::Idf, input: FileType::Osm }));

    let analysis = Analysis::new("office", problem.clone(), FileReference::with_type("seed.osm", FileType::Osm))
        .unwrap();
    assert_eq!(analysis.problem(), problem);

    // an idf measure is fine after translation but not as the first step
    let group = MeasureGroup::new("idf", vec![energyplus_measure("idf").into()]).unwrap();
    assert!(!problem.insert(0, group));
}

#[test]
fn test_compound_chain_counts_as_one_step() {
    let (problem, measure) = compound_problem();
    let steps = problem.workflow();

    assert!(problem.file_types_are_compatible(&steps[0], Some(FileType::Osm), Some(FileType::Osm)));
    // mid-chain members cannot change types on their own
    assert!(!problem.file_types_are_compatible(&steps[1], Some(FileType::Osm), Some(FileType::Osm)));
    assert!(!problem.file_types_are_compatible(&steps[0], Some(FileType::Idf), Some(FileType::Idf)));

    // retyping the shared measure would break the chain
    let script = std::path::PathBuf::from("scripts/insulation.rb");
    assert!(!measure.set_script(script, Some(FileType::Idf), Some(FileType::Idf), true));
    assert_eq!(measure.input_file_type(), Some(FileType::Osm));
}

#[test]
fn test_shared_measure_stays_vetted_after_a_holder_leaves() {
    let (problem, measure) = compound_problem();
    let steps = problem.workflow();
    // conductivity adopted the measure last
    assert!(problem.erase(&steps[1]));

    let script = std::path::PathBuf::from("scripts/insulation.rb");
    assert!(!measure.set_script(script.clone(), Some(FileType::Idf), Some(FileType::Idf), true));
    assert_eq!(measure.input_file_type(), Some(FileType::Osm));
    assert!(problem.set_workflow(problem.workflow()));

    // edits still reach the problem through the remaining variable
    let version = problem.version_uuid();
    measure.add_argument(Argument::make_double_argument("r_value", false));
    assert_ne!(problem.version_uuid(), version);

    // nothing plugged in any more, so the measure may change freely
    assert!(problem.erase(&steps[0]));
    assert!(measure.set_script(script, Some(FileType::Idf), Some(FileType::Idf), true));
    assert_eq!(problem.num_variables(), 0);
}

#[test]
fn test_null_work_items_pass_through() {
    let problem = discrete_problem();
    assert!(problem.insert(2, WorkItem::null()));
    assert_eq!(problem.num_workflow_steps(), 6);
    assert_eq!(problem.num_variables(), 2);
}

// wwr, lighting, ModelToIdf, EnergyPlus, OpenStudioPostProcess
fn fresh_steps() -> Vec<WorkflowStep> {
    let mut steps: Vec<WorkflowStep> = vec![choice_group("wwr", 2).into(), choice_group("lighting", 1).into()];
    steps.extend(simulation_steps());
    steps
}

fn position(order: &[usize], step: usize) -> usize {
    order.iter().position(|&s| s == step).unwrap()
}

proptest! {
    #[test]
    fn prop_only_model_ordered_permutations_are_accepted(order in Just((0..5).collect::<Vec<usize>>()).prop_shuffle()) {
        let steps = fresh_steps();
        let workflow: Vec<WorkflowStep> = order.iter().map(|&i| steps[i].clone()).collect();

        let expected = position(&order, 0) < position(&order, 2)
            && position(&order, 1) < position(&order, 2)
            && position(&order, 2) < position(&order, 3)
            && position(&order, 3) < position(&order, 4);
        prop_assert_eq!(Problem::with_workflow("p", workflow).is_ok(), expected);
    }

    #[test]
    fn prop_rejected_insert_leaves_problem_untouched(index in 0usize..=5) {
        let problem = discrete_problem();
        let before = problem.workflow();
        let group = MeasureGroup::new("idf", vec![energyplus_measure("idf").into()]).unwrap();

        let accepted = problem.insert(index, group);
        // idf -> idf fits anywhere once the model has been translated
        prop_assert_eq!(accepted, index >= 3);
        if !accepted {
            prop_assert_eq!(problem.workflow(), before);
        }
    }
}
