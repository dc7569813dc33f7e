//! Data point to job workflow expansion tests

use dse_analysis::measure::{ARGUMENT_PARAM_PREFIX, SCRIPT_PARAM};
use dse_analysis::prelude::*;
use dse_bcl::Argument;
use dse_runmanager::{FileType, JobType, FLAT_OUTPUT_DIRECTORY_PARAM};
use dse_test_utils::{completed_job, compound_problem, discrete_problem, model_measure, simulation_steps};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn argument_param(item: &dse_runmanager::WorkItem, name: &str) -> Option<f64> {
    item.param(&format!("{ARGUMENT_PARAM_PREFIX}{name}"))
        .and_then(|v| v.parse().ok())
}

#[test]
fn test_discrete_point_expands_one_item_per_step() {
    let problem = discrete_problem();
    let point = problem
        .create_data_point_with_values(vec![VariableValue::Integer(1), VariableValue::Integer(0)])
        .unwrap();

    let workflow = problem.create_workflow(&point, &WorkflowOptions::default()).unwrap();
    assert_eq!(
        workflow.job_types(),
        vec![
            JobType::Ruby,
            JobType::Null,
            JobType::ModelToIdf,
            JobType::EnergyPlus,
            JobType::OpenStudioPostProcess,
        ]
    );
    assert_eq!(workflow.items()[0].param(SCRIPT_PARAM), Some("scripts/wwr_0.rb"));
    assert!(workflow.has_param(FLAT_OUTPUT_DIRECTORY_PARAM));
}

#[test]
fn test_compound_chain_collapses_into_one_item() {
    let (problem, measure) = compound_problem();
    let point = problem
        .create_data_point_with_values(vec![VariableValue::Double(0.1), VariableValue::Double(0.03)])
        .unwrap();

    let workflow = problem.create_workflow(&point, &WorkflowOptions::default()).unwrap();
    assert_eq!(
        workflow.job_types(),
        vec![JobType::Ruby, JobType::ModelToIdf, JobType::EnergyPlus, JobType::OpenStudioPostProcess]
    );
    let item = &workflow.items()[0];
    assert_eq!(argument_param(item, "thickness"), Some(0.1));
    assert_eq!(argument_param(item, "conductivity"), Some(0.03));

    // the shared measure itself is left alone
    assert!(measure.arguments().is_empty());
}

#[test]
fn test_split_chain_runs_the_measure_twice() {
    let (problem, _) = compound_problem();
    let steps = problem.workflow();
    // a null item between the two variables breaks the chain
    assert!(problem.insert(1, dse_runmanager::WorkItem::null()));
    assert_eq!(problem.workflow_step_index(&steps[1]), Some(2));

    let point = problem
        .create_data_point_with_values(vec![VariableValue::Double(0.2), VariableValue::Double(0.04)])
        .unwrap();
    let workflow = problem.create_workflow(&point, &WorkflowOptions::default()).unwrap();
    assert_eq!(&workflow.job_types()[..3], &[JobType::Ruby, JobType::Null, JobType::Ruby]);
    assert_eq!(argument_param(&workflow.items()[0], "thickness"), Some(0.2));
    assert_eq!(argument_param(&workflow.items()[0], "conductivity"), None);
    assert_eq!(argument_param(&workflow.items()[2], "conductivity"), Some(0.04));
}

#[test]
fn test_options_reach_the_workflow() {
    let problem = discrete_problem();
    let point = problem
        .create_data_point_with_values(vec![VariableValue::Integer(2), VariableValue::Integer(1)])
        .unwrap();
    let options = WorkflowOptions::new()
        .with_flat_output_directory(false)
        .with_ruby_include_dir("lib/ruby");

    let workflow = problem.create_workflow(&point, &options).unwrap();
    assert!(!workflow.has_param(FLAT_OUTPUT_DIRECTORY_PARAM));
    let ruby_items: Vec<_> = workflow.items().iter().filter(|i| i.job_type == JobType::Ruby).collect();
    assert_eq!(ruby_items.len(), 2);
    assert!(ruby_items.iter().all(|i| i.param("include_dir") == Some("lib/ruby")));
}

// thickness and conductivity, each holding its own measure handle
fn insulation_problem(first: RubyMeasure, second: RubyMeasure) -> Problem {
    let thickness = RubyContinuousVariable::new("thickness", Argument::make_double_argument("thickness", true), first)
        .with_range(ContinuousRange::bounded(0.01, 0.3));
    let conductivity =
        RubyContinuousVariable::new("conductivity", Argument::make_double_argument("conductivity", true), second)
            .with_range(ContinuousRange::bounded(0.02, 0.05));
    let mut workflow: Vec<WorkflowStep> = vec![thickness.into(), conductivity.into()];
    workflow.extend(simulation_steps());
    Problem::with_workflow("Insulation", workflow).unwrap()
}

fn insulation_point(problem: &Problem) -> DataPoint {
    problem
        .create_data_point_with_values(vec![VariableValue::Double(0.1), VariableValue::Double(0.03)])
        .unwrap()
}

#[test]
fn test_copies_at_the_same_version_chain() {
    let dir = TempDir::new().unwrap();
    let measure = model_measure("insulation");
    let problem = insulation_problem(measure.clone(), measure.duplicate());
    let steps = problem.workflow();
    assert!(!problem.file_types_are_compatible(&steps[1], Some(FileType::Osm), Some(FileType::Osm)));

    let point = insulation_point(&problem);
    let workflow = problem.create_workflow(&point, &WorkflowOptions::default()).unwrap();
    assert_eq!(workflow.len(), 4);
    assert_eq!(argument_param(&workflow.items()[0], "thickness"), Some(0.1));
    assert_eq!(argument_param(&workflow.items()[0], "conductivity"), Some(0.03));

    problem.update_data_point(&point, &completed_job(&workflow, dir.path()));
    let records = problem.get_jobs_by_workflow_step(&point, false).unwrap();
    assert!(records[0].job.is_none());
    assert_eq!(records[1].job.as_ref().unwrap().job_type, JobType::Ruby);
}

#[test]
fn test_copies_at_different_versions_run_separately() {
    let dir = TempDir::new().unwrap();
    let measure = model_measure("insulation");
    let older = measure.duplicate();
    measure.set_description("thicker boards");
    assert!(older.uuid_equal(&measure));
    assert!(!older.uuid_and_version_equal(&measure));

    let problem = insulation_problem(older, measure);
    let steps = problem.workflow();
    assert!(problem.file_types_are_compatible(&steps[1], Some(FileType::Osm), Some(FileType::Osm)));

    let point = insulation_point(&problem);
    let workflow = problem.create_workflow(&point, &WorkflowOptions::default()).unwrap();
    assert_eq!(
        workflow.job_types(),
        vec![
            JobType::Ruby,
            JobType::Ruby,
            JobType::ModelToIdf,
            JobType::EnergyPlus,
            JobType::OpenStudioPostProcess,
        ]
    );
    assert_eq!(argument_param(&workflow.items()[0], "thickness"), Some(0.1));
    assert_eq!(argument_param(&workflow.items()[0], "conductivity"), None);
    assert_eq!(argument_param(&workflow.items()[1], "conductivity"), Some(0.03));

    problem.update_data_point(&point, &completed_job(&workflow, dir.path()));
    let records = problem.get_jobs_by_workflow_step(&point, false).unwrap();
    assert_eq!(records.len(), 5);
    let first = records[0].job.as_ref().unwrap();
    let second = records[1].job.as_ref().unwrap();
    assert_eq!((first.job_type, second.job_type), (JobType::Ruby, JobType::Ruby));
    assert_ne!(first.uuid, second.uuid);
    assert_eq!(records[2].job.as_ref().unwrap().job_type, JobType::ModelToIdf);
}
