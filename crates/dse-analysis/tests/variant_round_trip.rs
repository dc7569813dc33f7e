//! Saving object graphs as JSON variants and loading them back

use dse_analysis::prelude::*;
use dse_analysis::variant::{
    analysis_from_variant, problem_from_variant, workflow_step_from_variant, PROBLEM_TYPE, VARIABLE_TYPE,
    WORKFLOW_STEP_TYPE,
};
use dse_runmanager::{FileType, JobType, WorkItem};
use dse_test_utils::{completed_job, compound_problem, discrete_problem, eui_variable};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn uuids(problem: &Problem) -> Vec<uuid::Uuid> {
    problem.workflow().iter().map(AnalysisObject::uuid).collect()
}

#[test]
fn test_problem_round_trip_keeps_identity() {
    let problem = discrete_problem().with_responses(vec![LinearFunction::new("EUI", vec![eui_variable()], vec![2.0])]);
    let variant = problem.to_variant();
    assert_eq!(variant[PROBLEM_TYPE], "Problem");
    assert_eq!(variant["workflow"][0][WORKFLOW_STEP_TYPE], "InputVariable");
    assert_eq!(variant["workflow"][0]["input_variable"][VARIABLE_TYPE], "MeasureGroup");
    assert_eq!(variant["workflow"][2][WORKFLOW_STEP_TYPE], "WorkItem");

    // through text, as it would be stored
    let text = serde_json::to_string(&variant).unwrap();
    let loaded = problem_from_variant(&serde_json::from_str(&text).unwrap()).unwrap();

    assert!(loaded.uuid_and_version_equal(&problem));
    assert_eq!(uuids(&loaded), uuids(&problem));
    assert_eq!(loaded.combinatorial_size(true), Some(6));
    assert_eq!(loaded.responses()[0].coefficients(), vec![2.0]);
    assert_eq!(loaded.responses()[0].variables()[0].attribute_name(), "site_eui");
    assert!(!loaded.is_dirty());
    assert!(loaded.workflow().iter().all(|s| !s.is_dirty()));
}

#[test]
fn test_shared_measure_is_shared_again() {
    let (problem, measure) = compound_problem();
    let loaded = problem_from_variant(&problem.to_variant()).unwrap();

    let first = loaded.variable(0).unwrap();
    let second = loaded.variable(1).unwrap();
    let a = first.as_ruby_continuous().unwrap().ruby_measure();
    let b = second.as_ruby_continuous().unwrap().ruby_measure();
    assert_eq!(a, b);
    assert!(a.uuid_and_version_equal(&measure));
    assert_eq!(first.as_ruby_continuous().unwrap().range().maximum(), Some(0.3));

    // the loaded chain still collapses into one job
    let point = loaded
        .create_data_point_with_values(vec![VariableValue::Double(0.1), VariableValue::Double(0.03)])
        .unwrap();
    let workflow = loaded.create_workflow(&point, &WorkflowOptions::default()).unwrap();
    assert_eq!(workflow.len(), 4);
}

#[test]
fn test_work_item_step_round_trip() {
    let step = WorkflowStep::from(WorkItem::new(JobType::ExpandObjects).with_param("mode", "full"));
    let loaded = workflow_step_from_variant(&step.to_variant()).unwrap();
    assert_eq!(loaded.uuid(), step.uuid());
    assert_eq!(loaded.work_item().unwrap(), step.work_item().unwrap());
}

#[test]
fn test_analysis_round_trip() {
    let dir = TempDir::new().unwrap();
    let analysis = Analysis::new(
        "Office",
        discrete_problem(),
        FileReference::with_type("seeds/office.osm", FileType::Osm),
    )
    .unwrap();
    let problem = analysis.problem();
    let point = problem
        .create_data_point_with_values(vec![VariableValue::Integer(1), VariableValue::Integer(1)])
        .unwrap();
    point.add_tag("baseline");
    assert!(analysis.add_data_point(point.clone()));
    let workflow = problem.create_workflow(&point, &WorkflowOptions::default()).unwrap();
    analysis.update_data_point(&point, &completed_job(&workflow, dir.path())).unwrap();

    let loaded = analysis_from_variant(&analysis.to_variant()).unwrap();
    assert_eq!(loaded.uuid(), analysis.uuid());
    assert_eq!(loaded.seed(), analysis.seed());
    assert_eq!(loaded.data_points().len(), 1);

    let restored = &loaded.data_points()[0];
    assert_eq!(restored.uuid(), point.uuid());
    assert_eq!(restored.problem(), loaded.problem());
    assert!(restored.is_complete());
    assert!(restored.is_tagged("baseline"));
    assert_eq!(restored.sql_output_data(), point.sql_output_data());
    assert_eq!(restored.top_level_job(), point.top_level_job());
    assert!(loaded.problem().is_valid(restored));
}

#[test]
fn test_unknown_step_type_is_an_error() {
    let mut variant = WorkflowStep::from(WorkItem::null()).to_variant();
    variant[WORKFLOW_STEP_TYPE] = "Sleep".into();
    let err = workflow_step_from_variant(&variant).unwrap_err();
    assert_eq!(err.to_string(), "unknown workflow_step_type 'Sleep'");
}
