//! Invalidation flags raised on the analysis by changes deep in the problem

use dse_analysis::prelude::*;
use dse_bcl::Argument;
use dse_runmanager::{FileType, JobType};
use dse_test_utils::{choice_group, completed_job, discrete_problem};
use tempfile::TempDir;

fn office() -> Analysis {
    Analysis::new(
        "Office",
        discrete_problem(),
        FileReference::with_type("seeds/office.osm", FileType::Osm),
    )
    .unwrap()
}

fn add_point(analysis: &Analysis, wwr: i64, lighting: i64) -> DataPoint {
    let values = vec![VariableValue::Integer(wwr), VariableValue::Integer(lighting)];
    let point = analysis.problem().create_data_point_with_values(values).unwrap();
    assert!(analysis.add_data_point(point.clone()));
    point
}

fn complete(analysis: &Analysis, point: &DataPoint, dir: &TempDir) {
    let workflow = analysis
        .problem()
        .create_workflow(point, &WorkflowOptions::default())
        .unwrap();
    analysis.update_data_point(point, &completed_job(&workflow, dir.path())).unwrap();
}

#[test]
fn test_duplicate_points_are_refused() {
    let analysis = office();
    add_point(&analysis, 1, 0);
    let again = analysis
        .problem()
        .create_data_point_with_values(vec![VariableValue::Integer(1), VariableValue::Integer(0)])
        .unwrap();
    assert!(!analysis.add_data_point(again));

    let foreign = discrete_problem()
        .create_data_point_with_values(vec![VariableValue::Integer(2), VariableValue::Integer(0)])
        .unwrap();
    assert!(!analysis.add_data_point(foreign));
    assert_eq!(analysis.data_points().len(), 1);
}

#[test]
fn test_argument_change_invalidates_results_only() {
    let dir = TempDir::new().unwrap();
    let analysis = office();
    let point = add_point(&analysis, 1, 0);
    complete(&analysis, &point, &dir);
    assert_eq!(analysis.complete_data_points().len(), 1);
    assert!(!analysis.results_are_invalid());

    let group = analysis.problem().variable(0).unwrap();
    let measure = group.as_measure_group().unwrap().measure(1).unwrap();
    measure.as_ruby().unwrap().add_argument(Argument::make_double_argument("wwr", false));

    assert!(analysis.results_are_invalid());
    assert!(!analysis.data_points_are_invalid());
    assert!(!analysis.clear_dirty_flag());

    analysis.clear_all_results();
    assert!(!analysis.results_are_invalid());
    assert!(!point.is_complete());
    assert!(analysis.clear_dirty_flag());
    assert!(!analysis.is_dirty());
}

#[test]
fn test_results_flag_needs_complete_points() {
    let analysis = office();
    add_point(&analysis, 2, 1);
    let group = analysis.problem().variable(1).unwrap();
    assert!(group.as_measure_group().unwrap().measure(1).unwrap().set_is_selected(false));
    assert!(!analysis.results_are_invalid());
}

#[test]
fn test_new_variable_invalidates_data_points() {
    let analysis = office();
    add_point(&analysis, 0, 0);

    assert!(analysis.problem().insert(0, choice_group("roof", 1)));
    assert!(analysis.data_points_are_invalid());
    assert!(analysis.results_are_invalid());

    // stale points block new ones until removed
    let point = analysis
        .problem()
        .create_data_point_with_values(vec![
            VariableValue::Integer(0),
            VariableValue::Integer(0),
            VariableValue::Integer(0),
        ])
        .unwrap();
    assert!(!analysis.add_data_point(point.clone()));

    analysis.remove_all_data_points();
    assert!(!analysis.data_points_are_invalid());
    assert!(analysis.add_data_point(point));
}

#[test]
fn test_work_item_changes_keep_points() {
    let analysis = office();
    add_point(&analysis, 0, 1);
    let index = analysis.problem().workflow_step_index_by_job_type(JobType::EnergyPlus).unwrap();
    assert!(analysis.problem().insert(index, dse_runmanager::WorkItem::new(JobType::ExpandObjects)));
    assert!(!analysis.data_points_are_invalid());
}

#[test]
fn test_update_requires_own_point() {
    let dir = TempDir::new().unwrap();
    let analysis = office();
    let stranger = analysis
        .problem()
        .create_data_point_with_values(vec![VariableValue::Integer(0), VariableValue::Integer(0)])
        .unwrap();
    let workflow = analysis
        .problem()
        .create_workflow(&stranger, &WorkflowOptions::default())
        .unwrap();
    let err = analysis
        .update_data_point(&stranger, &completed_job(&workflow, dir.path()))
        .unwrap_err();
    assert!(matches!(err, dse_analysis::AnalysisError::UnknownDataPoint(uuid) if uuid == stranger.uuid()));
}

#[test]
fn test_seed_swap_must_fit_problem() {
    let analysis = office();
    assert!(!analysis.set_seed(FileReference::with_type("seeds/office.idf", FileType::Idf)));
    assert!(analysis.set_seed(FileReference::with_type("seeds/other.osm", FileType::Osm)));
    assert!(!analysis.set_weather_file(FileReference::with_type("seeds/office.osm", FileType::Osm)));
    assert!(analysis.set_weather_file(FileReference::with_type("weather/chicago.epw", FileType::Epw)));
}
