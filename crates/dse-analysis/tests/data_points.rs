//! Data point creation, validity and value/measure conversion tests

use dse_analysis::prelude::*;
use dse_analysis::{AnalysisError, ValueType};
use dse_test_utils::{compound_problem, discrete_problem};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn test_combinatorial_size_of_fixture() {
    let problem = discrete_problem();
    assert_eq!(problem.combinatorial_size(true), Some(6));
    let (compound, _) = compound_problem();
    assert_eq!(compound.combinatorial_size(true), None);
}

#[test]
fn test_create_with_measures() {
    let problem = discrete_problem();
    let wwr = problem.variable(0).unwrap().as_measure_group().unwrap().measure(2);
    let lighting = problem.variable(1).unwrap().as_measure_group().unwrap().measure(0);

    let point = problem.create_data_point_with_measures(&[wwr.clone(), lighting]).unwrap();
    assert_eq!(point.values(), vec![VariableValue::Integer(2), VariableValue::Integer(0)]);
    assert!(problem.is_valid(&point));

    // an unset discrete position converts to a typed null, which no point may carry
    assert_eq!(
        problem.get_variable_values(&[wwr.clone(), None]),
        vec![VariableValue::Integer(2), VariableValue::Null(ValueType::Integer)]
    );
    assert!(problem.create_data_point_with_measures(&[wwr, None]).is_none());
    // one entry per variable
    assert!(problem.create_data_point_with_measures(&[None]).is_none());
}

#[test]
fn test_continuous_values_must_be_feasible() {
    let (problem, _) = compound_problem();
    assert!(problem
        .create_data_point_with_values(vec![VariableValue::Double(0.1), VariableValue::Double(0.03)])
        .is_some());
    // thickness is bounded to [0.01, 0.3]
    assert!(problem
        .create_data_point_with_values(vec![VariableValue::Double(0.5), VariableValue::Double(0.03)])
        .is_none());
}

#[test]
fn test_wrong_value_count_fails_workflow_creation() {
    let problem = discrete_problem();
    let point = DataPoint::new(&problem, vec![VariableValue::Integer(0)]);
    assert!(!problem.is_valid(&point));
    let err = problem.create_workflow(&point, &WorkflowOptions::default()).unwrap_err();
    assert!(matches!(err, AnalysisError::ValueCountMismatch { expected: 2, actual: 1 }));
}

#[test]
fn test_matching_treats_null_as_wildcard() {
    let problem = discrete_problem();
    let point = problem
        .create_data_point_with_values(vec![VariableValue::Integer(1), VariableValue::Integer(0)])
        .unwrap();
    assert!(point.matches(&[VariableValue::Null(ValueType::Integer), VariableValue::Integer(0)]));
    assert!(!point.matches(&[VariableValue::Integer(2), VariableValue::Integer(0)]));
}

proptest! {
    #[test]
    fn prop_values_and_measures_round_trip(wwr in 0i64..3, lighting in 0i64..2) {
        let problem = discrete_problem();
        let values = vec![VariableValue::Integer(wwr), VariableValue::Integer(lighting)];

        let measures = problem.get_measures(&values);
        prop_assert_eq!(measures.len(), 2);
        prop_assert!(measures.iter().all(Option::is_some));
        prop_assert_eq!(problem.get_variable_values(&measures), values.clone());

        let point = problem.create_data_point_with_values(values).unwrap();
        prop_assert!(problem.is_valid(&point));
    }

    #[test]
    fn prop_out_of_range_values_are_invalid(wwr in 3i64..100) {
        let problem = discrete_problem();
        let values = vec![VariableValue::Integer(wwr), VariableValue::Integer(0)];
        prop_assert!(problem.get_measures(&values).is_empty());
        prop_assert!(problem.create_data_point_with_values(values).is_none());
    }
}
