//! Value vectors, measure selections and data point validity

use super::Problem;
use crate::data_point::DataPoint;
use crate::measure::Measure;
use crate::object::AnalysisObject;
use crate::value::{ValueType, VariableValue};
use crate::variable::InputVariable;

impl Problem {
    /// Values selecting `measures`, position by position.
    ///
    /// `None` at a discrete position gives an integer null. Continuous
    /// positions always give a double null. A measure that is not in its
    /// group, or more measures than variables, yields an empty vector.
    #[must_use]
    pub fn get_variable_values(&self, measures: &[Option<Measure>]) -> Vec<VariableValue> {
        let variables = self.variables();
        if measures.len() > variables.len() {
            tracing::warn!(
                "Got {} measures for the {} variables of problem '{}'",
                measures.len(),
                variables.len(),
                self.name()
            );
            return Vec::new();
        }
        let mut values = Vec::with_capacity(measures.len());
        for (variable, measure) in variables.iter().zip(measures) {
            match (variable, measure) {
                (InputVariable::MeasureGroup(_), None) => values.push(VariableValue::Null(ValueType::Integer)),
                (InputVariable::MeasureGroup(group), Some(measure)) => match group.measure_index(measure) {
                    Some(index) => values.push(index.into()),
                    None => {
                        tracing::warn!(
                            "Measure '{}' is not part of variable '{}'",
                            measure.name(),
                            group.name()
                        );
                        return Vec::new();
                    }
                },
                (InputVariable::RubyContinuous(_), _) => values.push(VariableValue::Null(ValueType::Double)),
            }
        }
        values
    }

    /// Measures picked by `values`, position by position.
    ///
    /// Nulls and continuous positions give `None`. An invalid value, or more
    /// values than variables, yields an empty vector.
    #[must_use]
    pub fn get_measures(&self, values: &[VariableValue]) -> Vec<Option<Measure>> {
        let variables = self.variables();
        if values.len() > variables.len() {
            tracing::warn!(
                "Got {} values for the {} variables of problem '{}'",
                values.len(),
                variables.len(),
                self.name()
            );
            return Vec::new();
        }
        let mut measures = Vec::with_capacity(values.len());
        for (variable, value) in variables.iter().zip(values) {
            match variable {
                InputVariable::MeasureGroup(_) if value.is_null() => measures.push(None),
                InputVariable::MeasureGroup(group) => match group.measure_for(value) {
                    Some(measure) => measures.push(Some(measure)),
                    None => {
                        tracing::warn!("{} is not a valid value for variable '{}'", value, group.name());
                        return Vec::new();
                    }
                },
                InputVariable::RubyContinuous(_) => measures.push(None),
            }
        }
        measures
    }

    /// Number of distinct data points a full factorial would produce.
    ///
    /// Only defined when every variable is discrete. A variable with no
    /// (selected) measures makes the size undefined rather than zero.
    #[must_use]
    pub fn combinatorial_size(&self, selected_only: bool) -> Option<u64> {
        let mut size: Option<u64> = None;
        for variable in self.variables() {
            let InputVariable::MeasureGroup(group) = variable else {
                return None;
            };
            let count = group.num_measures(selected_only) as u64;
            if count == 0 {
                tracing::warn!("Variable '{}' has no measures to choose from", group.name());
                return None;
            }
            size = Some(size.map_or(count, |s| s.saturating_mul(count)));
        }
        size
    }

    /// Whether a data point belongs to this problem and its values fit.
    ///
    /// The point must have been built against this very problem object, not
    /// merely one of the same shape.
    #[must_use]
    pub fn is_valid(&self, data_point: &DataPoint) -> bool {
        if data_point.problem() != *self {
            tracing::warn!("Data point was not created for problem '{}'", self.name());
            return false;
        }
        let values = data_point.values();
        let variables = self.variables();
        if values.len() != variables.len() {
            tracing::warn!(
                "Data point has {} values, problem '{}' has {} variables",
                values.len(),
                self.name(),
                variables.len()
            );
            return false;
        }
        for (variable, value) in variables.iter().zip(&values) {
            if !variable.is_valid(value) {
                tracing::warn!("{} is not a valid value for variable '{}'", value, variable.name());
                return false;
            }
        }
        true
    }

    /// A data point with these values, if they are valid for this problem
    #[must_use]
    pub fn create_data_point_with_values(&self, values: Vec<VariableValue>) -> Option<DataPoint> {
        let data_point = DataPoint::new(self, values);
        self.is_valid(&data_point).then_some(data_point)
    }

    /// A data point selecting these measures (continuous positions must be `None`)
    #[must_use]
    pub fn create_data_point_with_measures(&self, measures: &[Option<Measure>]) -> Option<DataPoint> {
        if measures.len() != self.num_variables() {
            tracing::warn!("Need one measure per variable of problem '{}'", self.name());
            return None;
        }
        let values = self.get_variable_values(measures);
        self.create_data_point_with_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::{NullMeasure, RubyMeasure};
    use crate::variable::MeasureGroup;
    use crate::workflow_step::WorkflowStep;
    use dse_runmanager::FileType;
    use pretty_assertions::assert_eq;

    fn group_with(n: usize) -> MeasureGroup {
        let mut measures: Vec<Measure> = vec![NullMeasure::new(true).into()];
        for i in 1..n {
            measures.push(RubyMeasure::from_script(format!("m{i}.rb"), Some(FileType::Osm), Some(FileType::Osm), false).into());
        }
        MeasureGroup::new("g", measures).unwrap()
    }

    fn problem_of(groups: &[MeasureGroup]) -> Problem {
        Problem::with_workflow("p", groups.iter().cloned().map(WorkflowStep::from).collect()).unwrap()
    }

    #[test]
    fn test_conversions() {
        let groups = [group_with(3), group_with(2)];
        let problem = problem_of(&groups);
        let picked = vec![groups[0].measure(2), None];
        let values = problem.get_variable_values(&picked);
        assert_eq!(values, vec![VariableValue::Integer(2), VariableValue::Null(ValueType::Integer)]);
        assert_eq!(problem.get_measures(&values), picked);

        assert!(problem.get_measures(&[VariableValue::Integer(5)]).is_empty());
        assert!(problem.get_variable_values(&[None, None, None]).is_empty());
        // measure from another group
        assert!(problem.get_variable_values(&[groups[1].measure(1)]).is_empty());
    }

    #[test]
    fn test_combinatorial_size() {
        let problem = problem_of(&[group_with(3), group_with(1), group_with(2)]);
        assert_eq!(problem.combinatorial_size(true), Some(6));

        let unselected = group_with(2);
        for m in unselected.measures(false) {
            m.set_is_selected(false);
        }
        let problem = problem_of(&[group_with(3), unselected]);
        assert_eq!(problem.combinatorial_size(true), None);
        assert_eq!(problem.combinatorial_size(false), Some(6));
        assert_eq!(Problem::new("empty").combinatorial_size(true), None);
    }

    #[test]
    fn test_validity_is_by_identity() {
        let a = problem_of(&[group_with(2)]);
        let b = problem_of(&[group_with(2)]);
        let dp = a.create_data_point_with_values(vec![VariableValue::Integer(1)]).unwrap();
        assert!(a.is_valid(&dp));
        assert!(!b.is_valid(&dp));
        assert!(a.create_data_point_with_values(vec![VariableValue::Integer(2)]).is_none());
        assert!(a.create_data_point_with_values(Vec::new()).is_none());
    }
}
