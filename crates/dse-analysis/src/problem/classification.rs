//! Variable classification for design and sampling algorithms

use super::Problem;
use crate::uncertainty::{DesignAlgorithm, UncertaintyType};
use crate::variable::InputVariable;
use std::collections::BTreeMap;

/// Uncertainty type of a variable, if the algorithm samples it as uncertain
fn sampled_uncertainty(variable: &InputVariable, algorithm: &impl DesignAlgorithm) -> Option<UncertaintyType> {
    variable
        .uncertainty_description()
        .map(|d| d.uncertainty_type())
        .filter(|t| algorithm.is_compatible(*t))
}

impl Problem {
    /// Variables the algorithm treats as continuous design variables.
    ///
    /// Continuous variables qualify unless sampled as uncertain. Discrete
    /// variables with more than one selected measure are relaxed to continuous
    /// when the algorithm only takes continuous input.
    #[must_use]
    pub fn continuous_design_variable_indices(&self, algorithm: &impl DesignAlgorithm) -> Vec<usize> {
        self.variables()
            .iter()
            .enumerate()
            .filter(|(_, v)| sampled_uncertainty(v, algorithm).is_none())
            .filter(|(_, v)| match v {
                InputVariable::RubyContinuous(_) => true,
                InputVariable::MeasureGroup(g) => {
                    algorithm.requires_continuous_variables() && g.num_measures(true) > 1
                }
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Discrete variables the algorithm treats as design variables; none when
    /// it only takes continuous input
    #[must_use]
    pub fn discrete_design_variable_indices(&self, algorithm: &impl DesignAlgorithm) -> Vec<usize> {
        if algorithm.requires_continuous_variables() {
            return Vec::new();
        }
        self.variables()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_discrete() && sampled_uncertainty(v, algorithm).is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Variables sampled as uncertain, grouped by distribution
    #[must_use]
    pub fn uncertain_variable_indices(&self, algorithm: &impl DesignAlgorithm) -> BTreeMap<UncertaintyType, Vec<usize>> {
        let mut result: BTreeMap<UncertaintyType, Vec<usize>> = BTreeMap::new();
        for (i, variable) in self.variables().iter().enumerate() {
            if let Some(t) = sampled_uncertainty(variable, algorithm) {
                result.entry(t).or_default().push(i);
            }
        }
        result
    }
}
