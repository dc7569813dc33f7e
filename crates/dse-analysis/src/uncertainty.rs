//! Uncertainty descriptions and the algorithm capabilities that consume them

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Probability distribution attached to a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UncertaintyType {
    Normal,
    Lognormal,
    Uniform,
    Loguniform,
    Triangular,
    Exponential,
    Beta,
    Gamma,
    Gumbel,
    Frechet,
    Weibull,
    HistogramBin,
    Poisson,
    Binomial,
    NegativeBinomial,
    Geometric,
    Hypergeometric,
    HistogramPoint,
}

impl UncertaintyType {
    /// Distributions over a continuous domain
    #[must_use]
    pub fn is_continuous(self) -> bool {
        !self.is_discrete()
    }

    /// Distributions over integers or a point set
    #[must_use]
    pub fn is_discrete(self) -> bool {
        matches!(
            self,
            UncertaintyType::Poisson
                | UncertaintyType::Binomial
                | UncertaintyType::NegativeBinomial
                | UncertaintyType::Geometric
                | UncertaintyType::Hypergeometric
                | UncertaintyType::HistogramPoint
        )
    }
}

impl fmt::Display for UncertaintyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A distribution type plus its named parameters (means, bounds, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyDescription {
    uncertainty_type: UncertaintyType,
    #[serde(default)]
    attributes: BTreeMap<String, f64>,
}

impl UncertaintyDescription {
    #[must_use]
    pub fn new(uncertainty_type: UncertaintyType) -> Self {
        Self {
            uncertainty_type,
            attributes: BTreeMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn uncertainty_type(&self) -> UncertaintyType {
        self.uncertainty_type
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<f64> {
        self.attributes.get(name).copied()
    }

    #[must_use]
    pub fn attributes(&self) -> &BTreeMap<String, f64> {
        &self.attributes
    }
}

/// What a design or sampling algorithm can accept
pub trait DesignAlgorithm {
    fn name(&self) -> &str;

    /// Whether every varying input must be continuous
    fn requires_continuous_variables(&self) -> bool;

    /// Whether variables with this distribution are sampled as uncertain
    fn is_compatible(&self, uncertainty_type: UncertaintyType) -> bool;
}

/// Plain data description of an algorithm's capabilities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmProfile {
    name: String,
    requires_continuous_variables: bool,
    #[serde(default)]
    compatible_uncertainty_types: BTreeSet<UncertaintyType>,
}

impl AlgorithmProfile {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires_continuous_variables: false,
            compatible_uncertainty_types: BTreeSet::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_requires_continuous_variables(mut self, requires: bool) -> Self {
        self.requires_continuous_variables = requires;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_compatible(mut self, types: impl IntoIterator<Item = UncertaintyType>) -> Self {
        self.compatible_uncertainty_types.extend(types);
        self
    }
}

impl DesignAlgorithm for AlgorithmProfile {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_continuous_variables(&self) -> bool {
        self.requires_continuous_variables
    }

    fn is_compatible(&self, uncertainty_type: UncertaintyType) -> bool {
        self.compatible_uncertainty_types.contains(&uncertainty_type)
    }
}
