//! Error types for the analysis core
//!
//! Structural rejections (an incompatible measure, an out-of-range index) are
//! not errors: the mutators return `false` and leave the object graph as it
//! was. The variants below are the fatal tier:
//! - Inconsistent objects handed to a constructor
//! - Asking a step for a payload it does not carry
//! - Malformed or unrecognized serialized variants
//! - Data points or job trees that do not fit the problem

use dse_bcl::BclError;
use dse_runmanager::{FileType, RunManagerError};
use uuid::Uuid;

/// Fatal analysis error
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Measures disagree on the file types they consume or produce
    #[error("inconsistent file types in measure group '{group}': {reason}")]
    InconsistentMeasureGroup { group: String, reason: String },

    /// A problem's initial workflow does not form a consistent file type chain
    #[error("workflow of problem '{0}' is not a consistent file type chain")]
    InconsistentWorkflow(String),

    /// Seed file does not fit the problem's first input
    #[error("seed file type {seed} does not match problem input type {input}")]
    IncompatibleSeed { seed: FileType, input: FileType },

    /// A workflow step was asked for the payload it does not hold
    #[error("workflow step holds a {actual}, not a {requested}")]
    WrongPayload {
        requested: &'static str,
        actual: &'static str,
    },

    /// Data point carries the wrong number of values
    #[error("data point has {actual} values but the problem has {expected} variables")]
    ValueCountMismatch { expected: usize, actual: usize },

    /// A value cannot be used for its variable
    #[error("invalid value for variable '{variable}': {reason}")]
    InvalidValue { variable: String, reason: String },

    /// The completed job tree does not line up with the workflow
    #[error("job tree does not match workflow at step {step}: {reason}")]
    JobTreeMismatch { step: usize, reason: String },

    /// Data point is not part of the analysis
    #[error("data point {0} is not in this analysis")]
    UnknownDataPoint(Uuid),

    /// Output attribute required by a response function is missing
    #[error("output attribute '{0}' is not available")]
    MissingAttribute(String),

    /// A response function could not be evaluated
    #[error("response function '{function}' failed: {reason}")]
    FunctionEvaluation { function: String, reason: String },

    /// Serialized object carries an unknown type tag
    #[error("unknown {field} '{value}'")]
    UnknownDiscriminator { field: &'static str, value: String },

    /// Serialized object is malformed
    #[error("variant error: {0}")]
    Variant(#[from] serde_json::Error),

    /// Catalog or argument error
    #[error("measure error: {0}")]
    Bcl(#[from] BclError),

    /// Job boundary error
    #[error("job error: {0}")]
    RunManager(#[from] RunManagerError),
}

impl AnalysisError {
    /// Errors caused by the data handed in (values, attributes, job trees);
    /// the object graph itself is still usable.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ValueCountMismatch { .. }
                | Self::InvalidValue { .. }
                | Self::JobTreeMismatch { .. }
                | Self::UnknownDataPoint(_)
                | Self::MissingAttribute(_)
                | Self::FunctionEvaluation { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_split() {
        assert!(AnalysisError::MissingAttribute("eui".into()).is_recoverable());
        assert!(!AnalysisError::InconsistentWorkflow("p".into()).is_recoverable());
        assert!(!AnalysisError::UnknownDiscriminator {
            field: "measure_type",
            value: "Magic".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_messages() {
        let err = AnalysisError::ValueCountMismatch { expected: 3, actual: 2 };
        assert_eq!(err.to_string(), "data point has 2 values but the problem has 3 variables");
    }
}
