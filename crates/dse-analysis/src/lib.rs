//! DSE analysis core
//!
//! A parametric building-energy design problem and the points sampled from it:
//! - [`Problem`]: an ordered workflow of variables and fixed work items whose
//!   file types must chain from the seed model through to the simulation
//! - [`MeasureGroup`] / [`RubyContinuousVariable`]: discrete and continuous
//!   input variables, both built on [`Measure`]s
//! - [`DataPoint`]: one value per variable, expanded into a job
//!   [`Workflow`](dse_runmanager::Workflow) and read back from the completed
//!   job tree
//! - [`Analysis`]: problem, seed, weather file and the data points, with
//!   invalidation flags fed by changes anywhere in the object graph
//!
//! Mutators that would break the file type chain return `false` and leave
//! the graph untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use dse_analysis::prelude::*;
//! use dse_runmanager::{FileType, JobType, WorkItem};
//!
//! let wwr = RubyMeasure::from_script("set_wwr.rb", Some(FileType::Osm), Some(FileType::Osm), true);
//! let group = MeasureGroup::new("wwr", vec![NullMeasure::new(true).into(), wwr.into()])?;
//! let problem = Problem::with_workflow(
//!     "office",
//!     vec![group.into(), WorkItem::new(JobType::ModelToIdf).into(), WorkItem::new(JobType::EnergyPlus).into()],
//! )?;
//!
//! let point = problem.create_data_point_with_values(vec![VariableValue::Integer(1)]).unwrap();
//! let workflow = problem.create_workflow(&point, &WorkflowOptions::default())?;
//! assert_eq!(workflow.len(), 3);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analysis;
pub mod continuous;
pub mod data_point;
pub mod error;
pub mod file_reference;
pub mod function;
pub mod measure;
pub mod object;
pub mod options;
pub mod problem;
pub mod uncertainty;
pub mod value;
pub mod variable;
pub mod variant;
pub mod workflow_step;

pub use analysis::Analysis;
pub use continuous::{ContinuousRange, ContinuousVariable};
pub use data_point::DataPoint;
pub use error::AnalysisError;
pub use file_reference::FileReference;
pub use function::LinearFunction;
pub use measure::{Measure, NullMeasure, RubyMeasure, ScriptSource};
pub use object::{AnalysisObject, ChangeType, ParentObject};
pub use options::WorkflowOptions;
pub use problem::{Problem, WorkflowStepJob};
pub use uncertainty::{AlgorithmProfile, DesignAlgorithm, UncertaintyDescription, UncertaintyType};
pub use value::{ValueType, VariableValue};
pub use variable::{InputVariable, MeasureGroup, OutputAttributeVariable, RubyContinuousVariable, Variable};
pub use variant::ToVariant;
pub use workflow_step::{StepPayload, WorkflowStep};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building problems and data points
    pub use crate::{
        Analysis, AnalysisError, AnalysisObject, ContinuousRange, ContinuousVariable, DataPoint, FileReference,
        InputVariable, LinearFunction, Measure, MeasureGroup, NullMeasure, OutputAttributeVariable, Problem,
        RubyContinuousVariable, RubyMeasure, ToVariant, VariableValue, WorkflowOptions, WorkflowStep,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
