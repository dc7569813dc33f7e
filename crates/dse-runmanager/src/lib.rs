//! DSE Run Manager boundary
//!
//! The types exchanged with the external job-execution engine:
//! - [`FileType`]: the file kinds flowing between simulation steps
//! - [`JobType`]: the kinds of executable units and their default file types
//! - [`WorkItem`] / [`Workflow`]: the job specification handed to the engine
//! - [`Job`]: a completed job tree snapshot read back after execution
//!
//! # Example
//!
//! ```rust,ignore
//! use dse_runmanager::{FileType, JobType, WorkItem, Workflow};
//!
//! let mut workflow = Workflow::new();
//! workflow.push(WorkItem::new(JobType::ModelToIdf));
//! workflow.push(WorkItem::new(JobType::EnergyPlus));
//!
//! assert_eq!(workflow.input_file_type(), Some(FileType::Osm));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod file_type;
pub mod job;
pub mod job_type;
pub mod workflow;

pub use error::RunManagerError;
pub use file_type::FileType;
pub use job::{FileInfo, Files, Job, JobErrors, JobMessage, JobStatus, MergedJob, Severity, TreeStatus};
pub use job_type::JobType;
pub use workflow::{WorkItem, Workflow, FLAT_OUTPUT_DIRECTORY_PARAM};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and reading jobs
    pub use crate::{FileType, Job, JobStatus, JobType, Severity, WorkItem, Workflow};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
