//! Job specifications handed to the execution engine

use crate::file_type::FileType;
use crate::job_type::JobType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Workflow parameter asking the engine to write all outputs into one directory
pub const FLAT_OUTPUT_DIRECTORY_PARAM: &str = "flatoutdir";

/// One executable unit of a workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// What kind of job to run
    pub job_type: JobType,
    /// String parameters understood by the job
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Files the job needs besides its input (scripts, include files)
    #[serde(default)]
    pub required_files: Vec<PathBuf>,
    /// Declared input file type
    pub input_file_type: Option<FileType>,
    /// Declared output file type
    pub output_file_type: Option<FileType>,
}

impl WorkItem {
    /// Create a work item with the job type's default file types
    #[must_use]
    pub fn new(job_type: JobType) -> Self {
        let (input_file_type, output_file_type) = job_type.default_file_types();
        Self {
            job_type,
            params: BTreeMap::new(),
            required_files: Vec::new(),
            input_file_type,
            output_file_type,
        }
    }

    /// Null placeholder item
    #[must_use]
    pub fn null() -> Self {
        Self::new(JobType::Null)
    }

    /// Override the declared file types
    #[inline]
    #[must_use]
    pub fn with_file_types(mut self, input: Option<FileType>, output: Option<FileType>) -> Self {
        self.input_file_type = input;
        self.output_file_type = output;
        self
    }

    /// Add a string parameter
    #[inline]
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a required file
    #[inline]
    #[must_use]
    pub fn with_required_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.required_files.push(path.into());
        self
    }

    /// Look up a parameter
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// True for the do-nothing job type
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.job_type == JobType::Null
    }
}

/// Ordered list of work items plus workflow-wide flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    items: Vec<WorkItem>,
    #[serde(default)]
    params: BTreeSet<String>,
}

impl Workflow {
    /// Create an empty workflow
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a work item
    pub fn push(&mut self, item: WorkItem) {
        self.items.push(item);
    }

    /// Append several work items
    pub fn extend(&mut self, items: impl IntoIterator<Item = WorkItem>) {
        self.items.extend(items);
    }

    /// Set a workflow-wide flag
    pub fn add_param(&mut self, param: impl Into<String>) {
        self.params.insert(param.into());
    }

    /// Whether a workflow-wide flag is set
    #[must_use]
    pub fn has_param(&self, param: &str) -> bool {
        self.params.contains(param)
    }

    /// Work items in execution order
    #[must_use]
    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Workflow-wide flags
    #[must_use]
    pub fn params(&self) -> &BTreeSet<String> {
        &self.params
    }

    /// Number of work items
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there are no work items
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Job types in execution order
    #[must_use]
    pub fn job_types(&self) -> Vec<JobType> {
        self.items.iter().map(|i| i.job_type).collect()
    }

    /// Input type of the first item that declares one
    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        self.items.iter().find_map(|i| i.input_file_type)
    }
}

impl FromIterator<WorkItem> for Workflow {
    fn from_iter<T: IntoIterator<Item = WorkItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
            params: BTreeSet::new(),
        }
    }
}
