//! Completed job tree snapshots
//!
//! The execution engine reports a finished run as a tree of [`Job`]s. For the
//! linear workflows produced by a problem the tree is a chain: every job has
//! at most one child. A single physical job may stand for several logical
//! steps when the engine merged them ([`MergedJob`]).

use crate::error::RunManagerError;
use crate::job_type::JobType;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Final state of one job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Finished,
    Failed,
    Canceled,
}

/// Aggregate state of a whole job tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeStatus {
    Finished,
    Failed,
    Canceled,
}

impl TreeStatus {
    #[inline]
    #[must_use]
    pub fn is_success(self) -> bool {
        self == TreeStatus::Finished
    }
}

/// Severity of a job message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One message reported by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMessage {
    pub severity: Severity,
    pub message: String,
}

/// Messages reported by a job or a whole tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobErrors {
    #[serde(default)]
    messages: Vec<JobMessage>,
}

impl JobErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.messages.push(JobMessage {
            severity,
            message: message.into(),
        });
    }

    /// Append every message of `other`, keeping order
    pub fn append(&mut self, other: &JobErrors) {
        self.messages.extend(other.messages.iter().cloned());
    }

    /// All messages in report order
    #[must_use]
    pub fn messages(&self) -> &[JobMessage] {
        &self.messages
    }

    fn with_severity(&self, severity: Severity) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.severity == severity)
            .map(|m| m.message.as_str())
            .collect()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<&str> {
        self.with_severity(Severity::Error)
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.with_severity(Severity::Warning)
    }

    #[must_use]
    pub fn infos(&self) -> Vec<&str> {
        self.with_severity(Severity::Info)
    }

    /// No error-level message was reported
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.messages.iter().all(|m| m.severity != Severity::Error)
    }
}

/// A file produced by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
}

impl FileInfo {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lower case extension, empty when the path has none
    #[must_use]
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// File manifest of a job or a whole tree, in production order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Files {
    #[serde(default)]
    files: Vec<FileInfo>,
}

impl Files {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: FileInfo) {
        self.files.push(file);
    }

    pub fn append(&mut self, other: &Files) {
        self.files.extend(other.files.iter().cloned());
    }

    #[must_use]
    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Most recently produced file with the given extension
    #[must_use]
    pub fn last_by_extension(&self, extension: &str) -> Option<&FileInfo> {
        self.files
            .iter()
            .rev()
            .find(|f| f.extension().eq_ignore_ascii_case(extension))
    }

    /// Every file with the given extension
    #[must_use]
    pub fn all_by_extension(&self, extension: &str) -> Vec<&FileInfo> {
        self.files
            .iter()
            .filter(|f| f.extension().eq_ignore_ascii_case(extension))
            .collect()
    }
}

/// A logical step the engine folded into a physical job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedJob {
    pub job_type: JobType,
    #[serde(default)]
    pub errors: JobErrors,
}

/// One node of a completed job tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub uuid: Uuid,
    pub job_type: JobType,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub errors: JobErrors,
    #[serde(default)]
    pub output_files: Files,
    #[serde(default)]
    pub merged_jobs: Vec<MergedJob>,
    #[serde(default)]
    pub children: Vec<Job>,
}

impl Job {
    /// Finished job with no messages, files or children
    #[must_use]
    pub fn new(job_type: JobType) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            job_type,
            status: JobStatus::Finished,
            errors: JobErrors::new(),
            output_files: Files::new(),
            merged_jobs: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_message(mut self, severity: Severity, message: impl Into<String>) -> Self {
        self.errors.push(severity, message);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_files.push(FileInfo::new(path));
        self
    }

    #[inline]
    #[must_use]
    pub fn with_merged_job(mut self, job_type: JobType) -> Self {
        self.merged_jobs.push(MergedJob {
            job_type,
            errors: JobErrors::new(),
        });
        self
    }

    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: Job) -> Self {
        self.children.push(child);
        self
    }

    /// Nest jobs into a chain, first job at the root
    #[must_use]
    pub fn chain(jobs: impl IntoIterator<Item = Job>) -> Option<Job> {
        let jobs: Vec<Job> = jobs.into_iter().collect();
        jobs.into_iter().rev().fold(None, |child, mut parent| {
            if let Some(child) = child {
                parent.children.push(child);
            }
            Some(parent)
        })
    }

    /// The next job in a chain.
    ///
    /// Errors when the node branches, since a problem's workflow is linear.
    pub fn single_child(&self) -> Result<Option<&Job>, RunManagerError> {
        match self.children.as_slice() {
            [] => Ok(None),
            [child] => Ok(Some(child)),
            _ => {
                tracing::warn!("Job {} branches into {} children", self.uuid, self.children.len());
                Err(RunManagerError::MalformedTree {
                    job: self.uuid,
                    reason: format!("expected at most one child, found {}", self.children.len()),
                })
            }
        }
    }

    /// Logical job types this node accounts for, in order
    #[must_use]
    pub fn logical_job_types(&self) -> Vec<JobType> {
        if self.merged_jobs.is_empty() {
            vec![self.job_type]
        } else {
            self.merged_jobs.iter().map(|m| m.job_type).collect()
        }
    }

    fn visit<'a>(&'a self, out: &mut Vec<&'a Job>) {
        out.push(self);
        for child in &self.children {
            child.visit(out);
        }
    }

    /// Every job of the tree, parents before children
    #[must_use]
    pub fn descendants(&self) -> Vec<&Job> {
        let mut out = Vec::new();
        self.visit(&mut out);
        out
    }

    /// Aggregate status: any failure fails the tree, then any cancellation
    #[must_use]
    pub fn tree_status(&self) -> TreeStatus {
        let jobs = self.descendants();
        if jobs.iter().any(|j| j.status == JobStatus::Failed) {
            TreeStatus::Failed
        } else if jobs.iter().any(|j| j.status == JobStatus::Canceled) {
            TreeStatus::Canceled
        } else {
            TreeStatus::Finished
        }
    }

    /// Messages of every job (and merged step) in the tree
    #[must_use]
    pub fn tree_errors(&self) -> JobErrors {
        let mut errors = JobErrors::new();
        for job in self.descendants() {
            errors.append(&job.errors);
            for merged in &job.merged_jobs {
                errors.append(&merged.errors);
            }
        }
        errors
    }

    /// Output files of every job in the tree
    #[must_use]
    pub fn tree_all_files(&self) -> Files {
        let mut files = Files::new();
        for job in self.descendants() {
            files.append(&job.output_files);
        }
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn simulation_chain() -> Job {
        Job::chain([
            Job::new(JobType::ModelToIdf).with_output_file("1-ModelToIdf/in.idf"),
            Job::new(JobType::EnergyPlus)
                .with_output_file("2-EnergyPlus/eplusout.sql")
                .with_message(Severity::Warning, "unused object"),
            Job::new(JobType::OpenStudioPostProcess).with_output_file("3-Post/report.xml"),
        ])
        .unwrap()
    }

    #[test]
    fn test_chain_nests_in_order() {
        let root = simulation_chain();
        let types: Vec<JobType> = root.descendants().iter().map(|j| j.job_type).collect();
        assert_eq!(
            types,
            vec![JobType::ModelToIdf, JobType::EnergyPlus, JobType::OpenStudioPostProcess]
        );
        assert!(Job::chain(Vec::new()).is_none());
    }

    #[test]
    fn test_tree_status_and_errors() {
        let root = simulation_chain();
        assert_eq!(root.tree_status(), TreeStatus::Finished);
        assert!(root.tree_errors().succeeded());
        assert_eq!(root.tree_errors().warnings(), vec!["unused object"]);

        let failed = root.with_child(
            Job::new(JobType::Null)
                .with_status(JobStatus::Failed)
                .with_message(Severity::Error, "boom"),
        );
        assert_eq!(failed.tree_status(), TreeStatus::Failed);
        assert!(!failed.tree_errors().succeeded());
    }

    #[test]
    fn test_files_by_extension() {
        let files = Job::chain([
            Job::new(JobType::Ruby).with_output_file("1/out.osm"),
            Job::new(JobType::Ruby).with_output_file("2/out.OSM"),
            Job::new(JobType::ModelToIdf).with_output_file("3/in.idf"),
        ])
        .unwrap()
        .tree_all_files();

        assert_eq!(files.last_by_extension("osm").unwrap().path(), Path::new("2/out.OSM"));
        assert_eq!(files.all_by_extension("osm").len(), 2);
        assert!(files.last_by_extension("sql").is_none());
    }

    #[test]
    fn test_single_child_rejects_branching() {
        let root = Job::new(JobType::Null)
            .with_child(Job::new(JobType::Ruby))
            .with_child(Job::new(JobType::Ruby));
        assert!(root.single_child().is_err());
        assert!(Job::new(JobType::Null).single_child().unwrap().is_none());
    }

    #[test]
    fn test_merged_job_types() {
        let job = Job::new(JobType::Ruby)
            .with_merged_job(JobType::Ruby)
            .with_merged_job(JobType::Ruby);
        assert_eq!(job.logical_job_types(), vec![JobType::Ruby, JobType::Ruby]);
        assert_eq!(Job::new(JobType::EnergyPlus).logical_job_types(), vec![JobType::EnergyPlus]);
    }

    proptest! {
        #[test]
        fn prop_chain_walks_back_in_order(indices in prop::collection::vec(0..JobType::ALL.len(), 1..12)) {
            let types: Vec<JobType> = indices.iter().map(|&i| JobType::ALL[i]).collect();
            let root = Job::chain(types.iter().map(|&t| Job::new(t))).unwrap();

            let mut walked = Vec::new();
            let mut cursor = Some(&root);
            while let Some(job) = cursor {
                walked.push(job.job_type);
                cursor = job.single_child().unwrap();
            }
            prop_assert_eq!(walked, types);
        }
    }
}
