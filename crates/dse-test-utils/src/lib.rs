//! Testing utilities for the DSE workspace
//!
//! Shared problem fixtures and completed job trees.

#![allow(missing_docs)]

use dse_analysis::{
    ContinuousRange, Measure, MeasureGroup, NullMeasure, OutputAttributeVariable, Problem, RubyContinuousVariable,
    RubyMeasure, WorkflowStep,
};
use dse_bcl::{Argument, BclMeasure, MeasureType};
use dse_runmanager::{FileType, Job, JobStatus, JobType, Severity, WorkItem, Workflow};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the attribute document written by [`write_attributes`]
pub const ATTRIBUTES_FILE_NAME: &str = "attributes.json";

pub fn model_measure(name: &str) -> RubyMeasure {
    RubyMeasure::from_script(format!("scripts/{name}.rb"), Some(FileType::Osm), Some(FileType::Osm), true)
}

pub fn energyplus_measure(name: &str) -> RubyMeasure {
    RubyMeasure::from_script(format!("scripts/{name}.rb"), Some(FileType::Idf), Some(FileType::Idf), true)
}

pub fn catalog_measure(name: &str) -> BclMeasure {
    BclMeasure::new(name, format!("measures/{name}"), MeasureType::ModelMeasure)
        .with_argument(Argument::make_double_argument("fraction", true))
}

/// Do-nothing choice followed by `alternatives` model measures
pub fn choice_group(name: &str, alternatives: usize) -> MeasureGroup {
    let mut measures: Vec<Measure> = vec![NullMeasure::new(true).into()];
    for i in 0..alternatives {
        measures.push(model_measure(&format!("{name}_{i}")).into());
    }
    MeasureGroup::new(name, measures).unwrap()
}

/// Translation and simulation items closing every fixture workflow
pub fn simulation_steps() -> Vec<WorkflowStep> {
    vec![
        WorkItem::new(JobType::ModelToIdf).into(),
        WorkItem::new(JobType::EnergyPlus).into(),
        WorkItem::new(JobType::OpenStudioPostProcess).into(),
    ]
}

/// Two discrete model variables (3 and 2 choices) ahead of the simulation
pub fn discrete_problem() -> Problem {
    let mut workflow: Vec<WorkflowStep> = vec![choice_group("wwr", 2).into(), choice_group("lighting", 1).into()];
    workflow.extend(simulation_steps());
    Problem::with_workflow("Discrete Office", workflow).unwrap()
}

/// Two continuous variables setting arguments of one shared model measure,
/// followed by the simulation. Returns the shared measure too.
pub fn compound_problem() -> (Problem, RubyMeasure) {
    let measure = model_measure("insulation");
    let thickness = RubyContinuousVariable::new(
        "thickness",
        Argument::make_double_argument("thickness", true),
        measure.clone(),
    )
    .with_range(ContinuousRange::bounded(0.01, 0.3));
    let conductivity = RubyContinuousVariable::new(
        "conductivity",
        Argument::make_double_argument("conductivity", true),
        measure.clone(),
    )
    .with_range(ContinuousRange::bounded(0.02, 0.05));

    let mut workflow: Vec<WorkflowStep> = vec![thickness.into(), conductivity.into()];
    workflow.extend(simulation_steps());
    (Problem::with_workflow("Compound Office", workflow).unwrap(), measure)
}

/// Response variable reading a site EUI attribute
pub fn eui_variable() -> OutputAttributeVariable {
    OutputAttributeVariable::new("Site EUI", "site_eui")
}

fn output_file(dir: &Path, index: usize, item: &WorkItem) -> Option<PathBuf> {
    let file_type = item.output_file_type?;
    let stem = match item.job_type {
        JobType::EnergyPlus => "eplusout",
        JobType::ModelToIdf => "in",
        _ => "out",
    };
    Some(dir.join(format!("{index}-{}", item.job_type)).join(format!("{stem}.{}", file_type.extension())))
}

/// A finished linear job tree with one job per work item.
///
/// Each job produces a file of its declared output type under `dir`.
pub fn completed_job(workflow: &Workflow, dir: &Path) -> Job {
    Job::chain(workflow.items().iter().enumerate().map(|(i, item)| {
        let job = Job::new(item.job_type);
        match output_file(dir, i, item) {
            Some(path) => job.with_output_file(path),
            None => job,
        }
    }))
    .unwrap()
}

/// Like [`completed_job`], but the job at `failing` reports an error
pub fn failed_job(workflow: &Workflow, dir: &Path, failing: usize) -> Job {
    Job::chain(workflow.items().iter().enumerate().map(|(i, item)| {
        let job = Job::new(item.job_type);
        if i == failing {
            job.with_status(JobStatus::Failed)
                .with_message(Severity::Error, format!("{} crashed", item.job_type))
        } else {
            job
        }
    }))
    .unwrap()
}

/// Write an attribute document into `dir` and return its path
pub fn write_attributes(dir: &Path, attributes: &serde_json::Value) -> PathBuf {
    let path = dir.join(ATTRIBUTES_FILE_NAME);
    fs::write(&path, serde_json::to_string_pretty(attributes).unwrap()).unwrap();
    path
}
