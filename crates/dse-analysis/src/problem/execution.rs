//! Turning data points into workflows and reading completed job trees back

use super::chain::{is_continuation, StepTypes};
use super::Problem;
use crate::data_point::DataPoint;
use crate::error::AnalysisError;
use crate::file_reference::FileReference;
use crate::measure::{Measure, RubyMeasure};
use crate::object::AnalysisObject;
use crate::options::WorkflowOptions;
use crate::value::VariableValue;
use crate::variable::InputVariable;
use crate::workflow_step::{StepPayload, WorkflowStep};
use dse_runmanager::{FileType, Job, JobType, Severity, Workflow, FLAT_OUTPUT_DIRECTORY_PARAM};

/// One workflow step paired with the job that ran it
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowStepJob {
    pub step: WorkflowStep,
    /// The job node, without its children. `None` when no job ran for the
    /// step (null measures, or the inner members of a compound chain).
    pub job: Option<Job>,
    /// Position among the node's merged jobs, when the engine merged steps
    pub merged_job_index: Option<usize>,
    /// Measure a discrete variable applied
    pub measure: Option<Measure>,
    /// Value a continuous variable took
    pub value: Option<VariableValue>,
}

impl WorkflowStepJob {
    fn new(step: &WorkflowStep) -> Self {
        Self {
            step: step.clone(),
            job: None,
            merged_job_index: None,
            measure: None,
            value: None,
        }
    }

    fn with_job(mut self, cursor: &JobCursor<'_>) -> Self {
        self.job = cursor.job.map(node_only);
        self.merged_job_index = cursor.merged_index();
        self
    }
}

fn node_only(job: &Job) -> Job {
    Job {
        uuid: job.uuid,
        job_type: job.job_type,
        status: job.status,
        errors: job.errors.clone(),
        output_files: job.output_files.clone(),
        merged_jobs: job.merged_jobs.clone(),
        children: Vec::new(),
    }
}

/// Position in a linear job tree, one logical job at a time
struct JobCursor<'a> {
    job: Option<&'a Job>,
    merged: usize,
}

impl<'a> JobCursor<'a> {
    fn new(root: &'a Job) -> Self {
        Self {
            job: Some(root),
            merged: 0,
        }
    }

    fn job_type(&self) -> Option<JobType> {
        self.job.and_then(|j| j.logical_job_types().get(self.merged).copied())
    }

    fn is_null(&self) -> bool {
        self.job_type().map_or(true, |t| t == JobType::Null)
    }

    fn merged_index(&self) -> Option<usize> {
        self.job.filter(|j| !j.merged_jobs.is_empty()).map(|_| self.merged)
    }

    fn advance(&mut self) -> Result<(), AnalysisError> {
        if let Some(job) = self.job {
            if self.merged + 1 < job.merged_jobs.len() {
                self.merged += 1;
            } else {
                self.job = job.single_child()?;
                self.merged = 0;
            }
        }
        Ok(())
    }
}

impl Problem {
    fn check_value_count(&self, values: &[VariableValue]) -> Result<(), AnalysisError> {
        let expected = self.num_variables();
        if values.len() == expected {
            Ok(())
        } else {
            Err(AnalysisError::ValueCountMismatch {
                expected,
                actual: values.len(),
            })
        }
    }

    /// The jobs to run for a data point, in order.
    ///
    /// Each variable step becomes the work item for its value. Adjacent
    /// continuous variables sharing one measure collapse into a single work
    /// item that runs a copy of the measure with all their arguments set.
    pub fn create_workflow(&self, data_point: &DataPoint, options: &WorkflowOptions) -> Result<Workflow, AnalysisError> {
        let values = data_point.values();
        self.check_value_count(&values)?;

        let steps = self.workflow();
        let types: Vec<StepTypes> = steps.iter().map(StepTypes::of_step).collect();
        let mut workflow = Workflow::new();
        let mut compound: Option<RubyMeasure> = None;
        let mut values = values.iter();

        for (i, step) in steps.iter().enumerate() {
            let variable = match step.payload() {
                StepPayload::WorkItem(item) => {
                    workflow.push(item);
                    continue;
                }
                StepPayload::InputVariable(variable) => variable,
            };
            let value = values.next().ok_or(AnalysisError::ValueCountMismatch {
                expected: self.num_variables(),
                actual: data_point.values().len(),
            })?;
            match &variable {
                InputVariable::RubyContinuous(rcv) => {
                    let number = value.as_f64().ok_or_else(|| AnalysisError::InvalidValue {
                        variable: rcv.name(),
                        reason: format!("{value} is not numeric"),
                    })?;
                    let measure = match compound.take() {
                        Some(measure) if is_continuation(&types, i) => measure,
                        _ => rcv.ruby_measure().duplicate(),
                    };
                    measure.add_argument(rcv.bound_argument(number)?);
                    if i + 1 < types.len() && is_continuation(&types, i + 1) {
                        compound = Some(measure);
                    } else {
                        workflow.push(measure.create_work_item(options));
                    }
                }
                InputVariable::MeasureGroup(_) => workflow.push(variable.create_work_item(value, options)?),
            }
        }

        if options.flat_output_directory {
            workflow.add_param(FLAT_OUTPUT_DIRECTORY_PARAM);
        }
        tracing::debug!(
            "Problem '{}' expanded into {} jobs for data point {}",
            self.name(),
            workflow.len(),
            data_point.uuid()
        );
        Ok(workflow)
    }

    /// Record a completed job tree on a data point.
    ///
    /// A failed tree marks the point failed and stops there. Otherwise the
    /// point is marked complete, the result files are attached where present
    /// and the response functions are evaluated. A response function that
    /// cannot be evaluated marks the point failed; nothing is returned as an
    /// error.
    pub fn update_data_point(&self, data_point: &DataPoint, completed_job: &Job) {
        data_point.set_top_level_job(completed_job.clone());

        let errors = completed_job.tree_errors();
        for message in errors.messages() {
            match message.severity {
                Severity::Error => tracing::error!("{}", message.message),
                Severity::Warning => tracing::warn!("{}", message.message),
                Severity::Info => tracing::info!("{}", message.message),
            }
        }
        if !completed_job.tree_status().is_success() || !errors.succeeded() {
            tracing::info!("Data point {} failed", data_point.uuid());
            data_point.mark_failed();
            return;
        }
        data_point.mark_complete();

        let files = completed_job.tree_all_files();
        if let Some(f) = files.last_by_extension(FileType::Osm.extension()) {
            data_point.set_osm_input_data(FileReference::with_type(f.path(), FileType::Osm));
        }
        if let Some(f) = files.last_by_extension(FileType::Idf.extension()) {
            data_point.set_idf_input_data(FileReference::with_type(f.path(), FileType::Idf));
        }
        if let Some(f) = files.last_by_extension(FileType::Sql.extension()) {
            data_point.set_sql_output_data(FileReference::with_type(f.path(), FileType::Sql));
        }
        let attribute_files = [FileType::Xml, FileType::Ossr, FileType::Json]
            .into_iter()
            .flat_map(|t| {
                files
                    .all_by_extension(t.extension())
                    .into_iter()
                    .map(move |f| FileReference::with_type(f.path(), t))
            })
            .collect();
        data_point.set_xml_output_data(attribute_files);

        // load now so later reads do not hit the disk
        let attributes = data_point.output_attributes();
        tracing::debug!("Data point {} has {} output attributes", data_point.uuid(), attributes.len());

        let values: Result<Vec<f64>, AnalysisError> = self.responses().iter().map(|f| f.value(data_point)).collect();
        match values {
            Ok(values) => data_point.set_response_values(values),
            Err(e) => {
                tracing::error!(
                    "Unable to evaluate response functions for data point {}: {}",
                    data_point.uuid(),
                    e
                );
                data_point.mark_failed();
            }
        }
    }

    /// Pair each workflow step with the job of the data point's tree that ran it.
    ///
    /// Null measures and the inner members of compound chains have no job of
    /// their own. With `optimize`, steps that resolved to nothing are left out.
    /// Points that have not run give an empty list.
    pub fn get_jobs_by_workflow_step(
        &self,
        data_point: &DataPoint,
        optimize: bool,
    ) -> Result<Vec<WorkflowStepJob>, AnalysisError> {
        let Some(root) = data_point.top_level_job() else {
            return Ok(Vec::new());
        };
        let values = data_point.values();
        self.check_value_count(&values)?;

        let steps = self.workflow();
        let types: Vec<StepTypes> = steps.iter().map(StepTypes::of_step).collect();
        let mut cursor = JobCursor::new(&root);
        let mut result = Vec::new();
        let mut values = values.into_iter();

        for (i, step) in steps.iter().enumerate() {
            let mismatch = |reason: String| AnalysisError::JobTreeMismatch { step: i, reason };
            let record = WorkflowStepJob::new(step);

            match step.payload() {
                StepPayload::InputVariable(variable) => {
                    let value = values.next().ok_or_else(|| mismatch("missing value".into()))?;
                    let chain_continues = i + 1 < types.len() && is_continuation(&types, i + 1);
                    match &variable {
                        InputVariable::RubyContinuous(_) if chain_continues => {
                            result.push(WorkflowStepJob {
                                value: Some(value),
                                ..record
                            });
                        }
                        InputVariable::RubyContinuous(rcv) => {
                            if cursor.is_null() {
                                return Err(mismatch(format!("no job ran for variable '{}'", rcv.name())));
                            }
                            result.push(WorkflowStepJob {
                                value: Some(value),
                                ..record.with_job(&cursor)
                            });
                            cursor.advance()?;
                        }
                        InputVariable::MeasureGroup(group) => {
                            let measure = group
                                .measure_for(&value)
                                .ok_or_else(|| mismatch(format!("{value} picks no measure of '{}'", group.name())))?;
                            let record = WorkflowStepJob {
                                measure: Some(measure.clone()),
                                ..record
                            };
                            if cursor.is_null() {
                                if !measure.is_null() {
                                    return Err(mismatch(format!(
                                        "measure '{}' was selected but no job ran",
                                        measure.name()
                                    )));
                                }
                                if !optimize {
                                    result.push(record.with_job(&cursor));
                                }
                                cursor.advance()?;
                            } else if measure.is_null() {
                                if !optimize {
                                    result.push(record);
                                }
                            } else {
                                result.push(record.with_job(&cursor));
                                cursor.advance()?;
                            }
                        }
                    }
                }
                StepPayload::WorkItem(item) if item.is_null() => {
                    let ran = cursor.job.is_some() && cursor.is_null();
                    if !optimize {
                        result.push(if ran { record.with_job(&cursor) } else { record });
                    }
                    if ran {
                        cursor.advance()?;
                    }
                }
                StepPayload::WorkItem(item) => match cursor.job_type() {
                    Some(t) if t == item.job_type => {
                        result.push(record.with_job(&cursor));
                        cursor.advance()?;
                    }
                    other => {
                        return Err(mismatch(format!(
                            "expected a {} job, found {}",
                            item.job_type,
                            other.map_or_else(|| "none".to_string(), |t| t.to_string())
                        )));
                    }
                },
            }
        }
        Ok(result)
    }
}
