//! Conversion of analysis objects to and from generic JSON values
//!
//! Every object becomes a JSON object carrying its identity fields plus a
//! type tag (`measure_type`, `variable_type`, `workflow_step_type`,
//! `function_type`, `problem_type`). Restored objects keep their uuids and
//! start out clean. Continuous variables that shared one measure when saved
//! share it again after loading.

use crate::analysis::Analysis;
use crate::continuous::{ContinuousRange, ContinuousVariable};
use crate::data_point::{DataPoint, DataPointData};
use crate::error::AnalysisError;
use crate::file_reference::FileReference;
use crate::function::LinearFunction;
use crate::measure::{Measure, NullMeasure, NullMeasureData, RubyMeasure, RubyMeasureData, ScriptSource};
use crate::object::{AnalysisObject, ObjectBase};
use crate::problem::Problem;
use crate::uncertainty::UncertaintyDescription;
use crate::value::VariableValue;
use crate::variable::{InputVariable, MeasureGroup, OutputAttributeVariable, RubyContinuousVariable, Variable};
use crate::workflow_step::{StepPayload, WorkflowStep};
use dse_bcl::Argument;
use dse_runmanager::{Job, WorkItem};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use uuid::Uuid;

pub const MEASURE_TYPE: &str = "measure_type";
pub const VARIABLE_TYPE: &str = "variable_type";
pub const WORKFLOW_STEP_TYPE: &str = "workflow_step_type";
pub const FUNCTION_TYPE: &str = "function_type";
pub const PROBLEM_TYPE: &str = "problem_type";

/// Conversion to a tagged JSON value
pub trait ToVariant {
    fn to_variant(&self) -> Value;
}

fn base_fields(object: &impl AnalysisObject) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("uuid".into(), json!(object.uuid()));
    map.insert("version_uuid".into(), json!(object.version_uuid()));
    map.insert("name".into(), json!(object.name()));
    map.insert("display_name".into(), json!(object.display_name()));
    map.insert("description".into(), json!(object.description()));
    map
}

fn base_variant(object: &impl AnalysisObject, tag: (&str, &str)) -> Map<String, Value> {
    let mut map = base_fields(object);
    map.insert(tag.0.to_string(), Value::from(tag.1));
    map
}

fn to_json(value: impl serde::Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl ToVariant for Measure {
    fn to_variant(&self) -> Value {
        match self {
            Measure::Null(m) => {
                let mut map = base_variant(m, (MEASURE_TYPE, "NullMeasure"));
                map.insert("is_selected".into(), json!(m.is_selected()));
                Value::Object(map)
            }
            Measure::Ruby(m) => m.to_variant(),
        }
    }
}

impl ToVariant for RubyMeasure {
    fn to_variant(&self) -> Value {
        let mut map = base_variant(self, (MEASURE_TYPE, "RubyMeasure"));
        map.insert("is_selected".into(), json!(self.is_selected()));
        map.insert("source".into(), to_json(self.source()));
        map.insert("arguments".into(), to_json(self.arguments()));
        Value::Object(map)
    }
}

impl ToVariant for Variable {
    fn to_variant(&self) -> Value {
        match self {
            Variable::MeasureGroup(g) => {
                let mut map = base_variant(g, (VARIABLE_TYPE, "MeasureGroup"));
                let measures: Vec<Value> = g.measures(false).iter().map(ToVariant::to_variant).collect();
                map.insert("measures".into(), Value::Array(measures));
                map.insert("uncertainty".into(), to_json(g.uncertainty_description()));
                Value::Object(map)
            }
            Variable::RubyContinuous(v) => {
                let mut map = base_variant(v, (VARIABLE_TYPE, "RubyContinuousVariable"));
                map.insert("range".into(), to_json(v.range()));
                map.insert("argument".into(), to_json(v.argument()));
                map.insert("measure".into(), v.ruby_measure().to_variant());
                map.insert("uncertainty".into(), to_json(v.uncertainty_description()));
                Value::Object(map)
            }
            Variable::OutputAttribute(v) => {
                let mut map = base_variant(v, (VARIABLE_TYPE, "OutputAttributeVariable"));
                map.insert("range".into(), to_json(v.range()));
                map.insert("attribute_name".into(), json!(v.attribute_name()));
                Value::Object(map)
            }
        }
    }
}

impl ToVariant for InputVariable {
    fn to_variant(&self) -> Value {
        Variable::from(self.clone()).to_variant()
    }
}

impl ToVariant for WorkflowStep {
    fn to_variant(&self) -> Value {
        match self.payload() {
            StepPayload::InputVariable(v) => {
                let mut map = base_variant(self, (WORKFLOW_STEP_TYPE, "InputVariable"));
                map.insert("input_variable".into(), v.to_variant());
                Value::Object(map)
            }
            StepPayload::WorkItem(item) => {
                let mut map = base_variant(self, (WORKFLOW_STEP_TYPE, "WorkItem"));
                map.insert("work_item".into(), to_json(item));
                Value::Object(map)
            }
        }
    }
}

impl ToVariant for LinearFunction {
    fn to_variant(&self) -> Value {
        let mut map = base_variant(self, (FUNCTION_TYPE, "LinearFunction"));
        let variables: Vec<Value> = self
            .variables()
            .into_iter()
            .map(|v| Variable::OutputAttribute(v).to_variant())
            .collect();
        map.insert("variables".into(), Value::Array(variables));
        map.insert("coefficients".into(), json!(self.coefficients()));
        Value::Object(map)
    }
}

impl ToVariant for Problem {
    fn to_variant(&self) -> Value {
        let mut map = base_variant(self, (PROBLEM_TYPE, "Problem"));
        let workflow: Vec<Value> = self.workflow().iter().map(ToVariant::to_variant).collect();
        let responses: Vec<Value> = self.responses().iter().map(ToVariant::to_variant).collect();
        map.insert("workflow".into(), Value::Array(workflow));
        map.insert("responses".into(), Value::Array(responses));
        Value::Object(map)
    }
}

impl ToVariant for DataPoint {
    fn to_variant(&self) -> Value {
        let mut map = base_fields(self);
        map.insert("problem_uuid".into(), json!(self.problem_uuid()));
        let guard = self.inner.read();
        map.insert("values".into(), to_json(&guard.values));
        map.insert("selected".into(), json!(guard.selected));
        map.insert("complete".into(), json!(guard.complete));
        map.insert("failed".into(), json!(guard.failed));
        map.insert("directory".into(), to_json(&guard.directory));
        map.insert("top_level_job".into(), to_json(&guard.top_level_job));
        map.insert("osm_input_data".into(), to_json(&guard.osm_input_data));
        map.insert("idf_input_data".into(), to_json(&guard.idf_input_data));
        map.insert("sql_output_data".into(), to_json(&guard.sql_output_data));
        map.insert("xml_output_data".into(), to_json(&guard.xml_output_data));
        map.insert("response_values".into(), to_json(&guard.response_values));
        map.insert("tags".into(), to_json(&guard.tags));
        Value::Object(map)
    }
}

impl ToVariant for Analysis {
    fn to_variant(&self) -> Value {
        let mut map = base_fields(self);
        map.insert("problem".into(), self.problem().to_variant());
        map.insert("seed".into(), to_json(self.seed()));
        map.insert("weather_file".into(), to_json(self.weather_file()));
        let points: Vec<Value> = self.data_points().iter().map(ToVariant::to_variant).collect();
        map.insert("data_points".into(), Value::Array(points));
        map.insert("results_are_invalid".into(), json!(self.results_are_invalid()));
        map.insert("data_points_are_invalid".into(), json!(self.data_points_are_invalid()));
        Value::Object(map)
    }
}

// Reading

fn field<T: DeserializeOwned>(value: &Value, key: &str) -> Result<T, AnalysisError> {
    Ok(serde_json::from_value(value.get(key).cloned().unwrap_or(Value::Null))?)
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value.get(key).and_then(Value::as_array).map_or(&[], Vec::as_slice)
}

fn tag<'a>(value: &'a Value, key: &'static str) -> Result<&'a str, AnalysisError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| AnalysisError::UnknownDiscriminator {
            field: key,
            value: "<missing>".into(),
        })
}

fn unknown(field: &'static str, value: &str) -> AnalysisError {
    AnalysisError::UnknownDiscriminator {
        field,
        value: value.to_string(),
    }
}

fn restore_base(value: &Value) -> Result<ObjectBase, AnalysisError> {
    let name: String = field(value, "name")?;
    let display_name: Option<String> = field(value, "display_name")?;
    let description: Option<String> = field(value, "description")?;
    Ok(ObjectBase::restored(
        field(value, "uuid")?,
        field(value, "version_uuid")?,
        name.clone(),
        display_name.unwrap_or(name),
        description.unwrap_or_default(),
    ))
}

/// Rebuilds object graphs; remembers script measures so shared ones stay shared
#[derive(Default)]
struct Restorer {
    ruby_measures: HashMap<(Uuid, Uuid), RubyMeasure>,
}

impl Restorer {
    fn measure(&mut self, value: &Value) -> Result<Measure, AnalysisError> {
        match tag(value, MEASURE_TYPE)? {
            "NullMeasure" => Ok(Measure::Null(NullMeasure::from_data(NullMeasureData {
                base: restore_base(value)?,
                is_selected: field::<Option<bool>>(value, "is_selected")?.unwrap_or(true),
            }))),
            "RubyMeasure" => Ok(Measure::Ruby(self.ruby_measure(value)?)),
            other => Err(unknown(MEASURE_TYPE, other)),
        }
    }

    fn ruby_measure(&mut self, value: &Value) -> Result<RubyMeasure, AnalysisError> {
        let base = restore_base(value)?;
        let key = (base.uuid(), base.version_uuid());
        if let Some(existing) = self.ruby_measures.get(&key) {
            return Ok(existing.clone());
        }
        let source: ScriptSource = field(value, "source")?;
        let arguments: Option<Vec<Argument>> = field(value, "arguments")?;
        let measure = RubyMeasure::from_data(RubyMeasureData {
            base,
            is_selected: field::<Option<bool>>(value, "is_selected")?.unwrap_or(true),
            source,
            arguments: arguments.unwrap_or_default(),
            holders: Vec::new(),
        });
        self.ruby_measures.insert(key, measure.clone());
        Ok(measure)
    }

    fn variable(&mut self, value: &Value) -> Result<Variable, AnalysisError> {
        let uncertainty = || field::<Option<UncertaintyDescription>>(value, "uncertainty");
        let range = || field::<Option<ContinuousRange>>(value, "range").map(Option::unwrap_or_default);
        match tag(value, VARIABLE_TYPE)? {
            "MeasureGroup" => {
                let measures = array(value, "measures")
                    .iter()
                    .map(|m| self.measure(m))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Variable::MeasureGroup(MeasureGroup::from_parts(
                    restore_base(value)?,
                    measures,
                    uncertainty()?,
                )?))
            }
            "RubyContinuousVariable" => {
                let measure_value = value.get("measure").unwrap_or(&Value::Null);
                let measure = self.ruby_measure(measure_value)?;
                Ok(Variable::RubyContinuous(RubyContinuousVariable::from_parts(
                    restore_base(value)?,
                    range()?,
                    field(value, "argument")?,
                    measure,
                    uncertainty()?,
                )))
            }
            "OutputAttributeVariable" => Ok(Variable::OutputAttribute(OutputAttributeVariable::from_parts(
                restore_base(value)?,
                range()?,
                field(value, "attribute_name")?,
            ))),
            other => Err(unknown(VARIABLE_TYPE, other)),
        }
    }

    fn input_variable(&mut self, value: &Value) -> Result<InputVariable, AnalysisError> {
        let variable = self.variable(value)?;
        variable
            .as_input_variable()
            .ok_or_else(|| unknown(VARIABLE_TYPE, "OutputAttributeVariable"))
    }

    fn output_variable(&mut self, value: &Value) -> Result<OutputAttributeVariable, AnalysisError> {
        match self.variable(value)? {
            Variable::OutputAttribute(v) => Ok(v),
            _ => Err(unknown(VARIABLE_TYPE, tag(value, VARIABLE_TYPE)?)),
        }
    }

    fn workflow_step(&mut self, value: &Value) -> Result<WorkflowStep, AnalysisError> {
        let payload = match tag(value, WORKFLOW_STEP_TYPE)? {
            "InputVariable" => {
                let variable = value.get("input_variable").unwrap_or(&Value::Null);
                StepPayload::InputVariable(self.input_variable(variable)?)
            }
            "WorkItem" => StepPayload::WorkItem(field::<WorkItem>(value, "work_item")?),
            other => return Err(unknown(WORKFLOW_STEP_TYPE, other)),
        };
        Ok(WorkflowStep::from_parts(restore_base(value)?, payload))
    }

    fn function(&mut self, value: &Value) -> Result<LinearFunction, AnalysisError> {
        match tag(value, FUNCTION_TYPE)? {
            "LinearFunction" => {
                let variables = array(value, "variables")
                    .iter()
                    .map(|v| self.output_variable(v))
                    .collect::<Result<Vec<_>, _>>()?;
                let coefficients: Option<Vec<f64>> = field(value, "coefficients")?;
                Ok(LinearFunction::from_parts(
                    restore_base(value)?,
                    variables,
                    coefficients.unwrap_or_default(),
                ))
            }
            other => Err(unknown(FUNCTION_TYPE, other)),
        }
    }

    fn problem(&mut self, value: &Value) -> Result<Problem, AnalysisError> {
        match tag(value, PROBLEM_TYPE)? {
            "Problem" => {
                let workflow = array(value, "workflow")
                    .iter()
                    .map(|s| self.workflow_step(s))
                    .collect::<Result<Vec<_>, _>>()?;
                let responses = array(value, "responses")
                    .iter()
                    .map(|f| self.function(f))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Problem::from_parts(restore_base(value)?, workflow, responses))
            }
            other => Err(unknown(PROBLEM_TYPE, other)),
        }
    }
}

fn data_point(value: &Value, problem: &Problem) -> Result<DataPoint, AnalysisError> {
    let problem_uuid: Uuid = field(value, "problem_uuid")?;
    if problem_uuid != problem.uuid() {
        return Err(AnalysisError::UnknownDataPoint(field(value, "uuid")?));
    }
    Ok(DataPoint::from_data(DataPointData {
        base: restore_base(value)?,
        problem: problem.clone(),
        values: field::<Vec<VariableValue>>(value, "values")?,
        selected: field::<Option<bool>>(value, "selected")?.unwrap_or(true),
        complete: field::<Option<bool>>(value, "complete")?.unwrap_or(false),
        failed: field::<Option<bool>>(value, "failed")?.unwrap_or(false),
        directory: field::<Option<PathBuf>>(value, "directory")?,
        top_level_job: field::<Option<Job>>(value, "top_level_job")?,
        osm_input_data: field::<Option<FileReference>>(value, "osm_input_data")?,
        idf_input_data: field::<Option<FileReference>>(value, "idf_input_data")?,
        sql_output_data: field::<Option<FileReference>>(value, "sql_output_data")?,
        xml_output_data: field::<Option<Vec<FileReference>>>(value, "xml_output_data")?.unwrap_or_default(),
        response_values: field::<Option<Vec<f64>>>(value, "response_values")?.unwrap_or_default(),
        tags: field::<Option<BTreeSet<String>>>(value, "tags")?.unwrap_or_default(),
        output_attributes: OnceCell::new(),
    }))
}

/// Rebuild a measure
pub fn measure_from_variant(value: &Value) -> Result<Measure, AnalysisError> {
    Restorer::default().measure(value)
}

/// Rebuild any variable
pub fn variable_from_variant(value: &Value) -> Result<Variable, AnalysisError> {
    Restorer::default().variable(value)
}

/// Rebuild a workflow step and its payload
pub fn workflow_step_from_variant(value: &Value) -> Result<WorkflowStep, AnalysisError> {
    Restorer::default().workflow_step(value)
}

/// Rebuild a response function
pub fn function_from_variant(value: &Value) -> Result<LinearFunction, AnalysisError> {
    Restorer::default().function(value)
}

/// Rebuild a problem with its workflow and responses
pub fn problem_from_variant(value: &Value) -> Result<Problem, AnalysisError> {
    Restorer::default().problem(value)
}

/// Rebuild an analysis with its problem and data points
pub fn analysis_from_variant(value: &Value) -> Result<Analysis, AnalysisError> {
    let problem = problem_from_variant(value.get("problem").unwrap_or(&Value::Null))?;
    let data_points = array(value, "data_points")
        .iter()
        .map(|dp| data_point(dp, &problem))
        .collect::<Result<Vec<_>, _>>()?;
    let analysis = Analysis::from_parts(
        restore_base(value)?,
        problem,
        field(value, "seed")?,
        field(value, "weather_file")?,
        data_points,
    );
    {
        let mut guard = analysis.inner.write();
        guard.results_are_invalid = field::<Option<bool>>(value, "results_are_invalid")?.unwrap_or(false);
        guard.data_points_are_invalid = field::<Option<bool>>(value, "data_points_are_invalid")?.unwrap_or(false);
    }
    Ok(analysis)
}
