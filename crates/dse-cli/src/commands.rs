//! Subcommand implementations

use anyhow::{bail, Context, Result};
use dse_analysis::variant::{analysis_from_variant, problem_from_variant};
use dse_analysis::{
    AlgorithmProfile, AnalysisObject, InputVariable, Problem, UncertaintyType, ValueType, VariableValue, WorkflowOptions,
};
use dse_runmanager::Workflow;
use serde_json::{json, Value};
use std::path::Path;

const ALL_UNCERTAINTY_TYPES: [UncertaintyType; 18] = [
    UncertaintyType::Normal,
    UncertaintyType::Lognormal,
    UncertaintyType::Uniform,
    UncertaintyType::Loguniform,
    UncertaintyType::Triangular,
    UncertaintyType::Exponential,
    UncertaintyType::Beta,
    UncertaintyType::Gamma,
    UncertaintyType::Gumbel,
    UncertaintyType::Frechet,
    UncertaintyType::Weibull,
    UncertaintyType::HistogramBin,
    UncertaintyType::Poisson,
    UncertaintyType::Binomial,
    UncertaintyType::NegativeBinomial,
    UncertaintyType::Geometric,
    UncertaintyType::Hypergeometric,
    UncertaintyType::HistogramPoint,
];

/// Load a saved problem, or the problem of a saved analysis
pub(crate) fn load_problem(path: &Path) -> Result<Problem> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value: Value = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let problem = if value.get("problem").is_some() {
        analysis_from_variant(&value)
            .with_context(|| format!("loading analysis from {}", path.display()))?
            .problem()
    } else {
        problem_from_variant(&value).with_context(|| format!("loading problem from {}", path.display()))?
    };
    tracing::debug!("Loaded problem '{}' from {}", problem.name(), path.display());
    Ok(problem)
}

/// Algorithm the classification is reported for
pub(crate) fn algorithm(continuous_only: bool, sample_uncertain: bool) -> AlgorithmProfile {
    let profile = AlgorithmProfile::new("cli").with_requires_continuous_variables(continuous_only);
    if sample_uncertain {
        profile.with_compatible(ALL_UNCERTAINTY_TYPES)
    } else {
        profile
    }
}

fn describe_variable(variable: &InputVariable) -> Value {
    match variable {
        InputVariable::MeasureGroup(group) => json!({
            "name": group.name(),
            "kind": "discrete",
            "measures": group.num_measures(false),
            "selected_measures": group.num_measures(true),
        }),
        InputVariable::RubyContinuous(rcv) => json!({
            "name": rcv.name(),
            "kind": "continuous",
            "argument": rcv.argument().name(),
            "measure": rcv.ruby_measure().name(),
        }),
    }
}

/// Structure, sizes and algorithm classification of a problem
pub(crate) fn inspect(problem: &Problem, algorithm: &AlgorithmProfile) -> Value {
    let uncertain: serde_json::Map<String, Value> = problem
        .uncertain_variable_indices(algorithm)
        .into_iter()
        .map(|(t, indices)| (t.to_string(), json!(indices)))
        .collect();
    json!({
        "name": problem.name(),
        "uuid": problem.uuid(),
        "input_file_type": problem.input_file_type().map(|t| t.to_string()),
        "workflow_steps": problem.num_workflow_steps(),
        "static_transformations": problem.num_static_transformations(),
        "variables": problem.variables().iter().map(describe_variable).collect::<Vec<_>>(),
        "responses": problem.responses().iter().map(AnalysisObject::name).collect::<Vec<_>>(),
        "combinatorial_size": problem.combinatorial_size(true),
        "continuous_design_variables": problem.continuous_design_variable_indices(algorithm),
        "discrete_design_variables": problem.discrete_design_variable_indices(algorithm),
        "uncertain_variables": uncertain,
    })
}

/// Render an inspection report for humans
pub(crate) fn render_inspection(report: &Value) -> String {
    let mut out = String::new();
    let field = |key: &str| report[key].to_string();
    out.push_str(&format!("Problem: {}\n", report["name"].as_str().unwrap_or_default()));
    out.push_str(&format!("  Input file type: {}\n", field("input_file_type")));
    out.push_str(&format!("  Workflow steps: {}\n", field("workflow_steps")));
    out.push_str(&format!("  Static transformations: {}\n", field("static_transformations")));
    out.push_str("  Variables:\n");
    for (i, variable) in report["variables"].as_array().into_iter().flatten().enumerate() {
        out.push_str(&format!(
            "    [{i}] {} ({})\n",
            variable["name"].as_str().unwrap_or_default(),
            variable["kind"].as_str().unwrap_or_default()
        ));
    }
    out.push_str(&format!("  Combinatorial size: {}\n", field("combinatorial_size")));
    out.push_str(&format!(
        "  Continuous design variables: {}\n",
        field("continuous_design_variables")
    ));
    out.push_str(&format!("  Discrete design variables: {}\n", field("discrete_design_variables")));
    out.push_str(&format!("  Uncertain variables: {}\n", field("uncertain_variables")));
    out
}

/// Parse comma separated values, typed by the variable at each position
pub(crate) fn parse_values(problem: &Problem, raw: &str) -> Result<Vec<VariableValue>> {
    let variables = problem.variables();
    let parts: Vec<&str> = if raw.trim().is_empty() {
        Vec::new()
    } else {
        raw.split(',').map(str::trim).collect()
    };
    if parts.len() != variables.len() {
        bail!(
            "problem '{}' has {} variables, got {} values",
            problem.name(),
            variables.len(),
            parts.len()
        );
    }
    variables
        .iter()
        .zip(parts)
        .map(|(variable, part)| match variable.value_type() {
            ValueType::Integer => part
                .parse::<i64>()
                .map(VariableValue::Integer)
                .with_context(|| format!("'{part}' is not a measure index for '{}'", variable.name())),
            ValueType::Double => part
                .parse::<f64>()
                .map(VariableValue::Double)
                .with_context(|| format!("'{part}' is not a number for '{}'", variable.name())),
        })
        .collect()
}

/// Expand one data point of `problem` into its job workflow
pub(crate) fn expand(problem: &Problem, values: Vec<VariableValue>, options: &WorkflowOptions) -> Result<Workflow> {
    let Some(point) = problem.create_data_point_with_values(values) else {
        bail!("values are not valid for problem '{}'", problem.name());
    };
    problem
        .create_workflow(&point, options)
        .with_context(|| format!("expanding data point {}", point.uuid()))
}

/// Render a workflow for humans, one job per line
pub(crate) fn render_workflow(workflow: &Workflow) -> String {
    let mut out = String::new();
    for (i, item) in workflow.items().iter().enumerate() {
        out.push_str(&format!("{i:>3}  {}", item.job_type));
        for (key, value) in &item.params {
            out.push_str(&format!("  {key}={value}"));
        }
        out.push('\n');
    }
    for param in workflow.params() {
        out.push_str(&format!("  workflow param: {param}\n"));
    }
    out
}
