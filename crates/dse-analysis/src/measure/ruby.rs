//! Script measures
//!
//! A [`RubyMeasure`] runs one script with a list of named arguments. The
//! script either comes from a catalog entry ([`BclMeasure`]), which fixes the
//! file types and supplies the default arguments, or is a free-standing file
//! with explicitly declared types.

use crate::object::{
    analysis_object_handle, notify_parent, AnalysisObject, ChangeType, ObjectBase, ParentLink, ParentObject,
};
use crate::options::WorkflowOptions;
use crate::variable::{RubyContinuousVariable, RubyContinuousVariableData};
use dse_bcl::{Argument, BclMeasure};
use dse_runmanager::{FileType, JobType, WorkItem};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// Work item parameter holding the script path
pub const SCRIPT_PARAM: &str = "script";
/// Work item parameter holding the Ruby include directory
pub const INCLUDE_DIR_PARAM: &str = "include_dir";
/// Prefix of work item parameters carrying argument values
pub const ARGUMENT_PARAM_PREFIX: &str = "argument.";
/// Work item parameter naming the catalog measure
pub const BCL_MEASURE_UUID_PARAM: &str = "bcl_measure_uuid";
/// Work item parameter naming the catalog measure version
pub const BCL_MEASURE_VERSION_PARAM: &str = "bcl_measure_version_uuid";
/// Work item flag for user scripts
pub const USER_SCRIPT_PARAM: &str = "user_script";

/// Where a script measure's script comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_type")]
pub enum ScriptSource {
    /// Catalog measure
    Bcl { measure: BclMeasure },
    /// Free-standing script file
    Script {
        path: PathBuf,
        input_file_type: Option<FileType>,
        output_file_type: Option<FileType>,
        is_user_script: bool,
    },
}

impl ScriptSource {
    fn file_types(&self) -> (Option<FileType>, Option<FileType>) {
        match self {
            ScriptSource::Bcl { measure } => (measure.input_file_type(), measure.output_file_type()),
            ScriptSource::Script {
                input_file_type,
                output_file_type,
                ..
            } => (*input_file_type, *output_file_type),
        }
    }
}

pub(crate) struct RubyMeasureData {
    pub(crate) base: ObjectBase,
    pub(crate) is_selected: bool,
    pub(crate) source: ScriptSource,
    pub(crate) arguments: Vec<Argument>,
    /// Every continuous variable currently holding this measure
    pub(crate) holders: Vec<Weak<RwLock<RubyContinuousVariableData>>>,
}

/// A measure that runs a script
#[derive(Clone)]
pub struct RubyMeasure {
    pub(crate) inner: Arc<RwLock<RubyMeasureData>>,
}

analysis_object_handle!(RubyMeasure, notify_with = notify_owners);

impl RubyMeasure {
    /// Wrap a catalog measure; its default arguments become the argument list
    #[must_use]
    pub fn from_bcl_measure(measure: BclMeasure, is_selected: bool) -> Self {
        let arguments = measure.arguments().to_vec();
        Self::from_data(RubyMeasureData {
            base: ObjectBase::new(measure.name()),
            is_selected,
            source: ScriptSource::Bcl { measure },
            arguments,
            holders: Vec::new(),
        })
    }

    /// Wrap a free-standing script with declared file types
    #[must_use]
    pub fn from_script(
        path: impl Into<PathBuf>,
        input_file_type: Option<FileType>,
        output_file_type: Option<FileType>,
        is_user_script: bool,
    ) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Ruby Measure")
            .to_string();
        Self::from_data(RubyMeasureData {
            base: ObjectBase::new(name),
            is_selected: true,
            source: ScriptSource::Script {
                path,
                input_file_type,
                output_file_type,
                is_user_script,
            },
            arguments: Vec::new(),
            holders: Vec::new(),
        })
    }

    pub(crate) fn from_data(data: RubyMeasureData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.inner.read().is_selected
    }

    pub fn set_is_selected(&self, is_selected: bool) -> bool {
        if self.is_selected() != is_selected {
            self.inner.write().is_selected = is_selected;
            self.on_change(ChangeType::InvalidatesResults);
        }
        true
    }

    #[must_use]
    pub fn source(&self) -> ScriptSource {
        self.inner.read().source.clone()
    }

    #[must_use]
    pub fn uses_bcl_measure(&self) -> bool {
        matches!(self.inner.read().source, ScriptSource::Bcl { .. })
    }

    #[must_use]
    pub fn bcl_measure(&self) -> Option<BclMeasure> {
        match &self.inner.read().source {
            ScriptSource::Bcl { measure } => Some(measure.clone()),
            ScriptSource::Script { .. } => None,
        }
    }

    #[must_use]
    pub fn bcl_measure_uuid(&self) -> Option<Uuid> {
        match &self.inner.read().source {
            ScriptSource::Bcl { measure } => Some(measure.uuid()),
            ScriptSource::Script { .. } => None,
        }
    }

    #[must_use]
    pub fn is_user_script(&self) -> bool {
        matches!(
            self.inner.read().source,
            ScriptSource::Script {
                is_user_script: true,
                ..
            }
        )
    }

    /// Script that will run, honouring a script name override for catalog measures
    #[must_use]
    pub fn script_path(&self, options: &WorkflowOptions) -> PathBuf {
        match &self.inner.read().source {
            ScriptSource::Bcl { measure } => match &options.script_name {
                Some(name) => measure.directory().join(name),
                None => measure.primary_script_path(),
            },
            ScriptSource::Script { path, .. } => path.clone(),
        }
    }

    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        self.inner.read().source.file_types().0
    }

    #[must_use]
    pub fn output_file_type(&self) -> Option<FileType> {
        self.inner.read().source.file_types().1
    }

    #[must_use]
    pub fn arguments(&self) -> Vec<Argument> {
        self.inner.read().arguments.clone()
    }

    #[must_use]
    pub fn argument(&self, name: &str) -> Option<Argument> {
        self.inner.read().arguments.iter().find(|a| a.name() == name).cloned()
    }

    /// Required arguments with neither a value nor a default
    #[must_use]
    pub fn incomplete_arguments(&self) -> Vec<Argument> {
        self.inner
            .read()
            .arguments
            .iter()
            .filter(|a| !a.is_complete())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn has_incomplete_arguments(&self) -> bool {
        !self.incomplete_arguments().is_empty()
    }

    /// Add an argument, replacing any argument with the same name
    pub fn add_argument(&self, argument: Argument) {
        {
            let mut guard = self.inner.write();
            upsert_argument(&mut guard.arguments, argument);
        }
        self.on_change(ChangeType::InvalidatesResults);
    }

    /// Replace an existing argument; false if no argument has that name
    pub fn set_argument(&self, argument: Argument) -> bool {
        {
            let mut guard = self.inner.write();
            let Some(slot) = guard.arguments.iter_mut().find(|a| a.name() == argument.name()) else {
                return false;
            };
            *slot = argument;
        }
        self.on_change(ChangeType::InvalidatesResults);
        true
    }

    pub fn set_arguments(&self, arguments: Vec<Argument>) {
        self.inner.write().arguments = arguments;
        self.on_change(ChangeType::InvalidatesResults);
    }

    pub fn remove_argument(&self, name: &str) -> bool {
        {
            let mut guard = self.inner.write();
            let before = guard.arguments.len();
            guard.arguments.retain(|a| a.name() != name);
            if guard.arguments.len() == before {
                return false;
            }
        }
        self.on_change(ChangeType::InvalidatesResults);
        true
    }

    pub fn clear_arguments(&self) {
        self.set_arguments(Vec::new());
    }

    /// Whether the measure may start declaring `input`/`output` where it is plugged in
    pub(crate) fn file_types_are_compatible(&self, input: Option<FileType>, output: Option<FileType>) -> bool {
        if (input, output) == (self.input_file_type(), self.output_file_type()) {
            return true;
        }
        match self.parent() {
            Some(ParentObject::MeasureGroup(group)) => {
                group.measure_change_is_compatible(&self.clone().into(), input, output)
            }
            _ => self
                .holders()
                .iter()
                .all(|variable| variable.measure_types_are_compatible(self, input, output)),
        }
    }

    /// Switch to another catalog measure, resetting arguments to its defaults
    pub fn set_bcl_measure(&self, measure: BclMeasure) -> bool {
        if !self.file_types_are_compatible(measure.input_file_type(), measure.output_file_type()) {
            tracing::info!(
                "Measure '{}' cannot be swapped for '{}': file types do not fit the workflow",
                self.name(),
                measure.name()
            );
            return false;
        }
        {
            let mut guard = self.inner.write();
            guard.arguments = measure.arguments().to_vec();
            guard.source = ScriptSource::Bcl { measure };
        }
        self.on_change(ChangeType::InvalidatesResults);
        true
    }

    /// Switch to a free-standing script, keeping arguments
    pub fn set_script(
        &self,
        path: impl Into<PathBuf>,
        input_file_type: Option<FileType>,
        output_file_type: Option<FileType>,
        is_user_script: bool,
    ) -> bool {
        if !self.file_types_are_compatible(input_file_type, output_file_type) {
            tracing::info!("Script for measure '{}' does not fit the workflow", self.name());
            return false;
        }
        self.inner.write().source = ScriptSource::Script {
            path: path.into(),
            input_file_type,
            output_file_type,
            is_user_script,
        };
        self.on_change(ChangeType::InvalidatesResults);
        true
    }

    /// Move to a new version of the catalog measure.
    ///
    /// The new argument schema wins; values set on old arguments of the same
    /// name are carried over when they still fit. Old arguments the new
    /// schema does not know are dropped.
    pub fn update_measure(&self, new_version: &BclMeasure, new_arguments: &[Argument]) -> bool {
        if !self.file_types_are_compatible(new_version.input_file_type(), new_version.output_file_type()) {
            tracing::info!(
                "Cannot update measure '{}': new version changes file types incompatibly",
                self.name()
            );
            return false;
        }

        let old_arguments = self.arguments();
        let mut merged = Vec::with_capacity(new_arguments.len());
        for new_arg in new_arguments {
            let mut arg = new_arg.clone();
            if let Some(value) = old_arguments
                .iter()
                .find(|old| old.name() == arg.name())
                .and_then(|old| old.value().cloned())
            {
                if let Err(e) = arg.set_value(value) {
                    tracing::warn!("Could not carry over value of argument '{}': {}", arg.name(), e);
                }
            }
            merged.push(arg);
        }
        for old in &old_arguments {
            if !new_arguments.iter().any(|a| a.name() == old.name()) {
                tracing::info!(
                    "Dropping argument '{}' of measure '{}': not in the new version",
                    old.name(),
                    self.name()
                );
            }
        }

        {
            let mut guard = self.inner.write();
            guard.source = ScriptSource::Bcl {
                measure: new_version.clone(),
            };
            guard.arguments = merged;
        }
        self.on_change(ChangeType::InvalidatesResults);
        true
    }

    /// Job specification for running this measure
    #[must_use]
    pub fn create_work_item(&self, options: &WorkflowOptions) -> WorkItem {
        let script = self.script_path(options);
        let guard = self.inner.read();
        let (input, output) = guard.source.file_types();

        if guard.arguments.iter().any(|a| !a.is_complete()) {
            tracing::warn!("Measure '{}' has required arguments without values", guard.base.name());
        }

        let mut item = WorkItem::new(JobType::Ruby)
            .with_file_types(input, output)
            .with_param(SCRIPT_PARAM, path_string(&script))
            .with_required_file(script);
        for arg in &guard.arguments {
            if let Some(value) = arg.value_as_string() {
                item = item.with_param(format!("{ARGUMENT_PARAM_PREFIX}{}", arg.name()), value);
            }
        }
        if let Some(dir) = &options.ruby_include_dir {
            item = item.with_param(INCLUDE_DIR_PARAM, path_string(dir));
        }
        match &guard.source {
            ScriptSource::Bcl { measure } => {
                item = item
                    .with_param(BCL_MEASURE_UUID_PARAM, measure.uuid().to_string())
                    .with_param(BCL_MEASURE_VERSION_PARAM, measure.version_uuid().to_string());
            }
            ScriptSource::Script { is_user_script, .. } => {
                if *is_user_script {
                    item = item.with_param(USER_SCRIPT_PARAM, "true");
                }
            }
        }
        item
    }

    /// Deep copy with the same identity, detached from its owner
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let guard = self.inner.read();
        Self::from_data(RubyMeasureData {
            base: guard.base.duplicate(),
            is_selected: guard.is_selected,
            source: guard.source.clone(),
            arguments: guard.arguments.clone(),
            holders: Vec::new(),
        })
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }

    /// Live continuous variables holding this measure
    pub(crate) fn holders(&self) -> Vec<RubyContinuousVariable> {
        let mut guard = self.inner.write();
        guard.holders.retain(|w| w.strong_count() > 0);
        guard
            .holders
            .iter()
            .filter_map(Weak::upgrade)
            .map(|inner| RubyContinuousVariable { inner })
            .collect()
    }

    pub(crate) fn attach_holder(&self, variable: &RubyContinuousVariable) {
        let target = Arc::as_ptr(&variable.inner);
        let mut guard = self.inner.write();
        guard.holders.retain(|w| w.strong_count() > 0 && w.as_ptr() != target);
        guard.holders.push(Arc::downgrade(&variable.inner));
        guard.base.parent = Some(variable.link());
    }

    /// Forget `variable`; the parent link moves to another holder if it pointed there
    pub(crate) fn detach_holder(&self, variable: &RubyContinuousVariable) {
        let target = Arc::as_ptr(&variable.inner);
        let mut guard = self.inner.write();
        guard.holders.retain(|w| w.strong_count() > 0 && w.as_ptr() != target);
        let points_at_variable = matches!(
            &guard.base.parent,
            Some(ParentLink::RubyContinuousVariable(w)) if w.as_ptr() == target
        );
        if points_at_variable {
            let next = guard.holders.first().cloned().map(ParentLink::RubyContinuousVariable);
            guard.base.parent = next;
        }
    }

    /// Changes reach every holder, so each problem using the measure sees them
    fn notify_owners(&self, parent: Option<ParentLink>, kind: ChangeType) {
        let holders = self.holders();
        if holders.is_empty() || matches!(parent, Some(ParentLink::MeasureGroup(_))) {
            notify_parent(parent, kind);
        } else if kind != ChangeType::Benign {
            for variable in holders {
                variable.on_change(kind);
            }
        }
    }
}

pub(crate) fn upsert_argument(arguments: &mut Vec<Argument>, argument: Argument) {
    match arguments.iter_mut().find(|a| a.name() == argument.name()) {
        Some(slot) => *slot = argument,
        None => arguments.push(argument),
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
