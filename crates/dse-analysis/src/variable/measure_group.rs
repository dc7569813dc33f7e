//! Discrete variables: an ordered menu of measures

use crate::error::AnalysisError;
use crate::measure::{Measure, NullMeasure};
use crate::object::{analysis_object_handle, AnalysisObject, ChangeType, ObjectBase, ParentLink, ParentObject};
use crate::options::WorkflowOptions;
use crate::uncertainty::UncertaintyDescription;
use crate::value::VariableValue;
use dse_runmanager::{FileType, WorkItem};
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct MeasureGroupData {
    pub(crate) base: ObjectBase,
    pub(crate) measures: Vec<Measure>,
    pub(crate) uncertainty: Option<UncertaintyDescription>,
}

/// A discrete variable whose value is an index into its measures
#[derive(Clone)]
pub struct MeasureGroup {
    pub(crate) inner: Arc<RwLock<MeasureGroupData>>,
}

analysis_object_handle!(MeasureGroup, clear_dirty_with = clear_dirty_tree);

/// File type footprint of one measure, used to vet candidate lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MeasureTypes {
    pub(crate) input: Option<FileType>,
    pub(crate) output: Option<FileType>,
    pub(crate) is_null: bool,
}

impl MeasureTypes {
    pub(crate) fn of(measure: &Measure) -> Self {
        Self {
            input: measure.input_file_type(),
            output: measure.output_file_type(),
            is_null: measure.is_null(),
        }
    }
}

/// Combined input/output types of a set of measures.
///
/// Every measure that declares a type must agree with the others, and a null
/// measure cannot sit next to a measure that changes the file type.
pub(crate) fn aggregate_file_types(
    types: &[MeasureTypes],
) -> Result<(Option<FileType>, Option<FileType>), String> {
    let mut input: Option<FileType> = None;
    let mut output: Option<FileType> = None;
    for t in types {
        if let Some(i) = t.input {
            match input {
                Some(prev) if prev != i => {
                    return Err(format!("measures disagree on input type ({prev} vs {i})"));
                }
                _ => input = Some(i),
            }
        }
        if let Some(o) = t.output {
            match output {
                Some(prev) if prev != o => {
                    return Err(format!("measures disagree on output type ({prev} vs {o})"));
                }
                _ => output = Some(o),
            }
        }
    }

    let has_null = types.iter().any(|t| t.is_null);
    let changes_type = types.iter().any(|t| !t.is_null && t.input != t.output);
    if has_null && changes_type {
        return Err("a null measure cannot share a group with a measure that changes file type".into());
    }
    Ok((input, output))
}

fn candidate_types(measures: &[Measure]) -> Vec<MeasureTypes> {
    measures.iter().map(MeasureTypes::of).collect()
}

/// Keep only the first selected null measure
fn dedupe_selected_nulls(measures: Vec<Measure>) -> Vec<Measure> {
    let mut seen_selected_null = false;
    measures
        .into_iter()
        .filter(|m| {
            if m.is_null() && m.is_selected() {
                if seen_selected_null {
                    tracing::debug!("Dropping duplicate selected null measure");
                    return false;
                }
                seen_selected_null = true;
            }
            true
        })
        .collect()
}

fn index_of(measures: &[Measure], measure: &Measure) -> Option<usize> {
    let uuid = measure.uuid();
    measures.iter().position(|m| m.uuid() == uuid)
}

impl MeasureGroup {
    /// Create a group. Extra selected null measures are dropped; measures
    /// with conflicting file types are an error.
    pub fn new(name: impl Into<String>, measures: Vec<Measure>) -> Result<Self, AnalysisError> {
        Self::from_parts(ObjectBase::new(name), measures, None)
    }

    pub(crate) fn from_parts(
        base: ObjectBase,
        measures: Vec<Measure>,
        uncertainty: Option<UncertaintyDescription>,
    ) -> Result<Self, AnalysisError> {
        let measures = dedupe_selected_nulls(measures);
        if let Err(reason) = aggregate_file_types(&candidate_types(&measures)) {
            return Err(AnalysisError::InconsistentMeasureGroup {
                group: base.name().to_string(),
                reason,
            });
        }
        let group = Self {
            inner: Arc::new(RwLock::new(MeasureGroupData {
                base,
                measures,
                uncertainty,
            })),
        };
        group.adopt_measures();
        Ok(group)
    }

    pub(crate) fn link(&self) -> ParentLink {
        ParentLink::MeasureGroup(Arc::downgrade(&self.inner))
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }

    /// Measures in order; `selected_only` filters to the active ones
    #[must_use]
    pub fn measures(&self, selected_only: bool) -> Vec<Measure> {
        self.inner
            .read()
            .measures
            .iter()
            .filter(|m| !selected_only || m.is_selected())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn num_measures(&self, selected_only: bool) -> usize {
        self.measures(selected_only).len()
    }

    #[must_use]
    pub fn measure(&self, index: usize) -> Option<Measure> {
        self.inner.read().measures.get(index).cloned()
    }

    /// Position of a measure, matched by uuid
    #[must_use]
    pub fn measure_index(&self, measure: &Measure) -> Option<usize> {
        index_of(&self.inner.read().measures, measure)
    }

    /// Values this variable can take; indices into the unfiltered list
    #[must_use]
    pub fn valid_values(&self, selected_only: bool) -> Vec<VariableValue> {
        self.inner
            .read()
            .measures
            .iter()
            .enumerate()
            .filter(|(_, m)| !selected_only || m.is_selected())
            .map(|(i, _)| VariableValue::from(i))
            .collect()
    }

    /// An integer index into the unfiltered measure list
    #[must_use]
    pub fn is_valid(&self, value: &VariableValue) -> bool {
        value.as_index().is_some_and(|i| i < self.num_measures(false))
    }

    /// Measure picked by a value
    #[must_use]
    pub fn measure_for(&self, value: &VariableValue) -> Option<Measure> {
        value.as_index().and_then(|i| self.measure(i))
    }

    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        self.file_types().0
    }

    #[must_use]
    pub fn output_file_type(&self) -> Option<FileType> {
        self.file_types().1
    }

    fn file_types(&self) -> (Option<FileType>, Option<FileType>) {
        let measures = self.measures(false);
        aggregate_file_types(&candidate_types(&measures)).unwrap_or((None, None))
    }

    /// Job specification for the measure a value picks
    pub fn create_work_item(
        &self,
        value: &VariableValue,
        options: &WorkflowOptions,
    ) -> Result<WorkItem, AnalysisError> {
        let measure = self.measure_for(value).ok_or_else(|| AnalysisError::InvalidValue {
            variable: self.name(),
            reason: format!("{value} is not a measure index"),
        })?;
        Ok(measure.create_work_item(options))
    }

    #[must_use]
    pub fn uncertainty_description(&self) -> Option<UncertaintyDescription> {
        self.inner.read().uncertainty.clone()
    }

    pub fn set_uncertainty_description(&self, description: Option<UncertaintyDescription>) {
        self.inner.write().uncertainty = description;
        self.on_change(ChangeType::InvalidatesResults);
    }

    /// Whether the group's types may become `input`/`output` where it is plugged in
    pub(crate) fn file_types_are_compatible(&self, input: Option<FileType>, output: Option<FileType>) -> bool {
        if (input, output) == self.file_types() {
            return true;
        }
        match self.parent() {
            Some(ParentObject::WorkflowStep(step)) => step.file_types_are_compatible(input, output),
            _ => true,
        }
    }

    /// Vet a candidate measure list against the group rules and the parent workflow
    fn accepts(&self, candidate: &[Measure]) -> bool {
        match aggregate_file_types(&candidate_types(candidate)) {
            Ok((input, output)) => {
                if self.file_types_are_compatible(input, output) {
                    true
                } else {
                    tracing::info!(
                        "Measure group '{}' would change to {:?} -> {:?}, which does not fit the workflow",
                        self.name(),
                        input,
                        output
                    );
                    false
                }
            }
            Err(reason) => {
                tracing::info!("Measure group '{}' rejected change: {}", self.name(), reason);
                false
            }
        }
    }

    /// A member measure wants to change its own file types
    pub(crate) fn measure_change_is_compatible(
        &self,
        measure: &Measure,
        input: Option<FileType>,
        output: Option<FileType>,
    ) -> bool {
        let types: Vec<MeasureTypes> = self
            .measures(false)
            .iter()
            .map(|m| {
                if m == measure {
                    MeasureTypes {
                        input,
                        output,
                        is_null: m.is_null(),
                    }
                } else {
                    MeasureTypes::of(m)
                }
            })
            .collect();
        match aggregate_file_types(&types) {
            Ok((gi, go)) => self.file_types_are_compatible(gi, go),
            Err(reason) => {
                tracing::info!("Measure in group '{}' cannot change types: {}", self.name(), reason);
                false
            }
        }
    }

    pub(crate) fn has_other_selected_null(&self, null: &NullMeasure) -> bool {
        self.inner
            .read()
            .measures
            .iter()
            .any(|m| matches!(m, Measure::Null(n) if n != null && n.is_selected()))
    }

    fn rejects_addition(&self, measure: &Measure) -> bool {
        if self.measure_index(measure).is_some() {
            tracing::info!("Measure '{}' is already in group '{}'", measure.name(), self.name());
            return true;
        }
        if let Measure::Null(null) = measure {
            if null.is_selected() && self.has_other_selected_null(null) {
                tracing::info!("Measure group '{}' already has a selected null measure", self.name());
                return true;
            }
        }
        false
    }

    fn commit(&self, measures: Vec<Measure>, kind: ChangeType) {
        let link = self.link();
        for m in &measures {
            m.set_parent(Some(link.clone()));
        }
        self.inner.write().measures = measures;
        self.on_change(kind);
    }

    pub fn push(&self, measure: impl Into<Measure>) -> bool {
        let measure = measure.into();
        if self.rejects_addition(&measure) {
            return false;
        }
        let mut candidate = self.measures(false);
        candidate.push(measure);
        if !self.accepts(&candidate) {
            return false;
        }
        self.commit(candidate, ChangeType::InvalidatesResults);
        true
    }

    /// Insert before `index`; `index == len` appends
    pub fn insert(&self, index: usize, measure: impl Into<Measure>) -> bool {
        let measure = measure.into();
        let mut candidate = self.measures(false);
        if index > candidate.len() {
            tracing::info!("Index {} out of range for measure group '{}'", index, self.name());
            return false;
        }
        if index == candidate.len() {
            return self.push(measure);
        }
        if self.rejects_addition(&measure) {
            return false;
        }
        candidate.insert(index, measure);
        if !self.accepts(&candidate) {
            return false;
        }
        self.commit(candidate, ChangeType::InvalidatesDataPoints);
        true
    }

    pub fn erase(&self, measure: &Measure) -> bool {
        let mut candidate = self.measures(false);
        let Some(index) = index_of(&candidate, measure) else {
            return false;
        };
        let removed = candidate.remove(index);
        if !self.accepts(&candidate) {
            return false;
        }
        removed.set_parent(None);
        self.commit(candidate, ChangeType::InvalidatesDataPoints);
        true
    }

    pub fn swap(&self, a: &Measure, b: &Measure) -> bool {
        let mut candidate = self.measures(false);
        let (Some(i), Some(j)) = (index_of(&candidate, a), index_of(&candidate, b)) else {
            return false;
        };
        candidate.swap(i, j);
        self.commit(candidate, ChangeType::InvalidatesDataPoints);
        true
    }

    /// Replace every measure. Extra selected null measures are dropped.
    pub fn set_measures(&self, measures: Vec<Measure>) -> bool {
        let candidate = dedupe_selected_nulls(measures);
        if !self.accepts(&candidate) {
            return false;
        }
        let old = self.measures(false);
        for m in old.iter().filter(|m| !candidate.contains(m)) {
            m.set_parent(None);
        }
        self.commit(candidate, ChangeType::InvalidatesDataPoints);
        true
    }

    pub fn clear_measures(&self) -> bool {
        self.set_measures(Vec::new())
    }

    /// Deep copy with the same identity, measures included
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let (base, measures, uncertainty) = {
            let guard = self.inner.read();
            (
                guard.base.duplicate(),
                guard.measures.iter().map(Measure::duplicate).collect(),
                guard.uncertainty.clone(),
            )
        };
        let group = Self {
            inner: Arc::new(RwLock::new(MeasureGroupData {
                base,
                measures,
                uncertainty,
            })),
        };
        group.adopt_measures();
        group
    }

    fn clear_dirty_tree(&self) -> bool {
        for m in self.measures(false) {
            m.clear_dirty_flag();
        }
        self.write_base(ObjectBase::mark_clean);
        true
    }

    fn adopt_measures(&self) {
        let link = self.link();
        for m in self.measures(false) {
            m.set_parent(Some(link.clone()));
        }
    }
}
