//! Continuous variables read back from simulation output

use crate::continuous::{ContinuousRange, ContinuousVariable};
use crate::data_point::DataPoint;
use crate::error::AnalysisError;
use crate::object::{analysis_object_handle, AnalysisObject, ChangeType, ObjectBase, ParentLink};
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct OutputAttributeVariableData {
    pub(crate) base: ObjectBase,
    pub(crate) range: ContinuousRange,
    pub(crate) attribute_name: String,
}

/// A named numeric attribute of a completed data point
#[derive(Clone)]
pub struct OutputAttributeVariable {
    pub(crate) inner: Arc<RwLock<OutputAttributeVariableData>>,
}

analysis_object_handle!(OutputAttributeVariable);

impl ContinuousVariable for OutputAttributeVariable {
    fn range(&self) -> ContinuousRange {
        self.inner.read().range
    }

    fn update_range(&self, kind: ChangeType, edit: impl FnOnce(&mut ContinuousRange) -> bool) -> bool {
        let changed = edit(&mut self.inner.write().range);
        if changed {
            self.on_change(kind);
        }
        changed
    }
}

impl OutputAttributeVariable {
    #[must_use]
    pub fn new(name: impl Into<String>, attribute_name: impl Into<String>) -> Self {
        Self::from_parts(ObjectBase::new(name), ContinuousRange::new(), attribute_name.into())
    }

    pub(crate) fn from_parts(base: ObjectBase, range: ContinuousRange, attribute_name: String) -> Self {
        Self {
            inner: Arc::new(RwLock::new(OutputAttributeVariableData {
                base,
                range,
                attribute_name,
            })),
        }
    }

    #[must_use]
    pub fn attribute_name(&self) -> String {
        self.inner.read().attribute_name.clone()
    }

    pub fn set_attribute_name(&self, attribute_name: impl Into<String>) {
        self.inner.write().attribute_name = attribute_name.into();
        self.on_change(ChangeType::InvalidatesResults);
    }

    /// Attribute value of a completed data point
    pub fn value(&self, data_point: &DataPoint) -> Result<f64, AnalysisError> {
        let name = self.attribute_name();
        data_point
            .output_attribute(&name)
            .ok_or(AnalysisError::MissingAttribute(name))
    }

    #[must_use]
    pub fn duplicate(&self) -> Self {
        let guard = self.inner.read();
        Self::from_parts(guard.base.duplicate(), guard.range, guard.attribute_name.clone())
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }
}
