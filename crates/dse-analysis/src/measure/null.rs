//! The do-nothing measure

use crate::object::{analysis_object_handle, AnalysisObject, ChangeType, ObjectBase, ParentLink, ParentObject};
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct NullMeasureData {
    pub(crate) base: ObjectBase,
    pub(crate) is_selected: bool,
}

/// Leaves the model untouched; both file types are unconstrained
#[derive(Clone)]
pub struct NullMeasure {
    pub(crate) inner: Arc<RwLock<NullMeasureData>>,
}

analysis_object_handle!(NullMeasure);

impl NullMeasure {
    #[must_use]
    pub fn new(is_selected: bool) -> Self {
        Self::from_data(NullMeasureData {
            base: ObjectBase::new("Null Measure"),
            is_selected,
        })
    }

    pub(crate) fn from_data(data: NullMeasureData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.inner.read().is_selected
    }

    /// Select or deselect. Refused when selecting would give the containing
    /// group a second selected null measure.
    pub fn set_is_selected(&self, is_selected: bool) -> bool {
        if self.is_selected() == is_selected {
            return true;
        }
        if is_selected {
            if let Some(ParentObject::MeasureGroup(group)) = self.parent() {
                if group.has_other_selected_null(self) {
                    tracing::info!("Measure group '{}' already has a selected null measure", group.name());
                    return false;
                }
            }
        }
        self.inner.write().is_selected = is_selected;
        self.on_change(ChangeType::InvalidatesResults);
        true
    }

    /// Deep copy with the same identity, detached from any group
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let guard = self.inner.read();
        Self::from_data(NullMeasureData {
            base: guard.base.duplicate(),
            is_selected: guard.is_selected,
        })
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_dirty_and_selectable() {
        let m = NullMeasure::new(true);
        assert!(m.is_dirty());
        assert!(m.is_selected());
        assert!(m.clear_dirty_flag());
        assert!(!m.is_dirty());

        let version = m.version_uuid();
        assert!(m.set_is_selected(false));
        assert!(!m.is_selected());
        assert!(m.is_dirty());
        assert_ne!(m.version_uuid(), version);
    }

    #[test]
    fn test_duplicate_keeps_identity_but_not_state_sharing() {
        let m = NullMeasure::new(true);
        let copy = m.duplicate();
        assert!(copy.uuid_and_version_equal(&m));
        assert_ne!(copy, m);
        copy.set_is_selected(false);
        assert!(m.is_selected());
    }
}
