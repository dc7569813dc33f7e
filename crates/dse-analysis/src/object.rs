//! Identity, versioning and parent links shared by every analysis object
//!
//! Each public object type is a cheap handle (`Arc<RwLock<..>>`) over shared
//! state. Cloning a handle aliases the same object; `duplicate` methods make
//! deep copies. Every object carries an [`ObjectBase`]:
//! - a stable `uuid` and a `version_uuid` that changes on every mutation
//! - a dirty flag, set on construction and on every change
//! - an optional weak link to the container it is plugged into
//!
//! Mutations report a [`ChangeType`]. Anything other than
//! [`ChangeType::Benign`] is forwarded to the parent, so an owning problem or
//! analysis sees the invalidation.

use crate::analysis::{Analysis, AnalysisData};
use crate::function::{FunctionData, LinearFunction};
use crate::problem::{Problem, ProblemData};
use crate::variable::{
    MeasureGroup, MeasureGroupData, RubyContinuousVariable, RubyContinuousVariableData,
};
use crate::workflow_step::{WorkflowStep, WorkflowStepData};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// How much a mutation invalidates downstream state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Only the object itself changed (names, descriptions)
    Benign,
    /// Existing results may be stale
    InvalidatesResults,
    /// Existing data points may no longer fit the problem
    InvalidatesDataPoints,
}

/// Identity and bookkeeping shared by all analysis objects
#[derive(Debug, Clone)]
pub struct ObjectBase {
    uuid: Uuid,
    version_uuid: Uuid,
    name: String,
    display_name: String,
    description: String,
    dirty: bool,
    pub(crate) parent: Option<ParentLink>,
}

impl ObjectBase {
    /// Fresh object: new identifiers, dirty
    pub(crate) fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uuid: Uuid::new_v4(),
            version_uuid: Uuid::new_v4(),
            display_name: name.clone(),
            name,
            description: String::new(),
            dirty: true,
            parent: None,
        }
    }

    /// Deserialized object: known identifiers, clean
    pub(crate) fn restored(
        uuid: Uuid,
        version_uuid: Uuid,
        name: String,
        display_name: String,
        description: String,
    ) -> Self {
        Self {
            uuid,
            version_uuid,
            name,
            display_name,
            description,
            dirty: false,
            parent: None,
        }
    }

    /// Deep copy keeping identity; the copy is detached and dirty
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            dirty: true,
            parent: None,
            ..self.clone()
        }
    }

    /// Record a mutation, returning the parent to notify
    pub(crate) fn touch(&mut self) -> Option<ParentLink> {
        self.version_uuid = Uuid::new_v4();
        self.dirty = true;
        self.parent.clone()
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    #[must_use]
    pub fn version_uuid(&self) -> Uuid {
        self.version_uuid
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// Weak back-reference from an object to its container
#[derive(Clone)]
pub(crate) enum ParentLink {
    Analysis(Weak<RwLock<AnalysisData>>),
    Problem(Weak<RwLock<ProblemData>>),
    WorkflowStep(Weak<RwLock<WorkflowStepData>>),
    MeasureGroup(Weak<RwLock<MeasureGroupData>>),
    RubyContinuousVariable(Weak<RwLock<RubyContinuousVariableData>>),
    Function(Weak<RwLock<FunctionData>>),
}

impl ParentLink {
    pub(crate) fn upgrade(&self) -> Option<ParentObject> {
        match self {
            ParentLink::Analysis(w) => w.upgrade().map(|inner| ParentObject::Analysis(Analysis { inner })),
            ParentLink::Problem(w) => w.upgrade().map(|inner| ParentObject::Problem(Problem { inner })),
            ParentLink::WorkflowStep(w) => w
                .upgrade()
                .map(|inner| ParentObject::WorkflowStep(WorkflowStep { inner })),
            ParentLink::MeasureGroup(w) => w
                .upgrade()
                .map(|inner| ParentObject::MeasureGroup(MeasureGroup { inner })),
            ParentLink::RubyContinuousVariable(w) => w
                .upgrade()
                .map(|inner| ParentObject::RubyContinuousVariable(RubyContinuousVariable { inner })),
            ParentLink::Function(w) => w
                .upgrade()
                .map(|inner| ParentObject::Function(LinearFunction { inner })),
        }
    }
}

impl fmt::Debug for ParentLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ParentLink::Analysis(_) => "Analysis",
            ParentLink::Problem(_) => "Problem",
            ParentLink::WorkflowStep(_) => "WorkflowStep",
            ParentLink::MeasureGroup(_) => "MeasureGroup",
            ParentLink::RubyContinuousVariable(_) => "RubyContinuousVariable",
            ParentLink::Function(_) => "Function",
        };
        write!(f, "ParentLink({kind})")
    }
}

/// The container an object is plugged into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentObject {
    Analysis(Analysis),
    Problem(Problem),
    WorkflowStep(WorkflowStep),
    MeasureGroup(MeasureGroup),
    RubyContinuousVariable(RubyContinuousVariable),
    Function(LinearFunction),
}

impl ParentObject {
    fn on_child_change(&self, kind: ChangeType) {
        match self {
            ParentObject::Analysis(a) => a.on_child_change(kind),
            ParentObject::Problem(p) => p.on_change(kind),
            ParentObject::WorkflowStep(s) => s.on_change(kind),
            ParentObject::MeasureGroup(g) => g.on_change(kind),
            ParentObject::RubyContinuousVariable(v) => v.on_change(kind),
            ParentObject::Function(f) => f.on_change(kind),
        }
    }
}

/// Forward a change notification to the parent, if it matters upstream
pub(crate) fn notify_parent(parent: Option<ParentLink>, kind: ChangeType) {
    if kind == ChangeType::Benign {
        return;
    }
    if let Some(parent) = parent.and_then(|p| p.upgrade()) {
        parent.on_child_change(kind);
    }
}

pub(crate) mod sealed {
    #[allow(unreachable_pub)]
    pub trait Sealed {}
}

/// Common behaviour of every analysis object handle
pub trait AnalysisObject: sealed::Sealed {
    #[doc(hidden)]
    fn read_base<R>(&self, f: impl FnOnce(&ObjectBase) -> R) -> R;

    #[doc(hidden)]
    fn write_base<R>(&self, f: impl FnOnce(&mut ObjectBase) -> R) -> R;

    /// Bump the version, mark dirty and notify the parent
    #[doc(hidden)]
    fn on_change(&self, kind: ChangeType);

    fn uuid(&self) -> Uuid {
        self.read_base(ObjectBase::uuid)
    }

    fn version_uuid(&self) -> Uuid {
        self.read_base(ObjectBase::version_uuid)
    }

    fn name(&self) -> String {
        self.read_base(|b| b.name.clone())
    }

    fn display_name(&self) -> String {
        self.read_base(|b| b.display_name.clone())
    }

    fn description(&self) -> String {
        self.read_base(|b| b.description.clone())
    }

    fn is_dirty(&self) -> bool {
        self.read_base(ObjectBase::is_dirty)
    }

    fn set_name(&self, name: &str) {
        self.write_base(|b| b.name = name.to_string());
        self.on_change(ChangeType::Benign);
    }

    fn set_display_name(&self, display_name: &str) {
        self.write_base(|b| b.display_name = display_name.to_string());
        self.on_change(ChangeType::Benign);
    }

    fn set_description(&self, description: &str) {
        self.write_base(|b| b.description = description.to_string());
        self.on_change(ChangeType::Benign);
    }

    /// Mark the object (and what it owns) as persisted
    fn clear_dirty_flag(&self) -> bool {
        self.write_base(ObjectBase::mark_clean);
        true
    }

    /// The container this object is plugged into, if it is still alive
    fn parent(&self) -> Option<ParentObject> {
        self.read_base(|b| b.parent.clone()).and_then(|p| p.upgrade())
    }

    fn uuid_equal(&self, other: &impl AnalysisObject) -> bool {
        self.uuid() == other.uuid()
    }

    fn uuid_and_version_equal(&self, other: &impl AnalysisObject) -> bool {
        self.uuid() == other.uuid() && self.version_uuid() == other.version_uuid()
    }
}

/// Implements [`AnalysisObject`], identity equality and `Debug` for a handle
/// whose `inner` state has a `base: ObjectBase` field.
macro_rules! analysis_object_handle {
    ($handle:ident) => {
        $crate::object::analysis_object_handle!(@common $handle);

        impl $crate::object::AnalysisObject for $handle {
            fn read_base<R>(&self, f: impl FnOnce(&$crate::object::ObjectBase) -> R) -> R {
                f(&self.inner.read().base)
            }

            fn write_base<R>(&self, f: impl FnOnce(&mut $crate::object::ObjectBase) -> R) -> R {
                f(&mut self.inner.write().base)
            }

            fn on_change(&self, kind: $crate::object::ChangeType) {
                let parent = self.inner.write().base.touch();
                $crate::object::notify_parent(parent, kind);
            }
        }
    };
    ($handle:ident, clear_dirty_with = $clear:ident) => {
        $crate::object::analysis_object_handle!(@common $handle);

        impl $crate::object::AnalysisObject for $handle {
            fn read_base<R>(&self, f: impl FnOnce(&$crate::object::ObjectBase) -> R) -> R {
                f(&self.inner.read().base)
            }

            fn write_base<R>(&self, f: impl FnOnce(&mut $crate::object::ObjectBase) -> R) -> R {
                f(&mut self.inner.write().base)
            }

            fn on_change(&self, kind: $crate::object::ChangeType) {
                let parent = self.inner.write().base.touch();
                $crate::object::notify_parent(parent, kind);
            }

            fn clear_dirty_flag(&self) -> bool {
                self.$clear()
            }
        }
    };
    ($handle:ident, notify_with = $notify:ident) => {
        $crate::object::analysis_object_handle!(@common $handle);

        impl $crate::object::AnalysisObject for $handle {
            fn read_base<R>(&self, f: impl FnOnce(&$crate::object::ObjectBase) -> R) -> R {
                f(&self.inner.read().base)
            }

            fn write_base<R>(&self, f: impl FnOnce(&mut $crate::object::ObjectBase) -> R) -> R {
                f(&mut self.inner.write().base)
            }

            fn on_change(&self, kind: $crate::object::ChangeType) {
                let parent = self.inner.write().base.touch();
                self.$notify(parent, kind);
            }
        }
    };
    (@common $handle:ident) => {
        impl $crate::object::sealed::Sealed for $handle {}

        impl PartialEq for $handle {
            fn eq(&self, other: &Self) -> bool {
                std::sync::Arc::ptr_eq(&self.inner, &other.inner)
            }
        }

        impl Eq for $handle {}

        impl std::fmt::Debug for $handle {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let guard = self.inner.read();
                f.debug_struct(stringify!($handle))
                    .field("uuid", &guard.base.uuid())
                    .field("name", &guard.base.name())
                    .finish_non_exhaustive()
            }
        }
    };
}

pub(crate) use analysis_object_handle;

/// Implements [`AnalysisObject`] and `From` conversions for a closed sum of
/// handles by delegating to whichever variant is present.
macro_rules! analysis_object_enum {
    ($name:ident { $($variant:ident($handle:ident)),+ $(,)? }) => {
        impl $crate::object::sealed::Sealed for $name {}

        impl $crate::object::AnalysisObject for $name {
            fn read_base<R>(&self, f: impl FnOnce(&$crate::object::ObjectBase) -> R) -> R {
                match self {
                    $($name::$variant(h) => $crate::object::AnalysisObject::read_base(h, f),)+
                }
            }

            fn write_base<R>(&self, f: impl FnOnce(&mut $crate::object::ObjectBase) -> R) -> R {
                match self {
                    $($name::$variant(h) => $crate::object::AnalysisObject::write_base(h, f),)+
                }
            }

            fn on_change(&self, kind: $crate::object::ChangeType) {
                match self {
                    $($name::$variant(h) => $crate::object::AnalysisObject::on_change(h, kind),)+
                }
            }

            fn clear_dirty_flag(&self) -> bool {
                match self {
                    $($name::$variant(h) => $crate::object::AnalysisObject::clear_dirty_flag(h),)+
                }
            }
        }

        $(
            impl From<$handle> for $name {
                fn from(handle: $handle) -> Self {
                    $name::$variant(handle)
                }
            }
        )+
    };
}

pub(crate) use analysis_object_enum;
