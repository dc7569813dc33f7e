//! Measures: the alternatives a discrete variable chooses between

mod null;
mod ruby;

pub use null::NullMeasure;
pub(crate) use null::NullMeasureData;
pub use ruby::{
    RubyMeasure, ScriptSource, ARGUMENT_PARAM_PREFIX, BCL_MEASURE_UUID_PARAM, BCL_MEASURE_VERSION_PARAM,
    INCLUDE_DIR_PARAM, SCRIPT_PARAM, USER_SCRIPT_PARAM,
};
pub(crate) use ruby::{upsert_argument, RubyMeasureData};

use crate::object::{analysis_object_enum, ParentLink};
use crate::options::WorkflowOptions;
use dse_runmanager::{FileType, WorkItem};

/// One concrete transformation, or the explicit choice of none
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Measure {
    Null(NullMeasure),
    Ruby(RubyMeasure),
}

analysis_object_enum!(Measure {
    Null(NullMeasure),
    Ruby(RubyMeasure),
});

impl Measure {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Measure::Null(_))
    }

    #[must_use]
    pub fn as_null(&self) -> Option<&NullMeasure> {
        match self {
            Measure::Null(m) => Some(m),
            Measure::Ruby(_) => None,
        }
    }

    #[must_use]
    pub fn as_ruby(&self) -> Option<&RubyMeasure> {
        match self {
            Measure::Ruby(m) => Some(m),
            Measure::Null(_) => None,
        }
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        match self {
            Measure::Null(m) => m.is_selected(),
            Measure::Ruby(m) => m.is_selected(),
        }
    }

    pub fn set_is_selected(&self, is_selected: bool) -> bool {
        match self {
            Measure::Null(m) => m.set_is_selected(is_selected),
            Measure::Ruby(m) => m.set_is_selected(is_selected),
        }
    }

    #[must_use]
    pub fn input_file_type(&self) -> Option<FileType> {
        match self {
            Measure::Null(_) => None,
            Measure::Ruby(m) => m.input_file_type(),
        }
    }

    #[must_use]
    pub fn output_file_type(&self) -> Option<FileType> {
        match self {
            Measure::Null(_) => None,
            Measure::Ruby(m) => m.output_file_type(),
        }
    }

    /// Job specification for applying this measure; a null measure yields a null job
    #[must_use]
    pub fn create_work_item(&self, options: &WorkflowOptions) -> WorkItem {
        match self {
            Measure::Null(_) => WorkItem::null(),
            Measure::Ruby(m) => m.create_work_item(options),
        }
    }

    /// Deep copy with the same identity
    #[must_use]
    pub fn duplicate(&self) -> Self {
        match self {
            Measure::Null(m) => Measure::Null(m.duplicate()),
            Measure::Ruby(m) => Measure::Ruby(m.duplicate()),
        }
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        match self {
            Measure::Null(m) => m.set_parent(parent),
            Measure::Ruby(m) => m.set_parent(parent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::AnalysisObject;
    use dse_runmanager::JobType;

    #[test]
    fn test_null_measure_is_a_wildcard() {
        let m: Measure = NullMeasure::new(true).into();
        assert!(m.is_null());
        assert_eq!(m.input_file_type(), None);
        assert_eq!(m.output_file_type(), None);
        assert_eq!(m.create_work_item(&WorkflowOptions::new()).job_type, JobType::Null);
    }

    #[test]
    fn test_identity_equality() {
        let ruby = RubyMeasure::from_script("a.rb", Some(FileType::Idf), Some(FileType::Idf), false);
        let a: Measure = ruby.clone().into();
        let b: Measure = ruby.into();
        assert_eq!(a, b);
        let copy = a.duplicate();
        assert_ne!(copy, a);
        assert!(copy.uuid_equal(&a));
    }
}
