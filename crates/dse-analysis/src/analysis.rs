//! The analysis container: a problem, its seed model and the data points run against it

use crate::data_point::DataPoint;
use crate::error::AnalysisError;
use crate::file_reference::FileReference;
use crate::measure::Measure;
use crate::object::{notify_parent, sealed, AnalysisObject, ChangeType, ObjectBase, ParentLink};
use crate::problem::Problem;
use crate::value::VariableValue;
use dse_runmanager::{FileType, Job};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) struct AnalysisData {
    pub(crate) base: ObjectBase,
    pub(crate) problem: Problem,
    pub(crate) seed: FileReference,
    pub(crate) weather_file: Option<FileReference>,
    pub(crate) data_points: Vec<DataPoint>,
    pub(crate) results_are_invalid: bool,
    pub(crate) data_points_are_invalid: bool,
}

/// A problem bound to a seed model, plus the data points evaluated so far.
///
/// Changes inside the problem flow up here and flag existing data points or
/// results as stale. The flags only clear when the stale state is removed.
#[derive(Clone)]
pub struct Analysis {
    pub(crate) inner: Arc<RwLock<AnalysisData>>,
}

impl sealed::Sealed for Analysis {}

impl PartialEq for Analysis {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Analysis {}

impl fmt::Debug for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.read();
        f.debug_struct("Analysis")
            .field("uuid", &guard.base.uuid())
            .field("name", &guard.base.name())
            .field("data_points", &guard.data_points.len())
            .finish_non_exhaustive()
    }
}

impl AnalysisObject for Analysis {
    fn read_base<R>(&self, f: impl FnOnce(&ObjectBase) -> R) -> R {
        f(&self.inner.read().base)
    }

    fn write_base<R>(&self, f: impl FnOnce(&mut ObjectBase) -> R) -> R {
        f(&mut self.inner.write().base)
    }

    fn on_change(&self, kind: ChangeType) {
        let (parent, points) = {
            let mut guard = self.inner.write();
            (guard.base.touch(), guard.data_points.clone())
        };
        let any_complete = points.iter().any(DataPoint::is_complete);
        {
            let mut guard = self.inner.write();
            match kind {
                ChangeType::InvalidatesResults if any_complete => guard.results_are_invalid = true,
                ChangeType::InvalidatesDataPoints if !points.is_empty() => {
                    guard.results_are_invalid = true;
                    guard.data_points_are_invalid = true;
                }
                _ => {}
            }
        }
        notify_parent(parent, kind);
    }

    /// Refused while data points or results are flagged invalid
    fn clear_dirty_flag(&self) -> bool {
        let (results, points) = {
            let guard = self.inner.read();
            (guard.results_are_invalid, guard.data_points_are_invalid)
        };
        if points {
            tracing::info!("Cannot clear dirty flag: data points are invalid, remove them first");
            return false;
        }
        if results {
            tracing::info!("Cannot clear dirty flag: results are invalid, clear them first");
            return false;
        }
        self.problem().clear_dirty_flag();
        self.write_base(ObjectBase::mark_clean);
        true
    }
}

fn seed_fits(problem: &Problem, seed: FileType) -> bool {
    problem.input_file_type().map_or(true, |input| input == seed)
}

impl Analysis {
    /// Bind a problem to a seed model. The seed type must match the problem's
    /// first declared input type.
    pub fn new(name: impl Into<String>, problem: Problem, seed: FileReference) -> Result<Self, AnalysisError> {
        if let Some(input) = problem.input_file_type() {
            if input != seed.file_type() {
                return Err(AnalysisError::IncompatibleSeed {
                    seed: seed.file_type(),
                    input,
                });
            }
        }
        Ok(Self::from_parts(ObjectBase::new(name), problem, seed, None, Vec::new()))
    }

    pub(crate) fn from_parts(
        base: ObjectBase,
        problem: Problem,
        seed: FileReference,
        weather_file: Option<FileReference>,
        data_points: Vec<DataPoint>,
    ) -> Self {
        let analysis = Self {
            inner: Arc::new(RwLock::new(AnalysisData {
                base,
                problem: problem.clone(),
                seed,
                weather_file,
                data_points: data_points.clone(),
                results_are_invalid: false,
                data_points_are_invalid: false,
            })),
        };
        problem.set_parent(Some(analysis.link()));
        for dp in &data_points {
            dp.set_parent(Some(analysis.link()));
        }
        analysis
    }

    fn link(&self) -> ParentLink {
        ParentLink::Analysis(Arc::downgrade(&self.inner))
    }

    /// Notification from the problem (or anything below it)
    pub(crate) fn on_child_change(&self, kind: ChangeType) {
        self.on_change(kind);
    }

    #[must_use]
    pub fn problem(&self) -> Problem {
        self.inner.read().problem.clone()
    }

    #[must_use]
    pub fn seed(&self) -> FileReference {
        self.inner.read().seed.clone()
    }

    #[must_use]
    pub fn weather_file(&self) -> Option<FileReference> {
        self.inner.read().weather_file.clone()
    }

    #[must_use]
    pub fn results_are_invalid(&self) -> bool {
        self.inner.read().results_are_invalid
    }

    #[must_use]
    pub fn data_points_are_invalid(&self) -> bool {
        self.inner.read().data_points_are_invalid
    }

    /// Replace the problem; refused when its input type does not fit the seed
    pub fn set_problem(&self, problem: Problem) -> bool {
        let seed = self.seed();
        if !seed_fits(&problem, seed.file_type()) {
            tracing::error!(
                "Cannot set problem '{}': its input type does not match the {} seed",
                problem.name(),
                seed.file_type()
            );
            return false;
        }
        let old = std::mem::replace(&mut self.inner.write().problem, problem.clone());
        old.set_parent(None);
        problem.set_parent(Some(self.link()));
        self.on_change(ChangeType::InvalidatesDataPoints);
        true
    }

    /// Replace the seed; refused when its type does not fit the problem
    pub fn set_seed(&self, seed: FileReference) -> bool {
        if !seed_fits(&self.problem(), seed.file_type()) {
            tracing::info!(
                "Seed {} does not match the problem's input type",
                seed.path().display()
            );
            return false;
        }
        self.inner.write().seed = seed;
        self.on_change(ChangeType::InvalidatesResults);
        true
    }

    /// Weather files must be EPW
    pub fn set_weather_file(&self, file: FileReference) -> bool {
        if file.file_type() != FileType::Epw {
            tracing::info!("{} is not a weather file", file.path().display());
            return false;
        }
        self.inner.write().weather_file = Some(file);
        self.on_change(ChangeType::InvalidatesResults);
        true
    }

    pub fn clear_weather_file(&self) {
        self.inner.write().weather_file = None;
        self.on_change(ChangeType::InvalidatesResults);
    }

    #[must_use]
    pub fn data_points(&self) -> Vec<DataPoint> {
        self.inner.read().data_points.clone()
    }

    /// Selected points that have not run yet
    #[must_use]
    pub fn data_points_to_queue(&self) -> Vec<DataPoint> {
        self.filter_points(|dp| dp.is_selected() && !dp.is_complete())
    }

    #[must_use]
    pub fn complete_data_points(&self) -> Vec<DataPoint> {
        self.filter_points(DataPoint::is_complete)
    }

    #[must_use]
    pub fn successful_data_points(&self) -> Vec<DataPoint> {
        self.filter_points(|dp| dp.is_complete() && !dp.is_failed())
    }

    #[must_use]
    pub fn failed_data_points(&self) -> Vec<DataPoint> {
        self.filter_points(DataPoint::is_failed)
    }

    #[must_use]
    pub fn data_points_with_tag(&self, tag: &str) -> Vec<DataPoint> {
        self.filter_points(|dp| dp.is_tagged(tag))
    }

    /// Points whose values match `values` (nulls act as wildcards)
    #[must_use]
    pub fn data_points_matching(&self, values: &[VariableValue]) -> Vec<DataPoint> {
        self.filter_points(|dp| dp.matches(values))
    }

    #[must_use]
    pub fn data_point_by_uuid(&self, uuid: Uuid) -> Option<DataPoint> {
        self.data_points().into_iter().find(|dp| dp.uuid() == uuid)
    }

    fn filter_points(&self, keep: impl Fn(&DataPoint) -> bool) -> Vec<DataPoint> {
        self.data_points().into_iter().filter(|dp| keep(dp)).collect()
    }

    /// Add a point of this analysis's problem. Refused while existing points
    /// are invalid, or when a point with the same values already exists.
    pub fn add_data_point(&self, data_point: DataPoint) -> bool {
        if self.data_points_are_invalid() {
            tracing::info!("Current data points are invalid; remove them before adding new ones");
            return false;
        }
        let problem = self.problem();
        if data_point.problem_uuid() != problem.uuid() {
            tracing::error!(
                "Data point does not belong to problem '{}' of analysis '{}'",
                problem.name(),
                self.name()
            );
            return false;
        }
        if !self.data_points_matching(&data_point.values()).is_empty() {
            tracing::info!("Data point not added to analysis '{}': it already exists", self.name());
            return false;
        }
        data_point.set_parent(Some(self.link()));
        self.inner.write().data_points.push(data_point);
        self.on_change(ChangeType::Benign);
        true
    }

    /// Add the point that selects `measures` (`None` for continuous positions)
    pub fn add_data_point_with_measures(&self, measures: &[Option<Measure>]) -> bool {
        let problem = self.problem();
        match problem.create_data_point_with_measures(measures) {
            Some(dp) => self.add_data_point(dp),
            None => {
                tracing::error!("Measures are not valid for problem '{}'", problem.name());
                false
            }
        }
    }

    pub fn remove_data_point(&self, data_point: &DataPoint) -> bool {
        let uuid = data_point.uuid();
        let removed = {
            let mut guard = self.inner.write();
            let Some(index) = guard.data_points.iter().position(|dp| dp.uuid() == uuid) else {
                return false;
            };
            let removed = guard.data_points.remove(index);
            if guard.data_points.is_empty() {
                guard.results_are_invalid = false;
                guard.data_points_are_invalid = false;
            }
            removed
        };
        removed.set_parent(None);
        self.on_change(ChangeType::Benign);
        true
    }

    pub fn remove_all_data_points(&self) {
        let removed = {
            let mut guard = self.inner.write();
            guard.results_are_invalid = false;
            guard.data_points_are_invalid = false;
            std::mem::take(&mut guard.data_points)
        };
        for dp in &removed {
            dp.set_parent(None);
        }
        self.on_change(ChangeType::Benign);
    }

    /// Clear one point's results
    pub fn clear_results(&self, data_point: &DataPoint) -> bool {
        let Some(mine) = self.data_point_by_uuid(data_point.uuid()) else {
            return false;
        };
        mine.clear_results();
        if self.complete_data_points().is_empty() {
            self.inner.write().results_are_invalid = false;
        }
        self.on_change(ChangeType::Benign);
        true
    }

    pub fn clear_all_results(&self) {
        for dp in self.data_points() {
            dp.clear_results();
        }
        self.inner.write().results_are_invalid = false;
        self.on_change(ChangeType::Benign);
    }

    /// Record a finished job tree on one of this analysis's points
    pub fn update_data_point(&self, data_point: &DataPoint, completed_job: &Job) -> Result<(), AnalysisError> {
        let mine = self
            .data_point_by_uuid(data_point.uuid())
            .ok_or(AnalysisError::UnknownDataPoint(data_point.uuid()))?;
        self.problem().update_data_point(&mine, completed_job);
        self.on_change(ChangeType::Benign);
        Ok(())
    }
}
