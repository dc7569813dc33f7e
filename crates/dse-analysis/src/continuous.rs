//! Bounds and discretization shared by continuous variables

use crate::object::{AnalysisObject, ChangeType};
use serde::{Deserialize, Serialize};

const STEP_TOLERANCE: f64 = 1.0e-9;

/// Optional bounds plus an optional sampling step.
///
/// `increment` and `n_steps` are mutually exclusive: setting one clears the
/// other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ContinuousRange {
    minimum: Option<f64>,
    maximum: Option<f64>,
    increment: Option<f64>,
    n_steps: Option<u32>,
}

impl ContinuousRange {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bounded(minimum: f64, maximum: f64) -> Self {
        Self {
            minimum: Some(minimum),
            maximum: Some(maximum),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    #[must_use]
    pub fn maximum(&self) -> Option<f64> {
        self.maximum
    }

    #[must_use]
    pub fn increment(&self) -> Option<f64> {
        self.increment
    }

    #[must_use]
    pub fn n_steps(&self) -> Option<u32> {
        self.n_steps
    }

    pub fn set_minimum(&mut self, value: Option<f64>) {
        self.minimum = value;
    }

    pub fn set_maximum(&mut self, value: Option<f64>) {
        self.maximum = value;
    }

    /// Set a positive increment, clearing the step count
    pub fn set_increment(&mut self, increment: f64) -> bool {
        if !(increment > 0.0 && increment.is_finite()) {
            return false;
        }
        self.increment = Some(increment);
        self.n_steps = None;
        true
    }

    /// Set a positive step count, clearing the increment
    pub fn set_n_steps(&mut self, n_steps: u32) -> bool {
        if n_steps == 0 {
            return false;
        }
        self.n_steps = Some(n_steps);
        self.increment = None;
        true
    }

    pub fn clear_increment(&mut self) {
        self.increment = None;
    }

    pub fn clear_n_steps(&mut self) {
        self.n_steps = None;
    }

    /// Within `[minimum, maximum]`; an unset bound is open
    #[must_use]
    pub fn is_feasible(&self, value: f64) -> bool {
        self.minimum.map_or(true, |min| value >= min) && self.maximum.map_or(true, |max| value <= max)
    }

    /// Nearest usable value.
    ///
    /// A value below an inverted range `[10, 5]` violates both sides and maps
    /// to the midpoint of the two bounds; a value violating only one side of
    /// an inverted range has no feasible answer.
    #[must_use]
    pub fn truncate(&self, value: f64) -> Option<f64> {
        let low = self.minimum.filter(|&min| value < min);
        let high = self.maximum.filter(|&max| value > max);
        match (low, high) {
            (None, None) => Some(value),
            (Some(min), Some(max)) => Some((min + max) / 2.0),
            (Some(clamped), None) | (None, Some(clamped)) => {
                Some(clamped).filter(|&v| self.is_feasible(v))
            }
        }
    }

    /// Sample points from `minimum` to `maximum` inclusive
    #[must_use]
    pub fn incremental_values(&self) -> Vec<f64> {
        let (Some(min), Some(max)) = (self.minimum, self.maximum) else {
            return Vec::new();
        };
        if min > max {
            return Vec::new();
        }
        if (max - min).abs() <= f64::EPSILON * max.abs().max(1.0) {
            return vec![(min + max) / 2.0];
        }

        let step = match (self.increment, self.n_steps) {
            (Some(inc), _) => inc,
            (None, Some(n)) => (max - min) / f64::from(n),
            (None, None) => return Vec::new(),
        };

        let tolerance = STEP_TOLERANCE * step;
        let mut values = Vec::new();
        let mut k = 0_u32;
        loop {
            let v = min + f64::from(k) * step;
            if v > max + tolerance {
                break;
            }
            values.push(v.min(max));
            k += 1;
        }
        values
    }
}

/// Behaviour shared by variables that take a numeric value
pub trait ContinuousVariable: AnalysisObject {
    /// Snapshot of the bounds and step settings
    fn range(&self) -> ContinuousRange;

    /// Apply an edit to the range; `edit` reports whether anything changed
    #[doc(hidden)]
    fn update_range(&self, kind: ChangeType, edit: impl FnOnce(&mut ContinuousRange) -> bool) -> bool;

    fn minimum(&self) -> Option<f64> {
        self.range().minimum()
    }

    fn maximum(&self) -> Option<f64> {
        self.range().maximum()
    }

    fn increment(&self) -> Option<f64> {
        self.range().increment()
    }

    fn n_steps(&self) -> Option<u32> {
        self.range().n_steps()
    }

    fn set_minimum(&self, value: f64) {
        self.update_range(ChangeType::InvalidatesDataPoints, |r| {
            r.set_minimum(Some(value));
            true
        });
    }

    fn clear_minimum(&self) {
        self.update_range(ChangeType::InvalidatesDataPoints, |r| {
            r.set_minimum(None);
            true
        });
    }

    fn set_maximum(&self, value: f64) {
        self.update_range(ChangeType::InvalidatesDataPoints, |r| {
            r.set_maximum(Some(value));
            true
        });
    }

    fn clear_maximum(&self) {
        self.update_range(ChangeType::InvalidatesDataPoints, |r| {
            r.set_maximum(None);
            true
        });
    }

    fn set_increment(&self, increment: f64) -> bool {
        self.update_range(ChangeType::InvalidatesResults, |r| r.set_increment(increment))
    }

    fn clear_increment(&self) {
        self.update_range(ChangeType::InvalidatesResults, |r| {
            r.clear_increment();
            true
        });
    }

    fn set_n_steps(&self, n_steps: u32) -> bool {
        self.update_range(ChangeType::InvalidatesResults, |r| r.set_n_steps(n_steps))
    }

    fn clear_n_steps(&self) {
        self.update_range(ChangeType::InvalidatesResults, |r| {
            r.clear_n_steps();
            true
        });
    }

    fn is_feasible(&self, value: f64) -> bool {
        self.range().is_feasible(value)
    }

    fn truncate(&self, value: f64) -> Option<f64> {
        self.range().truncate(value)
    }

    fn incremental_values(&self) -> Vec<f64> {
        self.range().incremental_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_truncate() {
        let r = ContinuousRange::bounded(0.0, 10.0);
        assert_eq!(r.truncate(15.0), Some(10.0));
        assert_eq!(r.truncate(-5.0), Some(0.0));
        assert_eq!(r.truncate(5.0), Some(5.0));
    }

    #[test]
    fn test_truncate_inverted_range() {
        let r = ContinuousRange::bounded(10.0, 5.0);
        assert_eq!(r.truncate(7.0), Some(7.5));
        assert_eq!(r.truncate(12.0), None);
        assert_eq!(r.truncate(1.0), None);
    }

    #[test]
    fn test_open_bounds() {
        let mut r = ContinuousRange::new();
        r.set_minimum(Some(1.0));
        assert!(r.is_feasible(1.0e9));
        assert!(!r.is_feasible(0.5));
        assert_eq!(r.truncate(0.5), Some(1.0));
    }

    #[test]
    fn test_incremental_values_degenerate() {
        let mut r = ContinuousRange::bounded(5.0, 5.0);
        r.set_increment(1.0);
        assert_eq!(r.incremental_values(), vec![5.0]);

        let mut inverted = ContinuousRange::bounded(10.0, 5.0);
        inverted.set_increment(1.0);
        assert!(inverted.incremental_values().is_empty());
    }

    #[test]
    fn test_incremental_values_by_increment_and_steps() {
        let mut r = ContinuousRange::bounded(0.0, 1.0);
        r.set_increment(0.25);
        assert_eq!(r.incremental_values(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);

        r.set_n_steps(2);
        assert_eq!(r.incremental_values(), vec![0.0, 0.5, 1.0]);

        let mut uneven = ContinuousRange::bounded(0.0, 1.0);
        uneven.set_increment(0.4);
        assert_eq!(uneven.incremental_values(), vec![0.0, 0.4, 0.8]);
    }

    #[test]
    fn test_incremental_values_need_a_step() {
        assert!(ContinuousRange::bounded(0.0, 1.0).incremental_values().is_empty());
        assert!(ContinuousRange::new().incremental_values().is_empty());
    }

    #[test]
    fn test_rejects_non_positive_steps() {
        let mut r = ContinuousRange::bounded(0.0, 1.0);
        assert!(!r.set_increment(0.0));
        assert!(!r.set_increment(-1.0));
        assert!(!r.set_n_steps(0));
        assert_eq!(r.increment(), None);
    }

    proptest! {
        #[test]
        fn prop_increment_and_steps_are_exclusive(
            increment in 0.001f64..100.0,
            n_steps in 1u32..1000,
            increment_last in any::<bool>(),
        ) {
            let mut r = ContinuousRange::bounded(0.0, 1.0);
            if increment_last {
                r.set_n_steps(n_steps);
                r.set_increment(increment);
                prop_assert_eq!(r.n_steps(), None);
                prop_assert_eq!(r.increment(), Some(increment));
            } else {
                r.set_increment(increment);
                r.set_n_steps(n_steps);
                prop_assert_eq!(r.increment(), None);
                prop_assert_eq!(r.n_steps(), Some(n_steps));
            }
        }

        #[test]
        fn prop_truncate_lands_in_bounds(
            min in -100.0f64..100.0,
            width in 0.0f64..100.0,
            value in -500.0f64..500.0,
        ) {
            let r = ContinuousRange::bounded(min, min + width);
            let t = r.truncate(value).unwrap();
            prop_assert!(r.is_feasible(t));
        }
    }
}
