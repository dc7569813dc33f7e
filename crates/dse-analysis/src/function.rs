//! Response functions evaluated on completed data points

use crate::data_point::DataPoint;
use crate::error::AnalysisError;
use crate::object::{analysis_object_handle, AnalysisObject, ChangeType, ObjectBase, ParentLink};
use crate::variable::OutputAttributeVariable;
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) struct FunctionData {
    pub(crate) base: ObjectBase,
    pub(crate) variables: Vec<OutputAttributeVariable>,
    pub(crate) coefficients: Vec<f64>,
}

/// Weighted sum of output attributes.
///
/// An empty coefficient list weights every variable by 1.
#[derive(Clone)]
pub struct LinearFunction {
    pub(crate) inner: Arc<RwLock<FunctionData>>,
}

analysis_object_handle!(LinearFunction, clear_dirty_with = clear_dirty_tree);

impl LinearFunction {
    #[must_use]
    pub fn new(name: impl Into<String>, variables: Vec<OutputAttributeVariable>, coefficients: Vec<f64>) -> Self {
        Self::from_parts(ObjectBase::new(name), variables, coefficients)
    }

    pub(crate) fn from_parts(base: ObjectBase, variables: Vec<OutputAttributeVariable>, coefficients: Vec<f64>) -> Self {
        let function = Self {
            inner: Arc::new(RwLock::new(FunctionData {
                base,
                variables,
                coefficients,
            })),
        };
        let link = function.link();
        for v in function.variables() {
            v.set_parent(Some(link.clone()));
        }
        function
    }

    pub(crate) fn link(&self) -> ParentLink {
        ParentLink::Function(Arc::downgrade(&self.inner))
    }

    pub(crate) fn set_parent(&self, parent: Option<ParentLink>) {
        self.inner.write().base.parent = parent;
    }

    #[must_use]
    pub fn variables(&self) -> Vec<OutputAttributeVariable> {
        self.inner.read().variables.clone()
    }

    #[must_use]
    pub fn coefficients(&self) -> Vec<f64> {
        self.inner.read().coefficients.clone()
    }

    pub fn push_variable(&self, variable: OutputAttributeVariable, coefficient: Option<f64>) {
        variable.set_parent(Some(self.link()));
        {
            let mut guard = self.inner.write();
            guard.variables.push(variable);
            if let Some(c) = coefficient {
                guard.coefficients.push(c);
            }
        }
        self.on_change(ChangeType::InvalidatesResults);
    }

    pub fn set_coefficients(&self, coefficients: Vec<f64>) {
        self.inner.write().coefficients = coefficients;
        self.on_change(ChangeType::InvalidatesResults);
    }

    /// Evaluate against a completed data point
    pub fn value(&self, data_point: &DataPoint) -> Result<f64, AnalysisError> {
        let (variables, coefficients) = {
            let guard = self.inner.read();
            (guard.variables.clone(), guard.coefficients.clone())
        };
        if !coefficients.is_empty() && coefficients.len() != variables.len() {
            return Err(AnalysisError::FunctionEvaluation {
                function: self.name(),
                reason: format!(
                    "{} coefficients for {} variables",
                    coefficients.len(),
                    variables.len()
                ),
            });
        }
        let mut total = 0.0;
        for (i, variable) in variables.iter().enumerate() {
            let weight = coefficients.get(i).copied().unwrap_or(1.0);
            total += weight * variable.value(data_point)?;
        }
        Ok(total)
    }

    #[must_use]
    pub fn duplicate(&self) -> Self {
        let (base, variables, coefficients) = {
            let guard = self.inner.read();
            (
                guard.base.duplicate(),
                guard.variables.iter().map(OutputAttributeVariable::duplicate).collect(),
                guard.coefficients.clone(),
            )
        };
        Self::from_parts(base, variables, coefficients)
    }

    fn clear_dirty_tree(&self) -> bool {
        for v in self.variables() {
            v.clear_dirty_flag();
        }
        self.write_base(ObjectBase::mark_clean);
        true
    }
}
