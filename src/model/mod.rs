//! Trainable-model capability interface.
//!
//! The compression core never looks inside a model. It only needs a model to
//! produce a gradient from a local batch, accept parameters, apply a sign
//! step and report loss/accuracy. Each concrete architecture implements
//! [`TrainableModel`]; [`LogisticRegression`] is a small reference one.

pub mod logistic;

pub use logistic::{Batch, LogisticRegression};

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::compression::{check_shapes, CompressedUpdate, Gradient};
use crate::error::SignFlError;

/// Evaluation metrics reported by a model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean loss over the batch
    pub loss: f32,
    /// Fraction of correctly classified samples
    pub accuracy: f32,
}

/// A model that can take part in federated training.
pub trait TrainableModel {
    /// Local data the model trains and evaluates on.
    type Batch;

    /// Current parameters, one tensor per trainable parameter, in stable order.
    fn params(&self) -> Vec<ArrayD<f32>>;

    /// Replace all parameters.
    ///
    /// # Errors
    ///
    /// Shape errors if `params` does not match the model's layout.
    fn set_params(&mut self, params: &[ArrayD<f32>]) -> Result<(), SignFlError>;

    /// Gradient of the loss on `batch`, in the same order as [`params`](Self::params).
    fn compute_gradient(&mut self, batch: &Self::Batch) -> Result<Gradient, SignFlError>;

    /// Loss and accuracy on `batch`.
    fn evaluate(&self, batch: &Self::Batch) -> Result<Metrics, SignFlError>;

    /// Descend along a sign update: `param -= step_size * sign`.
    fn apply_update(
        &mut self,
        update: &CompressedUpdate,
        step_size: f32,
    ) -> Result<(), SignFlError> {
        let mut params = self.params();
        check_shapes(
            params.iter().map(|p| p.shape()),
            update.tensors().iter().map(|t| t.shape()),
            params.len(),
            update.len(),
        )?;
        for (param, signs) in params.iter_mut().zip(update.tensors()) {
            param.zip_mut_with(signs, |p, &s| *p -= step_size * f32::from(s));
        }
        self.set_params(&params)
    }
}
