//! Holder of the canonical model.

use ndarray::ArrayD;

use super::Client;
use crate::compression::CompressedUpdate;
use crate::config::{validate_step_size, SignSgdConfig};
use crate::error::SignFlError;
use crate::model::{Metrics, TrainableModel};

/// Server side of the federation: owns the canonical parameters, applies
/// consensus updates and pushes parameters to clients.
pub struct ServerModel<M: TrainableModel> {
    model: M,
    step_size: f32,
}

impl<M: TrainableModel> ServerModel<M> {
    /// Wrap `model` with a fixed step size.
    ///
    /// # Errors
    ///
    /// [`SignFlError::InvalidConfiguration`] unless `step_size` is positive and finite.
    pub fn new(model: M, step_size: f32) -> Result<Self, SignFlError> {
        validate_step_size(step_size)?;
        Ok(Self { model, step_size })
    }

    /// Wrap `model` using the step size from `config`.
    pub fn from_config(model: M, config: &SignSgdConfig) -> Result<Self, SignFlError> {
        config.validate()?;
        Self::new(model, config.step_size)
    }

    /// Canonical model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Step size applied to every consensus update.
    pub fn step_size(&self) -> f32 {
        self.step_size
    }

    /// Canonical parameters.
    pub fn params(&self) -> Vec<ArrayD<f32>> {
        self.model.params()
    }

    /// Copy the canonical parameters into every client.
    pub fn send_to(&self, clients: &mut [Client<M>]) -> Result<(), SignFlError> {
        let params = self.model.params();
        for client in clients.iter_mut() {
            client.receive_params(&params)?;
        }
        Ok(())
    }

    /// Step the canonical model along `-step_size * consensus`.
    pub fn apply(&mut self, consensus: &CompressedUpdate) -> Result<(), SignFlError> {
        self.model.apply_update(consensus, self.step_size)
    }

    /// Evaluate the canonical model.
    pub fn evaluate(&self, batch: &M::Batch) -> Result<Metrics, SignFlError> {
        self.model.evaluate(batch)
    }
}
