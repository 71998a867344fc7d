//! A simulated federated client.

use ndarray::ArrayD;
use tracing::trace;

use crate::compression::{CommunicationCost, CompressedUpdate, GradientCompressor};
use crate::error::SignFlError;
use crate::model::{Metrics, TrainableModel};

/// What a client uploads in one round.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientUpdate {
    /// Sender.
    pub client_id: String,
    /// Sign tensors.
    pub update: CompressedUpdate,
    /// Accounting for this upload.
    pub cost: CommunicationCost,
}

/// One client: a local model, its local data and its own compressor.
///
/// The compressor is owned exclusively, so momentum state is never shared
/// between clients.
pub struct Client<M: TrainableModel> {
    id: String,
    model: M,
    compressor: Box<dyn GradientCompressor>,
    data: M::Batch,
}

impl<M: TrainableModel> Client<M> {
    /// Create a client.
    pub fn new(
        id: impl Into<String>,
        model: M,
        compressor: Box<dyn GradientCompressor>,
        data: M::Batch,
    ) -> Self {
        Self {
            id: id.into(),
            model,
            compressor,
            data,
        }
    }

    /// Client identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Local model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Local data.
    pub fn data(&self) -> &M::Batch {
        &self.data
    }

    /// Name of the compressor in use.
    pub fn compressor_name(&self) -> &'static str {
        self.compressor.name()
    }

    /// Overwrite local parameters with the global ones.
    pub fn receive_params(&mut self, params: &[ArrayD<f32>]) -> Result<(), SignFlError> {
        self.model.set_params(params)
    }

    /// Compute a gradient on local data and compress it.
    pub fn compute_update(&mut self) -> Result<ClientUpdate, SignFlError> {
        let gradient = self.model.compute_gradient(&self.data)?;
        let (update, bits, element_count) = self.compressor.compress(&gradient)?.into_parts();
        trace!(client = %self.id, bits, element_count, "compressed gradient");

        Ok(ClientUpdate {
            client_id: self.id.clone(),
            update,
            cost: CommunicationCost {
                bits,
                element_count,
            },
        })
    }

    /// Evaluate the local model on local data.
    pub fn evaluate(&self) -> Result<Metrics, SignFlError> {
        self.model.evaluate(&self.data)
    }

    /// Clear compressor state (e.g. momentum) without touching the model.
    pub fn reset_compressor(&mut self) {
        self.compressor.reset();
    }
}
