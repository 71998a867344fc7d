//! Plain sign compression (signSGD).

use ndarray::ArrayD;

use super::{ensure_non_empty, CommunicationCost, Compressed, CompressedUpdate, GradientCompressor};
use crate::error::SignFlError;
use crate::math::sign_tensor;

/// Stateless sign compressor.
///
/// Each gradient element becomes -1, 0 or +1. Holds no state, so one
/// instance per client is a convention rather than a requirement.
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use signvote_fl::SignCompressor;
///
/// let gradient = vec![array![[1.0, -2.0, 0.0]].into_dyn()];
/// let out = SignCompressor::new().compress(&gradient).unwrap();
///
/// assert_eq!(out.update.tensors()[0], array![[1i8, -1, 0]].into_dyn());
/// assert_eq!(out.cost.element_count, 3);
/// assert_eq!(out.cost.bits, 96);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct SignCompressor;

impl SignCompressor {
    /// Create a sign compressor.
    pub fn new() -> Self {
        Self
    }

    /// Compress a gradient into its element-wise sign.
    ///
    /// # Errors
    ///
    /// [`SignFlError::EmptyInput`] if `gradient` holds no tensors.
    pub fn compress(&self, gradient: &[ArrayD<f32>]) -> Result<Compressed, SignFlError> {
        ensure_non_empty(gradient)?;

        let tensors = gradient.iter().map(sign_tensor).collect();

        Ok(Compressed {
            update: CompressedUpdate::from_signs(tensors),
            cost: CommunicationCost::of_gradient(gradient),
        })
    }
}

impl GradientCompressor for SignCompressor {
    fn compress(&mut self, gradient: &[ArrayD<f32>]) -> Result<Compressed, SignFlError> {
        SignCompressor::compress(self, gradient)
    }

    fn name(&self) -> &'static str {
        "sign"
    }
}
