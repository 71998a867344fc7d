//! Momentum-smoothed sign compression (Signum).
//!
//! Each client keeps an exponential moving average of its gradients and
//! transmits the sign of that average. Momentum is created lazily per
//! parameter index on first use and then updated in place every call.

use std::collections::BTreeMap;

use ndarray::ArrayD;
use tracing::debug;

use super::{
    check_shapes, ensure_non_empty, CommunicationCost, Compressed, CompressedUpdate,
    GradientCompressor,
};
use crate::error::SignFlError;
use crate::math::sign_tensor;

/// Check that `beta` lies strictly inside (0, 1).
pub fn validate_beta(beta: f32) -> Result<(), SignFlError> {
    if beta > 0.0 && beta < 1.0 {
        Ok(())
    } else {
        Err(SignFlError::InvalidConfiguration(format!(
            "momentum beta {} must be in (0, 1)",
            beta
        )))
    }
}

/// Sign-of-momentum compressor for a single client.
///
/// Update rule per parameter index `i`:
///
/// ```text
/// m[i] = (1 - β) · g[i]                  first call
/// m[i] = β · m[i] + (1 - β) · g[i]       afterwards
/// out  = sign(m[i])
/// ```
///
/// The parameter layout is fixed by the first call. Later calls with a
/// different tensor count or shape fail, as do gradients holding NaN or
/// infinity. A failed call leaves the momentum untouched.
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use signvote_fl::MomentumSignCompressor;
///
/// let mut signum = MomentumSignCompressor::new(0.9).unwrap();
///
/// let first = signum.compress(&[array![[1.0]].into_dyn()]).unwrap();
/// assert_eq!(first.update.tensors()[0], array![[1i8]].into_dyn());
///
/// // 0.9 * 0.1 + 0.1 * (-1.0) = -0.01
/// let second = signum.compress(&[array![[-1.0]].into_dyn()]).unwrap();
/// assert_eq!(second.update.tensors()[0], array![[-1i8]].into_dyn());
/// ```
#[derive(Clone, Debug)]
pub struct MomentumSignCompressor {
    beta: f32,
    momentum: BTreeMap<usize, ArrayD<f32>>,
}

impl MomentumSignCompressor {
    /// Create a compressor with smoothing factor `beta`.
    ///
    /// # Errors
    ///
    /// [`SignFlError::InvalidConfiguration`] unless `0 < beta < 1`.
    pub fn new(beta: f32) -> Result<Self, SignFlError> {
        validate_beta(beta)?;
        Ok(Self {
            beta,
            momentum: BTreeMap::new(),
        })
    }

    /// Smoothing factor.
    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// Current momentum for parameter `index`, if it has been initialized.
    pub fn momentum(&self, index: usize) -> Option<&ArrayD<f32>> {
        self.momentum.get(&index)
    }

    /// Number of parameters with momentum.
    pub fn tracked_params(&self) -> usize {
        self.momentum.len()
    }

    /// Update momentum with `gradient` and return its sign.
    ///
    /// # Errors
    ///
    /// - [`SignFlError::EmptyInput`] for an empty gradient
    /// - [`SignFlError::ParameterCountMismatch`] / [`SignFlError::ShapeMismatch`]
    ///   if the layout differs from the first call
    /// - [`SignFlError::NonFiniteGradient`] if any element is NaN or infinite
    pub fn compress(&mut self, gradient: &[ArrayD<f32>]) -> Result<Compressed, SignFlError> {
        ensure_non_empty(gradient)?;
        self.check_layout(gradient)?;
        if let Some(param) = gradient
            .iter()
            .position(|g| g.iter().any(|x| !x.is_finite()))
        {
            return Err(SignFlError::NonFiniteGradient { param });
        }

        let beta = self.beta;
        let keep = 1.0 - beta;
        let mut tensors = Vec::with_capacity(gradient.len());

        for (i, g) in gradient.iter().enumerate() {
            let m = self
                .momentum
                .entry(i)
                .and_modify(|m| m.zip_mut_with(g, |m, &g| *m = beta * *m + keep * g))
                .or_insert_with(|| {
                    debug!(param = i, shape = ?g.shape(), "initializing momentum");
                    g.mapv(|g| keep * g)
                });
            tensors.push(sign_tensor(&*m));
        }

        Ok(Compressed {
            update: CompressedUpdate::from_signs(tensors),
            cost: CommunicationCost::of_gradient(gradient),
        })
    }

    /// Drop all momentum; the next call starts from zero again.
    pub fn reset(&mut self) {
        self.momentum.clear();
    }

    fn check_layout(&self, gradient: &[ArrayD<f32>]) -> Result<(), SignFlError> {
        if self.momentum.is_empty() {
            return Ok(());
        }
        check_shapes(
            self.momentum.values().map(|m| m.shape()),
            gradient.iter().map(|g| g.shape()),
            self.momentum.len(),
            gradient.len(),
        )
    }
}

impl GradientCompressor for MomentumSignCompressor {
    fn compress(&mut self, gradient: &[ArrayD<f32>]) -> Result<Compressed, SignFlError> {
        MomentumSignCompressor::compress(self, gradient)
    }

    fn reset(&mut self) {
        MomentumSignCompressor::reset(self);
    }

    fn name(&self) -> &'static str {
        "momentum_sign"
    }
}
