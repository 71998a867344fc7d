//! Sign-based gradient compression.
//!
//! | Compressor | State | Output |
//! |------------|-------|--------|
//! | [`SignCompressor`] | none | `sign(g)` |
//! | [`MomentumSignCompressor`] | one momentum tensor per parameter | `sign(β·m + (1-β)·g)` |
//!
//! Both report a [`CommunicationCost`] against a 32-bit-per-element baseline so
//! runs can be compared with uncompressed training.

pub mod momentum;
pub mod sign;

pub use momentum::MomentumSignCompressor;
pub use sign::SignCompressor;

use std::iter::Sum;
use std::ops::{Add, AddAssign};

use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use crate::error::SignFlError;
use crate::math::is_ternary;

/// Bits per element of the uncompressed baseline used in cost reports.
pub const BITS_PER_ELEMENT: usize = 32;

/// Raw gradient: one tensor per trainable parameter, in stable order.
pub type Gradient = Vec<ArrayD<f32>>;

/// Communication cost of one transmitted update.
///
/// `bits` is always `element_count * 32`: the size the update would have had
/// in full precision, not the size of the sign payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationCost {
    /// Baseline bit cost
    pub bits: usize,
    /// Number of scalar elements transmitted
    pub element_count: usize,
}

impl CommunicationCost {
    /// Cost of sending `element_count` scalars.
    pub fn for_elements(element_count: usize) -> Self {
        Self {
            bits: element_count * BITS_PER_ELEMENT,
            element_count,
        }
    }

    /// Cost of a whole gradient (sum of tensor sizes).
    pub fn of_gradient(gradient: &[ArrayD<f32>]) -> Self {
        Self::for_elements(gradient.iter().map(|g| g.len()).sum())
    }
}

impl Add for CommunicationCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            bits: self.bits + rhs.bits,
            element_count: self.element_count + rhs.element_count,
        }
    }
}

impl AddAssign for CommunicationCost {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for CommunicationCost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// A compressed update: one `i8` tensor per parameter, each element in {-1, 0, +1}.
///
/// Never empty. Only constructible through a compressor, a vote, or the
/// validating [`CompressedUpdate::new`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedUpdate {
    tensors: Vec<ArrayD<i8>>,
}

impl CompressedUpdate {
    /// Build from raw sign tensors, checking the value domain.
    pub fn new(tensors: Vec<ArrayD<i8>>) -> Result<Self, SignFlError> {
        if tensors.is_empty() {
            return Err(SignFlError::EmptyInput(
                "compressed update has no tensors".into(),
            ));
        }
        for tensor in &tensors {
            is_ternary(tensor).map_err(SignFlError::InvalidSignValue)?;
        }
        Ok(Self { tensors })
    }

    /// Internal constructor for tensors already known to be ternary and non-empty.
    pub(crate) fn from_signs(tensors: Vec<ArrayD<i8>>) -> Self {
        debug_assert!(!tensors.is_empty());
        Self { tensors }
    }

    /// Per-parameter sign tensors.
    pub fn tensors(&self) -> &[ArrayD<i8>] {
        &self.tensors
    }

    /// Consume into the raw tensors.
    pub fn into_tensors(self) -> Vec<ArrayD<i8>> {
        self.tensors
    }

    /// Number of parameter tensors.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether there are no parameter tensors.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Shapes of each tensor, in parameter order.
    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.tensors.iter().map(|t| t.shape().to_vec()).collect()
    }

    /// Total scalar elements across all tensors.
    pub fn element_count(&self) -> usize {
        self.tensors.iter().map(|t| t.len()).sum()
    }

    /// Dense `f32` step: `step_size * sign` per coordinate.
    pub fn scaled(&self, step_size: f32) -> Vec<ArrayD<f32>> {
        self.tensors
            .iter()
            .map(|t| t.mapv(|s| f32::from(s) * step_size))
            .collect()
    }

    /// Check shape-for-shape congruence with `other`.
    pub fn check_congruent(&self, other: &CompressedUpdate) -> Result<(), SignFlError> {
        check_shapes(
            self.tensors.iter().map(|t| t.shape()),
            other.tensors.iter().map(|t| t.shape()),
            self.len(),
            other.len(),
        )
    }
}

/// Compare two ordered shape lists, reporting the first disagreement.
pub(crate) fn check_shapes<'a>(
    expected: impl Iterator<Item = &'a [usize]>,
    actual: impl Iterator<Item = &'a [usize]>,
    expected_len: usize,
    actual_len: usize,
) -> Result<(), SignFlError> {
    if expected_len != actual_len {
        return Err(SignFlError::ParameterCountMismatch {
            client: None,
            expected: expected_len,
            actual: actual_len,
        });
    }
    for (param, (e, a)) in expected.zip(actual).enumerate() {
        if e != a {
            return Err(SignFlError::ShapeMismatch {
                client: None,
                param,
                expected: e.to_vec(),
                actual: a.to_vec(),
            });
        }
    }
    Ok(())
}

/// Result of one compression call.
#[derive(Clone, Debug, PartialEq)]
pub struct Compressed {
    /// Sign tensors to transmit
    pub update: CompressedUpdate,
    /// Accounting for this update
    pub cost: CommunicationCost,
}

impl Compressed {
    /// Split into `(update, bits, element_count)`.
    pub fn into_parts(self) -> (CompressedUpdate, usize, usize) {
        (self.update, self.cost.bits, self.cost.element_count)
    }
}

/// A gradient compressor owned by exactly one client.
///
/// `compress` takes `&mut self` so stateful variants can update their state
/// in place; stateless variants simply ignore it.
pub trait GradientCompressor: Send {
    /// Compress one gradient.
    fn compress(&mut self, gradient: &[ArrayD<f32>]) -> Result<Compressed, SignFlError>;

    /// Drop any accumulated state.
    fn reset(&mut self) {}

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

/// Reject an empty gradient collection.
pub(crate) fn ensure_non_empty(gradient: &[ArrayD<f32>]) -> Result<(), SignFlError> {
    if gradient.is_empty() {
        Err(SignFlError::EmptyInput(
            "gradient has no parameter tensors".into(),
        ))
    } else {
        Ok(())
    }
}

/// Compression method selection.
///
/// Replaces shared, ready-made compressor instances: call [`build`](Self::build)
/// once per client so momentum is never shared.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompressionMethod {
    /// Plain sign compression (signSGD)
    Sign,
    /// Sign of an exponential moving average (Signum)
    MomentumSign {
        /// Smoothing factor in (0, 1)
        beta: f32,
    },
}

impl Default for CompressionMethod {
    fn default() -> Self {
        CompressionMethod::MomentumSign { beta: 0.9 }
    }
}

impl CompressionMethod {
    /// Check parameters without building anything.
    pub fn validate(&self) -> Result<(), SignFlError> {
        match *self {
            CompressionMethod::Sign => Ok(()),
            CompressionMethod::MomentumSign { beta } => momentum::validate_beta(beta),
        }
    }

    /// Build a fresh compressor for one client.
    pub fn build(&self) -> Result<Box<dyn GradientCompressor>, SignFlError> {
        Ok(match *self {
            CompressionMethod::Sign => Box::new(SignCompressor::new()),
            CompressionMethod::MomentumSign { beta } => {
                Box::new(MomentumSignCompressor::new(beta)?)
            }
        })
    }
}
