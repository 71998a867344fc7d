//! # signvote-fl: Sign-Compressed Federated Learning
//!
//! Clients upload the sign of their gradient (or of a momentum average of
//! it) instead of full-precision values; the server takes a coordinate-wise
//! majority vote and steps along the consensus.
//!
//! ## Compression
//!
//! - [`SignCompressor`] - `sign(g)` (signSGD)
//! - [`MomentumSignCompressor`] - `sign(β·m + (1-β)·g)` (Signum)
//!
//! Both report a [`CommunicationCost`] of `element_count * 32` bits, the
//! uncompressed baseline.
//!
//! ## Aggregation
//!
//! - [`majority_vote()`] - coordinate-wise majority, ties resolve to 0
//! - [`VoteAccumulator`] - streaming / mergeable tally
//! - [`VoteAggregator`] - majority vote with per-client agreement tracking
//!
//! ## Federation
//!
//! [`TrainableModel`] is the only thing the core needs from a model.
//! [`Client`], [`ServerModel`] and [`run_round`] wire a simulation together.

#![deny(missing_docs)]

pub mod accounting;
pub mod aggregators;
pub mod compression;
pub mod config;
pub mod error;
pub mod federation;
pub mod math;
pub mod model;

// Re-exports
pub use accounting::{CommunicationLedger, CostRecord};
pub use aggregators::{majority_vote, VoteAccumulator, VoteAggregator};
pub use compression::{
    CommunicationCost, Compressed, CompressedUpdate, CompressionMethod, Gradient,
    GradientCompressor, MomentumSignCompressor, SignCompressor,
};
pub use config::SignSgdConfig;
pub use error::SignFlError;
pub use federation::{run_round, Client, ClientUpdate, RoundReport, ServerModel};
pub use model::{Metrics, TrainableModel};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Python bindings via PyO3
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArrayDyn, PyReadonlyArrayDyn};
    use pyo3::prelude::*;

    use crate::{CompressedUpdate, SignFlError};

    fn signfl_err(e: SignFlError) -> PyErr {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", e))
    }

    fn to_gradient(gradient: Vec<PyReadonlyArrayDyn<'_, f32>>) -> crate::Gradient {
        gradient.iter().map(|g| g.as_array().to_owned()).collect()
    }

    type PyCompressed<'py> = (Vec<&'py PyArrayDyn<i8>>, usize, usize);

    fn to_python(py: Python<'_>, compressed: crate::Compressed) -> PyCompressed<'_> {
        let (update, bits, element_count) = compressed.into_parts();
        let arrays = update
            .into_tensors()
            .into_iter()
            .map(|t| t.into_pyarray(py))
            .collect();
        (arrays, bits, element_count)
    }

    #[pyclass(name = "SignCompressor")]
    struct PySignCompressor {
        inner: crate::SignCompressor,
    }

    #[pymethods]
    impl PySignCompressor {
        #[new]
        fn new() -> Self {
            Self {
                inner: crate::SignCompressor::new(),
            }
        }

        /// Returns `(signs, bits, element_count)`.
        fn compress<'py>(
            &self,
            py: Python<'py>,
            gradient: Vec<PyReadonlyArrayDyn<'py, f32>>,
        ) -> PyResult<PyCompressed<'py>> {
            let compressed = self
                .inner
                .compress(&to_gradient(gradient))
                .map_err(signfl_err)?;
            Ok(to_python(py, compressed))
        }
    }

    #[pyclass(name = "MomentumSignCompressor")]
    struct PyMomentumSignCompressor {
        inner: crate::MomentumSignCompressor,
    }

    #[pymethods]
    impl PyMomentumSignCompressor {
        #[new]
        fn new(beta: f32) -> PyResult<Self> {
            Ok(Self {
                inner: crate::MomentumSignCompressor::new(beta).map_err(signfl_err)?,
            })
        }

        /// Returns `(signs, bits, element_count)`.
        fn compress<'py>(
            &mut self,
            py: Python<'py>,
            gradient: Vec<PyReadonlyArrayDyn<'py, f32>>,
        ) -> PyResult<PyCompressed<'py>> {
            let compressed = self
                .inner
                .compress(&to_gradient(gradient))
                .map_err(signfl_err)?;
            Ok(to_python(py, compressed))
        }

        fn reset(&mut self) {
            self.inner.reset();
        }
    }

    #[pyfunction]
    fn majority_vote<'py>(
        py: Python<'py>,
        updates: Vec<Vec<PyReadonlyArrayDyn<'py, i8>>>,
    ) -> PyResult<Vec<&'py PyArrayDyn<i8>>> {
        let updates = updates
            .iter()
            .map(|u| CompressedUpdate::new(u.iter().map(|t| t.as_array().to_owned()).collect()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(signfl_err)?;

        let consensus = crate::majority_vote(&updates).map_err(signfl_err)?;
        Ok(consensus
            .into_tensors()
            .into_iter()
            .map(|t| t.into_pyarray(py))
            .collect())
    }

    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_class::<PySignCompressor>()?;
        m.add_class::<PyMomentumSignCompressor>()?;
        m.add_function(wrap_pyfunction!(majority_vote, m)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
