//! Error types for signvote-fl

use thiserror::Error;

/// All possible errors in signvote-fl
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignFlError {
    /// A gradient, update collection or vote tally had nothing in it
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Number of parameter tensors differs from what was seen before
    #[error(
        "Shape mismatch{}: expected {} parameter tensors, got {}",
        from_client(.client),
        .expected,
        .actual
    )]
    ParameterCountMismatch {
        /// Index of the client whose update disagreed, when aggregating
        client: Option<usize>,
        /// Count recorded from earlier input
        expected: usize,
        /// Count in the offending input
        actual: usize,
    },

    /// A parameter tensor has a different shape from its counterpart
    #[error(
        "Shape mismatch{} at parameter {}: expected {:?}, got {:?}",
        from_client(.client),
        .param,
        .expected,
        .actual
    )]
    ShapeMismatch {
        /// Index of the client whose update disagreed, when aggregating
        client: Option<usize>,
        /// Parameter index
        param: usize,
        /// Recorded shape
        expected: Vec<usize>,
        /// Offending shape
        actual: Vec<usize>,
    },

    /// Gradient holds a NaN or infinite value
    #[error("Non-finite gradient value in parameter {param}")]
    NonFiniteGradient {
        /// Parameter index
        param: usize,
    },

    /// Client id list and update list have different lengths
    #[error("Client id mismatch: {updates} updates but {ids} client ids")]
    ClientIdMismatch {
        /// Number of updates
        updates: usize,
        /// Number of client ids
        ids: usize,
    },

    /// Configuration value is out of range (e.g. momentum beta outside (0, 1))
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Compressed tensor holds a value other than -1, 0 or +1
    #[error("Invalid sign value {0} (must be -1, 0 or 1)")]
    InvalidSignValue(i8),

    /// Error reported by a trainable model
    #[error("Model error: {0}")]
    Model(String),

    /// Array shape error from ndarray
    #[error("Array shape error: {0}")]
    ArrayShape(String),

    /// Config or ledger (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn from_client(client: &Option<usize>) -> String {
    client.map(|c| format!(" from client {}", c)).unwrap_or_default()
}

impl SignFlError {
    /// True for both parameter-count and per-tensor shape disagreements.
    pub fn is_shape_mismatch(&self) -> bool {
        matches!(
            self,
            SignFlError::ParameterCountMismatch { .. } | SignFlError::ShapeMismatch { .. }
        )
    }

    /// Attribute a shape disagreement to the client at index `client`.
    /// Other errors pass through unchanged.
    pub fn for_client(self, client: usize) -> Self {
        match self {
            SignFlError::ParameterCountMismatch {
                expected,
                actual,
                ..
            } => SignFlError::ParameterCountMismatch {
                client: Some(client),
                expected,
                actual,
            },
            SignFlError::ShapeMismatch {
                param,
                expected,
                actual,
                ..
            } => SignFlError::ShapeMismatch {
                client: Some(client),
                param,
                expected,
                actual,
            },
            other => other,
        }
    }
}

impl From<ndarray::ShapeError> for SignFlError {
    fn from(e: ndarray::ShapeError) -> Self {
        SignFlError::ArrayShape(e.to_string())
    }
}

impl From<serde_json::Error> for SignFlError {
    fn from(e: serde_json::Error) -> Self {
        SignFlError::Serialization(e.to_string())
    }
}
