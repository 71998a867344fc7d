//! Configuration for sign-compressed federated training.
//!
//! [`SignSgdConfig`] picks the client-side [`CompressionMethod`] and the
//! server-side step size. It serializes with serde so runs can be described
//! in JSON.

use serde::{Deserialize, Serialize};

use crate::compression::{CompressionMethod, GradientCompressor};
use crate::error::SignFlError;

/// Run configuration.
///
/// # Example
///
/// ```
/// use signvote_fl::SignSgdConfig;
///
/// let config = SignSgdConfig::default()
///     .with_beta(0.95)
///     .with_step_size(0.001);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignSgdConfig {
    /// How each client compresses its gradient.
    pub method: CompressionMethod,

    /// Server step along the consensus direction.
    pub step_size: f32,
}

impl Default for SignSgdConfig {
    fn default() -> Self {
        Self {
            method: CompressionMethod::default(),
            step_size: 0.01,
        }
    }
}

impl SignSgdConfig {
    /// Set the compression method.
    #[must_use]
    pub const fn with_method(mut self, method: CompressionMethod) -> Self {
        self.method = method;
        self
    }

    /// Use momentum-sign compression with smoothing factor `beta`.
    #[must_use]
    pub const fn with_beta(mut self, beta: f32) -> Self {
        self.method = CompressionMethod::MomentumSign { beta };
        self
    }

    /// Set the server step size.
    #[must_use]
    pub const fn with_step_size(mut self, step_size: f32) -> Self {
        self.step_size = step_size;
        self
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), SignFlError> {
        self.method.validate()?;
        validate_step_size(self.step_size)
    }

    /// Build one compressor for one client.
    pub fn build_compressor(&self) -> Result<Box<dyn GradientCompressor>, SignFlError> {
        self.method.build()
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, SignFlError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, SignFlError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Step size must be positive and finite.
pub fn validate_step_size(step_size: f32) -> Result<(), SignFlError> {
    if step_size.is_finite() && step_size > 0.0 {
        Ok(())
    } else {
        Err(SignFlError::InvalidConfiguration(format!(
            "step size {} must be positive and finite",
            step_size
        )))
    }
}
