//! Binary logistic regression on dense features.

use ndarray::{Array1, Array2, ArrayD, Ix1};

use super::{Metrics, TrainableModel};
use crate::compression::{check_shapes, Gradient};
use crate::error::SignFlError;

/// Probabilities are clamped away from 0 and 1 before taking logs.
const LOG_EPS: f32 = 1e-7;

/// Labelled samples for one client.
#[derive(Clone, Debug)]
pub struct Batch {
    features: Array2<f32>,
    labels: Array1<f32>,
}

impl Batch {
    /// Build a batch of `n` rows of features with `n` labels in {0, 1}.
    ///
    /// # Errors
    ///
    /// [`SignFlError::EmptyInput`] for zero rows, [`SignFlError::Model`] if
    /// row and label counts differ.
    pub fn new(features: Array2<f32>, labels: Array1<f32>) -> Result<Self, SignFlError> {
        if features.nrows() == 0 {
            return Err(SignFlError::EmptyInput("batch has no samples".into()));
        }
        if features.nrows() != labels.len() {
            return Err(SignFlError::Model(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        Ok(Self { features, labels })
    }

    /// Feature matrix (samples x features).
    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    /// Labels.
    pub fn labels(&self) -> &Array1<f32> {
        &self.labels
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the batch has no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// `sigmoid(x · w + b)` classifier trained with binary cross-entropy.
///
/// Parameters, in order: weights `[n_features]`, bias `[1]`.
#[derive(Clone, Debug)]
pub struct LogisticRegression {
    weights: Array1<f32>,
    bias: f32,
}

impl LogisticRegression {
    /// Zero-initialized model for `n_features` inputs.
    pub fn new(n_features: usize) -> Self {
        Self {
            weights: Array1::zeros(n_features),
            bias: 0.0,
        }
    }

    /// Number of input features.
    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    /// Weight vector.
    pub fn weights(&self) -> &Array1<f32> {
        &self.weights
    }

    /// Bias term.
    pub fn bias(&self) -> f32 {
        self.bias
    }

    /// Predicted probability of class 1 per sample.
    pub fn predict_proba(&self, features: &Array2<f32>) -> Result<Array1<f32>, SignFlError> {
        if features.ncols() != self.n_features() {
            return Err(SignFlError::Model(format!(
                "expected {} features, got {}",
                self.n_features(),
                features.ncols()
            )));
        }
        let bias = self.bias;
        Ok(features
            .dot(&self.weights)
            .mapv(|z| 1.0 / (1.0 + (-(z + bias)).exp())))
    }
}

impl TrainableModel for LogisticRegression {
    type Batch = Batch;

    fn params(&self) -> Vec<ArrayD<f32>> {
        vec![
            self.weights.clone().into_dyn(),
            Array1::from_elem(1, self.bias).into_dyn(),
        ]
    }

    fn set_params(&mut self, params: &[ArrayD<f32>]) -> Result<(), SignFlError> {
        let expected = [vec![self.n_features()], vec![1]];
        check_shapes(
            expected.iter().map(|s| s.as_slice()),
            params.iter().map(|p| p.shape()),
            expected.len(),
            params.len(),
        )?;
        self.weights = params[0].clone().into_dimensionality::<Ix1>()?;
        self.bias = params[1][[0]];
        Ok(())
    }

    fn compute_gradient(&mut self, batch: &Batch) -> Result<Gradient, SignFlError> {
        let p = self.predict_proba(&batch.features)?;
        let residual = p - &batch.labels;
        let n = batch.len() as f32;

        let grad_w = batch.features.t().dot(&residual) / n;
        let grad_b = residual.sum() / n;

        Ok(vec![grad_w.into_dyn(), Array1::from_elem(1, grad_b).into_dyn()])
    }

    fn evaluate(&self, batch: &Batch) -> Result<Metrics, SignFlError> {
        let p = self.predict_proba(&batch.features)?;
        let n = batch.len() as f32;

        let mut loss = 0.0f32;
        let mut correct = 0usize;
        for (&prob, &label) in p.iter().zip(batch.labels.iter()) {
            let prob = prob.clamp(LOG_EPS, 1.0 - LOG_EPS);
            loss -= label * prob.ln() + (1.0 - label) * (1.0 - prob).ln();
            if (prob >= 0.5) == (label >= 0.5) {
                correct += 1;
            }
        }

        Ok(Metrics {
            loss: loss / n,
            accuracy: correct as f32 / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::CompressedUpdate;
    use ndarray::array;

    fn toy_batch() -> Batch {
        Batch::new(
            array![[2.0, 0.0], [1.0, 1.0], [-1.0, 0.5], [-2.0, -1.0]],
            array![1.0, 1.0, 0.0, 0.0],
        )
        .unwrap()
    }

    #[test]
    fn test_batch_validation() {
        assert!(matches!(
            Batch::new(Array2::zeros((0, 2)), Array1::zeros(0)),
            Err(SignFlError::EmptyInput(_))
        ));
        assert!(matches!(
            Batch::new(Array2::zeros((2, 2)), Array1::zeros(3)),
            Err(SignFlError::Model(_))
        ));
    }

    #[test]
    fn test_zero_model_gradient() {
        // p = 0.5 everywhere, residual = [-0.5, -0.5, 0.5, 0.5]
        let mut model = LogisticRegression::new(2);
        let grad = model.compute_gradient(&toy_batch()).unwrap();
        assert_eq!(grad.len(), 2);
        assert!((grad[0][[0]] - (-0.75)).abs() < 1e-6);
        assert!((grad[0][[1]] - (-0.1875)).abs() < 1e-6);
        assert!(grad[1][[0]].abs() < 1e-6);
    }

    #[test]
    fn test_evaluate_zero_model() {
        let model = LogisticRegression::new(2);
        let metrics = model.evaluate(&toy_batch()).unwrap();
        assert!((metrics.loss - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_set_params_roundtrip() {
        let mut model = LogisticRegression::new(3);
        let params = vec![array![0.1f32, -0.2, 0.3].into_dyn(), array![0.5f32].into_dyn()];
        model.set_params(&params).unwrap();
        assert_eq!(model.params(), params);
        assert_eq!(model.bias(), 0.5);
    }

    #[test]
    fn test_set_params_rejects_layout() {
        let mut model = LogisticRegression::new(3);
        let err = model
            .set_params(&[array![0.1f32, 0.2].into_dyn(), array![0.0f32].into_dyn()])
            .unwrap_err();
        assert!(err.is_shape_mismatch());
        assert!(model.set_params(&[array![0.1f32, 0.2, 0.3].into_dyn()]).is_err());
    }

    #[test]
    fn test_feature_width_checked() {
        let mut model = LogisticRegression::new(3);
        assert!(matches!(
            model.compute_gradient(&toy_batch()),
            Err(SignFlError::Model(_))
        ));
    }

    #[test]
    fn test_apply_update_descends() {
        let mut model = LogisticRegression::new(2);
        let update = CompressedUpdate::new(vec![
            array![-1i8, 1].into_dyn(),
            array![0i8].into_dyn(),
        ])
        .unwrap();
        model.apply_update(&update, 0.1).unwrap();
        assert_eq!(model.weights(), &array![0.1f32, -0.1]);
        assert_eq!(model.bias(), 0.0);
    }

    #[test]
    fn test_sign_steps_reduce_loss() {
        let batch = toy_batch();
        let mut model = LogisticRegression::new(2);
        let initial = model.evaluate(&batch).unwrap().loss;

        for _ in 0..20 {
            let grad = model.compute_gradient(&batch).unwrap();
            let update = crate::SignCompressor::new().compress(&grad).unwrap().update;
            model.apply_update(&update, 0.05).unwrap();
        }

        let metrics = model.evaluate(&batch).unwrap();
        assert!(metrics.loss < initial);
        assert_eq!(metrics.accuracy, 1.0);
    }
}
