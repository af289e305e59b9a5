//! Full-batch trainer for a single linear layer
//!
//! Fits either a logistic classifier (sigmoid + BCE) or a least-squares
//! regressor, then copies the learned weights out of burn into a
//! [`LinearModel`].

use burn::nn::{Initializer, Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor, TensorData};

use crate::model::{LinearModel, Standardizer};
use crate::{HoopsError, Result};

/// Loss the linear layer is fitted against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Binary cross-entropy on sigmoid output
    Logistic,
    /// Mean squared error on the centred target
    SquaredError,
}

/// Single Linear layer trained with Adam over the whole matrix each step
pub struct LinearTrainer<B: AutodiffBackend> {
    device: B::Device,
    epochs: usize,
    learning_rate: f64,
    l2_penalty: f64,
    log_every: usize,
}

impl<B: AutodiffBackend> LinearTrainer<B> {
    pub fn new(device: B::Device, epochs: usize, learning_rate: f64) -> Self {
        LinearTrainer {
            device,
            epochs,
            learning_rate,
            l2_penalty: 0.0,
            log_every: 250,
        }
    }

    /// Add `l2 * sum(w^2)` to the loss (bias is not penalised)
    pub fn with_l2_penalty(mut self, l2: f64) -> Self {
        self.l2_penalty = l2;
        self
    }

    /// Fit on a row-major `targets.len() × dim` matrix
    pub fn fit(
        &self,
        matrix: &[f64],
        dim: usize,
        targets: &[f64],
        objective: Objective,
    ) -> Result<LinearModel> {
        let rows = targets.len();
        if dim == 0 || rows == 0 {
            return Err(HoopsError::Training(format!(
                "Cannot fit on a {}x{} matrix",
                rows, dim
            )));
        }
        if matrix.len() != rows * dim {
            return Err(HoopsError::Training(format!(
                "Matrix has {} cells, expected {}x{}",
                matrix.len(),
                rows,
                dim
            )));
        }

        let scaler = Standardizer::fit(matrix, dim);
        let offset = match objective {
            Objective::Logistic => 0.0,
            Objective::SquaredError => targets.iter().sum::<f64>() / rows as f64,
        };

        let x_data: Vec<f32> = scaler
            .transform_matrix(matrix)
            .into_iter()
            .map(|v| v as f32)
            .collect();
        let y_data: Vec<f32> = targets.iter().map(|t| (t - offset) as f32).collect();

        let x = Tensor::<B, 2>::from_data(TensorData::new(x_data, [rows, dim]), &self.device);
        let y = Tensor::<B, 2>::from_data(TensorData::new(y_data, [rows, 1]), &self.device);

        let mut model: Linear<B> = LinearConfig::new(dim, 1)
            .with_initializer(Initializer::Zeros)
            .init(&self.device);
        let mut optimizer = AdamConfig::new().init::<B, Linear<B>>();

        log::debug!(
            "Fitting {:?} model: {} rows, {} features, {} epochs",
            objective,
            rows,
            dim,
            self.epochs
        );

        for epoch in 0..self.epochs {
            let output = model.forward(x.clone());
            let data_loss = match objective {
                Objective::Logistic => binary_cross_entropy(sigmoid(output), y.clone()),
                Objective::SquaredError => (output - y.clone()).powf_scalar(2.0).mean(),
            };

            let loss = if self.l2_penalty > 0.0 {
                let w = model.weight.val();
                data_loss + (w.clone() * w).sum().mul_scalar(self.l2_penalty)
            } else {
                data_loss
            };

            if epoch % self.log_every == 0 || epoch + 1 == self.epochs {
                let loss_val: f32 = loss.clone().into_scalar().elem();
                log::debug!(
                    "{:?} epoch {}/{}: loss={:.5}",
                    objective,
                    epoch + 1,
                    self.epochs,
                    loss_val
                );
            }

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(self.learning_rate, model, grads_params);
        }

        let weights = tensor_to_vec(model.weight.val())?;
        let bias = match &model.bias {
            Some(bias) => tensor_to_vec(bias.val())?.first().copied().unwrap_or(0.0),
            None => 0.0,
        };

        Ok(LinearModel {
            weights,
            bias: bias + offset,
            scaler,
        })
    }
}

fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

fn tensor_to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f64>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map(|values| values.into_iter().map(f64::from).collect())
        .map_err(|e| HoopsError::Training(format!("Failed to read weights: {:?}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn trainer(epochs: usize) -> LinearTrainer<TestBackend> {
        LinearTrainer::new(Default::default(), epochs, 0.05)
    }

    #[test]
    fn test_regression_recovers_line() {
        // y = 3x + 2
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x + 2.0).collect();

        let model = trainer(3000).fit(&xs, 1, &ys, Objective::SquaredError).unwrap();
        for x in [0.0, 10.0, 19.0] {
            let pred = model.decision(&[x]);
            assert!((pred - (3.0 * x + 2.0)).abs() < 0.5, "x={} pred={}", x, pred);
        }
    }

    #[test]
    fn test_logistic_separates_classes() {
        let xs: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| if *x >= 10.0 { 1.0 } else { 0.0 }).collect();

        let model = trainer(500)
            .with_l2_penalty(1e-3)
            .fit(&xs, 1, &ys, Objective::Logistic)
            .unwrap();
        assert!(crate::model::linear::sigmoid(model.decision(&[18.0])) > 0.8);
        assert!(crate::model::linear::sigmoid(model.decision(&[1.0])) < 0.2);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let xs = [1.0, 4.0, 2.0, 8.0, 3.0, 5.0];
        let ys = [0.0, 1.0, 0.0];

        let a = trainer(50).fit(&xs, 2, &ys, Objective::Logistic).unwrap();
        let b = trainer(50).fit(&xs, 2, &ys, Objective::Logistic).unwrap();
        assert_eq!(a.scaler, b.scaler);
        for (wa, wb) in a.weights.iter().zip(&b.weights) {
            assert!((wa - wb).abs() < 1e-6);
        }
        assert!((a.bias - b.bias).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(trainer(1).fit(&[], 0, &[], Objective::Logistic).is_err());
        assert!(trainer(1)
            .fit(&[1.0, 2.0, 3.0], 2, &[1.0, 0.0], Objective::Logistic)
            .is_err());
    }
}
