//! Fitted linear models
//!
//! Training runs on burn; once it finishes the weights are copied out into
//! plain coefficient vectors so that inference is a dot product over owned
//! data, shareable across threads without locks.

use serde::{Deserialize, Serialize};

/// Z-score parameters per feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Standardizer {
    /// Column statistics of a row-major `rows × dim` matrix.
    ///
    /// A column with zero spread gets std 1 so it passes through centred.
    pub fn fit(matrix: &[f64], dim: usize) -> Self {
        let rows = if dim == 0 { 0 } else { matrix.len() / dim };
        if rows == 0 {
            return Standardizer {
                mean: vec![0.0; dim],
                std: vec![1.0; dim],
            };
        }

        let mut mean = vec![0.0; dim];
        for row in matrix.chunks_exact(dim) {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= rows as f64;
        }

        let mut var = vec![0.0; dim];
        for row in matrix.chunks_exact(dim) {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }
        let std = var
            .into_iter()
            .map(|v| {
                let s = (v / rows as f64).sqrt();
                if s > 1e-12 {
                    s
                } else {
                    1.0
                }
            })
            .collect();

        Standardizer { mean, std }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.mean.iter().zip(&self.std))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    /// Standardize a whole row-major matrix
    pub fn transform_matrix(&self, matrix: &[f64]) -> Vec<f64> {
        let dim = self.dim().max(1);
        matrix
            .chunks(dim)
            .flat_map(|row| self.transform(row))
            .collect()
    }
}

/// `w · standardize(x) + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub bias: f64,
    pub scaler: Standardizer,
}

impl LinearModel {
    pub fn dim(&self) -> usize {
        self.weights.len()
    }

    /// Raw linear output (logit for the classifier, value for the regressor)
    pub fn decision(&self, x: &[f64]) -> f64 {
        let z = self.scaler.transform(x);
        self.bias + self.weights.iter().zip(&z).map(|(w, x)| w * x).sum::<f64>()
    }
}

/// Logistic model for P(win)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinClassifier {
    pub linear: LinearModel,
}

impl WinClassifier {
    pub fn new(linear: LinearModel) -> Self {
        WinClassifier { linear }
    }

    /// Probability in [0, 1]
    pub fn predict_proba(&self, x: &[f64]) -> f64 {
        sigmoid(self.linear.decision(x))
    }
}

/// Linear model for the point margin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginRegressor {
    pub linear: LinearModel,
}

impl MarginRegressor {
    pub fn new(linear: LinearModel) -> Self {
        MarginRegressor { linear }
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        self.linear.decision(x)
    }
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardizer() {
        // Two rows, two columns; second column constant
        let matrix = [1.0, 5.0, 3.0, 5.0];
        let s = Standardizer::fit(&matrix, 2);
        assert_eq!(s.mean, vec![2.0, 5.0]);
        assert_eq!(s.std, vec![1.0, 1.0]);
        assert_eq!(s.transform(&[3.0, 5.0]), vec![1.0, 0.0]);
        assert_eq!(s.transform_matrix(&matrix), vec![-1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_linear_decision() {
        let model = LinearModel {
            weights: vec![2.0, -1.0],
            bias: 0.5,
            scaler: Standardizer {
                mean: vec![10.0, 0.0],
                std: vec![5.0, 1.0],
            },
        };
        // z = [(20-10)/5, 3] = [2, 3] → 4 - 3 + 0.5
        assert!((model.decision(&[20.0, 3.0]) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_classifier_probability_range() {
        let clf = WinClassifier::new(LinearModel {
            weights: vec![50.0],
            bias: 0.0,
            scaler: Standardizer {
                mean: vec![0.0],
                std: vec![1.0],
            },
        });
        for x in [-100.0, -1.0, 0.0, 1.0, 100.0] {
            let p = clf.predict_proba(&[x]);
            assert!((0.0..=1.0).contains(&p));
        }
    }
}
