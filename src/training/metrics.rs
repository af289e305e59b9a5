//! Fit diagnostics: calibration curve, margin residuals, summary metrics

use serde::Serialize;
use std::fmt;

/// One calibration bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationBin {
    pub mean_predicted: f64,
    pub mean_observed: f64,
    pub count: usize,
}

/// Binned predicted probability against observed win frequency.
///
/// Only non-empty bins are kept, ordered by bin.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalibrationCurve {
    pub bins: Vec<CalibrationBin>,
}

impl CalibrationCurve {
    /// Uniform bins over [0, 1]: bin k holds p in (k/n, (k+1)/n], p = 0 goes to bin 0
    pub fn compute(probs: &[f64], outcomes: &[f64], n_bins: usize) -> Self {
        let n_bins = n_bins.max(1);
        let mut sum_pred = vec![0.0; n_bins];
        let mut sum_obs = vec![0.0; n_bins];
        let mut counts = vec![0usize; n_bins];

        for (&p, &y) in probs.iter().zip(outcomes) {
            let p = p.clamp(0.0, 1.0);
            let bin = bin_index(p, n_bins);
            sum_pred[bin] += p;
            sum_obs[bin] += y;
            counts[bin] += 1;
        }

        let bins = (0..n_bins)
            .filter(|&b| counts[b] > 0)
            .map(|b| CalibrationBin {
                mean_predicted: sum_pred[b] / counts[b] as f64,
                mean_observed: sum_obs[b] / counts[b] as f64,
                count: counts[b],
            })
            .collect();

        CalibrationCurve { bins }
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// (mean predicted, mean observed) per bin
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.bins
            .iter()
            .map(|b| (b.mean_predicted, b.mean_observed))
            .collect()
    }

    /// Count-weighted mean absolute gap between predicted and observed
    pub fn expected_calibration_error(&self) -> f64 {
        let total: usize = self.bins.iter().map(|b| b.count).sum();
        if total == 0 {
            return 0.0;
        }
        self.bins
            .iter()
            .map(|b| (b.mean_predicted - b.mean_observed).abs() * b.count as f64)
            .sum::<f64>()
            / total as f64
    }
}

/// Number of interior edges `k / n` strictly below `p`
fn bin_index(p: f64, n_bins: usize) -> usize {
    (1..n_bins)
        .filter(|&k| k as f64 / (n_bins as f64) < p)
        .count()
}

/// Equal-width histogram; the last bin is closed on the right
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bin containing `value`, if it lies within the edges
    pub fn bin_of(&self, value: f64) -> Option<usize> {
        let (first, last) = (*self.edges.first()?, *self.edges.last()?);
        if value < first || value > last || self.counts.is_empty() {
            return None;
        }
        let width = (last - first) / self.counts.len() as f64;
        let idx = ((value - first) / width) as usize;
        Some(idx.min(self.counts.len() - 1))
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Actual minus predicted margin over every labelled row
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResidualDistribution {
    residuals: Vec<f64>,
}

impl ResidualDistribution {
    pub fn from_predictions(actual: &[f64], predicted: &[f64]) -> Self {
        ResidualDistribution {
            residuals: actual.iter().zip(predicted).map(|(a, p)| a - p).collect(),
        }
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn len(&self) -> usize {
        self.residuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residuals.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        self.residuals.iter().sum::<f64>() / self.residuals.len() as f64
    }

    /// Population standard deviation
    pub fn std(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        let m = self.mean();
        let var = self.residuals.iter().map(|r| (r - m).powi(2)).sum::<f64>()
            / self.residuals.len() as f64;
        var.sqrt()
    }

    pub fn mae(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        self.residuals.iter().map(|r| r.abs()).sum::<f64>() / self.residuals.len() as f64
    }

    pub fn rmse(&self) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        (self.residuals.iter().map(|r| r * r).sum::<f64>() / self.residuals.len() as f64).sqrt()
    }

    /// Share of residuals at or below `value`
    pub fn share_at_or_below(&self, value: f64) -> f64 {
        if self.residuals.is_empty() {
            return 0.0;
        }
        self.residuals.iter().filter(|&&r| r <= value).count() as f64 / self.residuals.len() as f64
    }

    pub fn histogram(&self, bins: usize) -> Histogram {
        if self.residuals.is_empty() || bins == 0 {
            return Histogram::default();
        }
        let min = self.residuals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.residuals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (lo, hi) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for &r in &self.residuals {
            let idx = (((r - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Histogram { edges, counts }
    }
}

/// In-sample quality of a fit
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub rows: usize,
    /// Share of rows where P(win) >= 0.5 matched the outcome
    pub accuracy: f64,
    pub brier_score: f64,
    pub margin_mae: f64,
    pub margin_rmse: f64,
    pub calibration_error: f64,
}

impl FitDiagnostics {
    pub fn compute(
        probs: &[f64],
        wins: &[f64],
        residuals: &ResidualDistribution,
        calibration: &CalibrationCurve,
    ) -> Self {
        let rows = probs.len().min(wins.len());
        if rows == 0 {
            return FitDiagnostics::default();
        }
        let correct = probs
            .iter()
            .zip(wins)
            .filter(|(p, y)| (**p >= 0.5) == (**y >= 0.5))
            .count();
        let brier = probs
            .iter()
            .zip(wins)
            .map(|(p, y)| (p - y).powi(2))
            .sum::<f64>()
            / rows as f64;

        FitDiagnostics {
            rows,
            accuracy: correct as f64 / rows as f64,
            brier_score: brier,
            margin_mae: residuals.mae(),
            margin_rmse: residuals.rmse(),
            calibration_error: calibration.expected_calibration_error(),
        }
    }
}

impl fmt::Display for FitDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rows: {} | Acc: {:.2}% | Brier: {:.4} | ECE: {:.4} | Margin MAE: {:.2} | RMSE: {:.2}",
            self.rows,
            self.accuracy * 100.0,
            self.brier_score,
            self.calibration_error,
            self.margin_mae,
            self.margin_rmse
        )
    }
}
