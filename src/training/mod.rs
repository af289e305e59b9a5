//! Model training
//!
//! Burn-backed linear fits, the training run over a labelled dataset, and
//! fit diagnostics.

pub mod linear_trainer;
pub mod metrics;
pub mod trainer;

use burn::backend::{Autodiff, NdArray};

pub use linear_trainer::{LinearTrainer, Objective};
pub use metrics::{CalibrationBin, CalibrationCurve, FitDiagnostics, Histogram, ResidualDistribution};
pub use trainer::{TrainedModel, Trainer, TrainingOutcome};

/// CPU backend used for training
pub type TrainingBackend = Autodiff<NdArray<f32>>;
