//! Fit the win classifier and margin regressor over the labelled history

use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use crate::features::{FeatureVector, LabeledDataset, OUTCOME_MARGIN, OUTCOME_WIN};
use crate::model::{MarginRegressor, WinClassifier};
use crate::training::linear_trainer::{LinearTrainer, Objective};
use crate::training::metrics::{CalibrationCurve, FitDiagnostics, ResidualDistribution};
use crate::{HoopsError, Result, TrainingConfig};

/// Both fitted models, frozen after training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub feature_columns: Vec<String>,
    pub classifier: WinClassifier,
    pub regressor: MarginRegressor,
}

impl TrainedModel {
    pub fn win_probability(&self, features: &FeatureVector) -> f64 {
        self.classifier.predict_proba(&features.values)
    }

    pub fn predicted_margin(&self, features: &FeatureVector) -> f64 {
        self.regressor.predict(&features.values)
    }
}

/// Everything produced by one training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub calibration: CalibrationCurve,
    pub residuals: ResidualDistribution,
    pub diagnostics: FitDiagnostics,
}

pub struct Trainer<B: AutodiffBackend> {
    config: TrainingConfig,
    device: B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(config: TrainingConfig, device: B::Device) -> Self {
        Trainer { config, device }
    }

    /// Train on every labelled row; no hold-out.
    ///
    /// Calibration and residuals are computed in-sample for reporting only.
    pub fn train(&self, dataset: &LabeledDataset) -> Result<TrainingOutcome> {
        if dataset.is_empty() {
            return Err(HoopsError::Training("No labelled rows to train on".into()));
        }
        let dim = dataset.feature_dim();
        if dim == 0 {
            return Err(HoopsError::Training("No numeric feature columns".into()));
        }
        check_not_constant(dataset.wins(), OUTCOME_WIN)?;
        check_not_constant(dataset.margins(), OUTCOME_MARGIN)?;

        log::info!(
            "Training on {} rows x {} features ({} epochs, lr={})",
            dataset.len(),
            dim,
            self.config.epochs,
            self.config.learning_rate
        );

        let matrix = dataset.design_matrix();

        let classifier = LinearTrainer::<B>::new(
            self.device.clone(),
            self.config.epochs,
            self.config.learning_rate,
        )
        .with_l2_penalty(self.config.l2_penalty)
        .fit(&matrix, dim, dataset.wins(), Objective::Logistic)
        .map(WinClassifier::new)?;

        let regressor = LinearTrainer::<B>::new(
            self.device.clone(),
            self.config.epochs,
            self.config.learning_rate,
        )
        .fit(&matrix, dim, dataset.margins(), Objective::SquaredError)
        .map(MarginRegressor::new)?;

        let probs: Vec<f64> = matrix
            .chunks(dim)
            .map(|row| classifier.predict_proba(row))
            .collect();
        let predicted_margins: Vec<f64> =
            matrix.chunks(dim).map(|row| regressor.predict(row)).collect();

        let calibration =
            CalibrationCurve::compute(&probs, dataset.wins(), self.config.calibration_bins);
        let residuals = ResidualDistribution::from_predictions(dataset.margins(), &predicted_margins);
        let diagnostics = FitDiagnostics::compute(&probs, dataset.wins(), &residuals, &calibration);

        log::info!("{}", diagnostics);

        Ok(TrainingOutcome {
            model: TrainedModel {
                feature_columns: dataset.feature_columns().to_vec(),
                classifier,
                regressor,
            },
            calibration,
            residuals,
            diagnostics,
        })
    }
}

fn check_not_constant(values: &[f64], column: &str) -> Result<()> {
    match values.first() {
        Some(first) if values.iter().any(|v| v != first) => Ok(()),
        _ => Err(HoopsError::DegenerateTarget {
            column: column.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::{Table, Value};
    use crate::ColumnConfig;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray<f32>>;

    fn columns() -> ColumnConfig {
        ColumnConfig {
            team_score: "TeamScore".into(),
            opponent_score: "OpponentScore".into(),
        }
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            epochs: 300,
            ..TrainingConfig::default()
        }
    }

    fn dataset(rows: &[(f64, f64, f64, &str)]) -> LabeledDataset {
        let master = Table::from_rows(
            vec![
                "TeamScore".into(),
                "OpponentScore".into(),
                "FG".into(),
                "Team".into(),
            ],
            rows.iter()
                .map(|(tm, opp, fg, team)| {
                    vec![
                        Value::Number(*tm),
                        Value::Number(*opp),
                        Value::Number(*fg),
                        Value::Text(team.to_string()),
                    ]
                })
                .collect(),
        )
        .unwrap();
        LabeledDataset::from_master(&master, "Team", &columns()).unwrap()
    }

    #[test]
    fn test_train_produces_diagnostics() {
        let data = dataset(&[
            (110.0, 100.0, 42.0, "A"),
            (95.0, 101.0, 35.0, "A"),
            (120.0, 99.0, 45.0, "B"),
            (88.0, 107.0, 33.0, "B"),
            (104.0, 98.0, 40.0, "C"),
            (97.0, 112.0, 36.0, "C"),
        ]);
        let trainer = Trainer::<TestBackend>::new(config(), Default::default());
        let outcome = trainer.train(&data).unwrap();

        assert_eq!(outcome.model.feature_columns, data.feature_columns());
        assert!(outcome.calibration.len() <= 10);
        assert_eq!(
            outcome.calibration.bins.iter().map(|b| b.count).sum::<usize>(),
            data.len()
        );
        assert_eq!(outcome.residuals.len(), data.len());
        assert_eq!(outcome.diagnostics.rows, data.len());
        assert!(outcome.diagnostics.accuracy >= 0.5);
    }

    #[test]
    fn test_constant_win_column_is_degenerate() {
        let data = dataset(&[
            (110.0, 100.0, 42.0, "A"),
            (120.0, 99.0, 45.0, "B"),
            (104.0, 98.0, 40.0, "C"),
        ]);
        let trainer = Trainer::<TestBackend>::new(config(), Default::default());
        match trainer.train(&data) {
            Err(HoopsError::DegenerateTarget { column }) => assert_eq!(column, OUTCOME_WIN),
            other => panic!("expected DegenerateTarget, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_constant_margin_column_is_degenerate() {
        assert!(matches!(
            check_not_constant(&[5.0, 5.0], OUTCOME_MARGIN),
            Err(HoopsError::DegenerateTarget { .. })
        ));
        assert!(check_not_constant(&[5.0, -5.0], OUTCOME_MARGIN).is_ok());
    }

    #[test]
    fn test_empty_dataset_fails() {
        let data = dataset(&[]);
        let trainer = Trainer::<TestBackend>::new(config(), Default::default());
        assert!(matches!(trainer.train(&data), Err(HoopsError::Training(_))));
    }
}
