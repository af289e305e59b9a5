//! Immutable serving state built once at startup

use chrono::{DateTime, Utc};

use crate::data::table::Table;
use crate::data::{TableStore, Unifier};
use crate::features::{FeatureVector, LabeledDataset, TeamAggregator, TeamSummary};
use crate::training::{
    CalibrationCurve, FitDiagnostics, Histogram, ResidualDistribution, TrainedModel, Trainer,
    TrainingBackend,
};
use crate::{Config, Result};

/// Dataset snapshot, fitted models and their diagnostics.
///
/// Holds only owned plain data, so one context can back any number of
/// concurrent predictions. A rebuild produces a new context.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    dataset: LabeledDataset,
    aggregator: TeamAggregator,
    model: TrainedModel,
    calibration: CalibrationCurve,
    residuals: ResidualDistribution,
    histogram: Histogram,
    diagnostics: FitDiagnostics,
    built_at: DateTime<Utc>,
}

impl ServiceContext {
    /// Unify every stored team table, then train on the result
    pub fn build<S: TableStore + ?Sized>(store: &mut S, config: &Config) -> Result<Self> {
        let unifier = Unifier::from_config(&config.data);
        let (master, summary) = unifier.unify(store)?;
        log::info!(
            "Master dataset '{}': {} rows from {} tables",
            unifier.master_table(),
            summary.total_rows,
            summary.combined.len()
        );
        Self::from_master(&master, config)
    }

    /// Train on an already unified master table
    pub fn from_master(master: &Table, config: &Config) -> Result<Self> {
        let dataset =
            LabeledDataset::from_master(master, &config.data.entity_column, &config.columns)?;
        let trainer = Trainer::<TrainingBackend>::new(config.training.clone(), Default::default());
        let outcome = trainer.train(&dataset)?;

        let histogram = outcome.residuals.histogram(config.training.histogram_bins);
        let aggregator = TeamAggregator::new(&dataset);

        Ok(ServiceContext {
            dataset,
            aggregator,
            model: outcome.model,
            calibration: outcome.calibration,
            residuals: outcome.residuals,
            histogram,
            diagnostics: outcome.diagnostics,
            built_at: Utc::now(),
        })
    }

    pub fn dataset(&self) -> &LabeledDataset {
        &self.dataset
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn calibration(&self) -> &CalibrationCurve {
        &self.calibration
    }

    pub fn residuals(&self) -> &ResidualDistribution {
        &self.residuals
    }

    /// Residual histogram with the configured bin count
    pub fn residual_histogram(&self) -> &Histogram {
        &self.histogram
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn contains(&self, team: &str) -> bool {
        self.aggregator.contains(team)
    }

    /// Team names present in the dataset, sorted
    pub fn teams(&self) -> Vec<String> {
        self.dataset.entity_names()
    }

    pub fn feature_vector(&self, team: &str) -> FeatureVector {
        self.aggregator.feature_vector(&self.dataset, team)
    }

    pub fn summary(&self, team: &str) -> TeamSummary {
        self.aggregator.summary(&self.dataset, team)
    }
}
