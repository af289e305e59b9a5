//! Team-level aggregates over the labelled history
//!
//! Season-average feature vectors for inference, and the headline summary
//! (games played, win percentage, points for/against, margin) per team.

use crate::features::targets::LabeledDataset;
use serde::Serialize;
use std::collections::HashMap;

/// Averaged numeric profile of one team, keyed by feature column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// All-zero vector over `columns`
    pub fn zeros(columns: &[String]) -> Self {
        FeatureVector {
            columns: columns.to_vec(),
            values: vec![0.0; columns.len()],
        }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

/// Headline season numbers for one team
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TeamSummary {
    pub games_played: usize,
    /// Share of games won (0-1)
    pub win_pct: f64,
    pub avg_points_for: f64,
    pub avg_points_against: f64,
    pub avg_margin: f64,
}

/// Per-team views over a labelled dataset.
///
/// Only the row index is built up front; averages are computed per request.
#[derive(Debug, Clone)]
pub struct TeamAggregator {
    rows_by_team: HashMap<String, Vec<usize>>,
}

impl TeamAggregator {
    pub fn new(dataset: &LabeledDataset) -> Self {
        let mut rows_by_team: HashMap<String, Vec<usize>> = HashMap::new();
        for (row, team) in dataset.entities().iter().enumerate() {
            rows_by_team.entry(team.clone()).or_default().push(row);
        }
        TeamAggregator { rows_by_team }
    }

    pub fn contains(&self, team: &str) -> bool {
        self.rows_by_team.contains_key(team)
    }

    /// Number of labelled games for a team
    pub fn games(&self, team: &str) -> usize {
        self.rows_by_team.get(team).map(Vec::len).unwrap_or(0)
    }

    /// Mean of every feature column over the team's rows.
    ///
    /// Missing cells are skipped; a column never observed averages to zero.
    /// An unknown team gets an all-zero vector of full width.
    pub fn feature_vector(&self, dataset: &LabeledDataset, team: &str) -> FeatureVector {
        let rows = match self.rows_by_team.get(team) {
            Some(rows) => rows,
            None => {
                log::warn!("No rows for team '{}'; using zero feature vector", team);
                return FeatureVector::zeros(dataset.feature_columns());
            }
        };

        let dim = dataset.feature_dim();
        let mut sums = vec![0.0f64; dim];
        let mut counts = vec![0usize; dim];
        for &row in rows {
            for (col, value) in dataset.observed_row(row).iter().enumerate() {
                if let Some(v) = value {
                    sums[col] += v;
                    counts[col] += 1;
                }
            }
        }

        let values = sums
            .iter()
            .zip(&counts)
            .map(|(sum, &count)| if count == 0 { 0.0 } else { sum / count as f64 })
            .collect();

        FeatureVector {
            columns: dataset.feature_columns().to_vec(),
            values,
        }
    }

    /// Games played, win percentage and scoring averages; zeros for an unknown team
    pub fn summary(&self, dataset: &LabeledDataset, team: &str) -> TeamSummary {
        let rows = match self.rows_by_team.get(team) {
            Some(rows) if !rows.is_empty() => rows,
            _ => return TeamSummary::default(),
        };

        let n = rows.len() as f64;
        let mean = |values: &[f64]| rows.iter().map(|&r| values[r]).sum::<f64>() / n;

        TeamSummary {
            games_played: rows.len(),
            win_pct: mean(dataset.wins()),
            avg_points_for: mean(dataset.points_for()),
            avg_points_against: mean(dataset.points_against()),
            avg_margin: mean(dataset.margins()),
        }
    }
}
