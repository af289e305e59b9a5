//! Outcome labels and the numeric feature matrix
//!
//! `OutcomeWin` and `OutcomeMargin` are derived from the paired team/opponent
//! score columns. Every other numeric column of the master dataset is a
//! feature; absent feature values count as zero.

use crate::data::table::{Table, Value};
use crate::{ColumnConfig, HoopsError, Result};
use std::collections::BTreeSet;

/// 1.0 when the team outscored its opponent, else 0.0
pub const OUTCOME_WIN: &str = "OutcomeWin";
/// Team score minus opponent score
pub const OUTCOME_MARGIN: &str = "OutcomeMargin";

/// Add `OutcomeWin` and `OutcomeMargin` to `table`.
///
/// Rows where either score is missing or non-numeric get `Missing` outcomes.
pub fn derive_outcomes(table: &mut Table, columns: &ColumnConfig) -> Result<()> {
    let team_idx = table
        .column_index(&columns.team_score)
        .ok_or_else(|| HoopsError::MissingColumn(columns.team_score.clone()))?;
    let opp_idx = table
        .column_index(&columns.opponent_score)
        .ok_or_else(|| HoopsError::MissingColumn(columns.opponent_score.clone()))?;

    let scores = move |row: &[Value]| match (row[team_idx].as_f64(), row[opp_idx].as_f64()) {
        (Some(team), Some(opp)) => Some((team, opp)),
        _ => None,
    };

    table.set_column_with(OUTCOME_WIN, |row| match scores(row) {
        Some((team, opp)) => Value::Number(if team > opp { 1.0 } else { 0.0 }),
        None => Value::Missing,
    });
    table.set_column_with(OUTCOME_MARGIN, |row| match scores(row) {
        Some((team, opp)) => Value::Number(team - opp),
        None => Value::Missing,
    });
    Ok(())
}

/// Every numeric column except the outcome labels
pub fn feature_columns(table: &Table) -> Vec<String> {
    table
        .numeric_columns()
        .into_iter()
        .filter(|c| c != OUTCOME_WIN && c != OUTCOME_MARGIN)
        .collect()
}

/// Labelled historical rows: the training snapshot shared by the trainer and
/// the per-team aggregator
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    feature_columns: Vec<String>,
    entities: Vec<String>,
    /// Raw feature cells; `None` where the source had no numeric value
    observed: Vec<Vec<Option<f64>>>,
    wins: Vec<f64>,
    margins: Vec<f64>,
    points_for: Vec<f64>,
    points_against: Vec<f64>,
}

impl LabeledDataset {
    /// Derive labels and features from the master dataset.
    ///
    /// Rows that cannot be labelled (a missing score) are left out.
    pub fn from_master(master: &Table, entity_column: &str, columns: &ColumnConfig) -> Result<Self> {
        let mut table = master.clone();
        derive_outcomes(&mut table, columns)?;

        let entity_idx = table
            .column_index(entity_column)
            .ok_or_else(|| HoopsError::MissingColumn(entity_column.to_string()))?;
        let feature_columns = feature_columns(&table);
        let feature_idx: Vec<usize> = feature_columns
            .iter()
            .filter_map(|c| table.column_index(c))
            .collect();
        let idx = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| HoopsError::MissingColumn(name.to_string()))
        };
        let (win_idx, margin_idx) = (idx(OUTCOME_WIN)?, idx(OUTCOME_MARGIN)?);
        let (team_idx, opp_idx) = (idx(&columns.team_score)?, idx(&columns.opponent_score)?);

        let mut dataset = LabeledDataset {
            feature_columns,
            entities: Vec::with_capacity(table.len()),
            observed: Vec::with_capacity(table.len()),
            wins: Vec::with_capacity(table.len()),
            margins: Vec::with_capacity(table.len()),
            points_for: Vec::with_capacity(table.len()),
            points_against: Vec::with_capacity(table.len()),
        };

        let mut unlabelled = 0usize;
        for row in table.rows() {
            let (win, margin) = match (row[win_idx].as_f64(), row[margin_idx].as_f64()) {
                (Some(win), Some(margin)) => (win, margin),
                _ => {
                    unlabelled += 1;
                    continue;
                }
            };
            dataset.entities.push(row[entity_idx].to_string());
            dataset
                .observed
                .push(feature_idx.iter().map(|&i| row[i].as_f64()).collect());
            dataset.wins.push(win);
            dataset.margins.push(margin);
            // Labelled rows always carry both scores
            dataset.points_for.push(row[team_idx].as_f64().unwrap_or(0.0));
            dataset.points_against.push(row[opp_idx].as_f64().unwrap_or(0.0));
        }

        if unlabelled > 0 {
            log::info!("Excluded {} rows without both scores", unlabelled);
        }
        log::info!(
            "Labelled {} rows with {} feature columns",
            dataset.len(),
            dataset.feature_columns.len()
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.wins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wins.is_empty()
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_columns.len()
    }

    /// Entity of each row
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Distinct entities, sorted
    pub fn entity_names(&self) -> Vec<String> {
        self.entities
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn observed_row(&self, row: usize) -> &[Option<f64>] {
        &self.observed[row]
    }

    /// Row-major feature matrix with missing cells filled with zero
    pub fn design_matrix(&self) -> Vec<f64> {
        self.observed
            .iter()
            .flat_map(|row| row.iter().map(|v| v.unwrap_or(0.0)))
            .collect()
    }

    pub fn wins(&self) -> &[f64] {
        &self.wins
    }

    pub fn margins(&self) -> &[f64] {
        &self.margins
    }

    pub fn points_for(&self) -> &[f64] {
        &self.points_for
    }

    pub fn points_against(&self) -> &[f64] {
        &self.points_against
    }
}
