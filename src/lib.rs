//! Season win-probability and margin prediction from per-team game logs
//!
//! Raw team exports are normalized into tables, unified into one master
//! dataset, and used to fit a logistic win model and a linear margin model
//! once. Predictions for any pair of teams are then served from an immutable
//! context.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of one team's source table within the master dataset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(name: &str) -> Self {
        EntityId(name.to_string())
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum HoopsError {
    #[error("No header line starting with '{marker}' found in export")]
    HeaderNotFound { marker: String },

    #[error("No data: {0}")]
    NoData(String),

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Outcome column {column} is constant; cannot fit a model")]
    DegenerateTarget { column: String },

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, HoopsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub ingest: IngestConfig,
    pub columns: ColumnConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    /// Table the unified dataset is written to
    pub master_table: String,
    /// Column tagging each master row with its source table
    pub entity_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Leading tokens of the real header row
    pub header_marker: String,
    pub delimiter: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub team_score: String,
    pub opponent_score: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 penalty on classifier weights
    pub l2_penalty: f64,
    pub calibration_bins: usize,
    pub histogram_bins: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/nba_25.db".to_string(),
            master_table: "TeamStats_AllTeams".to_string(),
            entity_column: "Team".to_string(),
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            header_marker: data::normalize::DEFAULT_HEADER_MARKER.to_string(),
            delimiter: ',',
        }
    }
}

impl IngestConfig {
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(HoopsError::Config(format!(
                "Delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )))
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        // The second "Opp" column of a game log holds opponent points
        ColumnConfig {
            team_score: "Tm".to_string(),
            opponent_score: "Opp_1".to_string(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 1500,
            learning_rate: 0.05,
            l2_penalty: 1e-3,
            calibration_bins: 10,
            histogram_bins: 30,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HoopsError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| HoopsError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HoopsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.training;
        if t.epochs == 0 {
            return Err(HoopsError::Config("training.epochs must be > 0".into()));
        }
        if t.learning_rate.is_nan() || t.learning_rate <= 0.0 {
            return Err(HoopsError::Config("training.learning_rate must be > 0".into()));
        }
        if t.l2_penalty < 0.0 {
            return Err(HoopsError::Config("training.l2_penalty must be >= 0".into()));
        }
        if t.calibration_bins == 0 || t.histogram_bins == 0 {
            return Err(HoopsError::Config("bin counts must be > 0".into()));
        }
        self.ingest.delimiter_byte()?;
        for (key, value) in [
            ("data.master_table", &self.data.master_table),
            ("data.entity_column", &self.data.entity_column),
            ("columns.team_score", &self.columns.team_score),
            ("columns.opponent_score", &self.columns.opponent_score),
            ("ingest.header_marker", &self.ingest.header_marker),
        ] {
            if value.trim().is_empty() {
                return Err(HoopsError::Config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.data.master_table, "TeamStats_AllTeams");
        assert_eq!(parsed.ingest.delimiter, ',');
        assert_eq!(parsed.training.calibration_bins, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.training.epochs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ingest.delimiter = 'é';
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.columns.team_score = " ".into();
        assert!(config.validate().is_err());
    }
}
