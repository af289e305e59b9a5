//! Feature extraction
//!
//! Outcome labels, the numeric feature matrix, and per-team aggregates.

pub mod targets;
pub mod team_stats;

pub use targets::{LabeledDataset, OUTCOME_MARGIN, OUTCOME_WIN};
pub use team_stats::{FeatureVector, TeamAggregator, TeamSummary};
