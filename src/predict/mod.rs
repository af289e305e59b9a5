//! Prediction and inference
//!
//! Build the serving context once, then answer matchup queries from it.

pub mod context;
pub mod inference;

pub use context::ServiceContext;
pub use inference::{
    format_margin_placement, format_prediction, format_residual_histogram, MatchupPrediction,
    PredictionReport, Predictor, MARGIN_MARKER,
};
