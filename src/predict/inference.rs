//! Matchup predictions served from a built context

use serde::Serialize;

use crate::predict::context::ServiceContext;
use crate::training::{CalibrationCurve, Histogram, ResidualDistribution};
use crate::EntityId;

/// Outcome estimate for team A against team B
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupPrediction {
    pub team_a: EntityId,
    pub team_b: EntityId,
    pub win_prob_a: f64,
    /// Always `1 - win_prob_a`
    pub win_prob_b: f64,
    /// Expected points margin for A
    pub predicted_margin_a: f64,
    pub team_a_found: bool,
    pub team_b_found: bool,
}

impl MatchupPrediction {
    /// Team with the higher win probability (A on a tie)
    pub fn favourite(&self) -> (&EntityId, f64) {
        if self.win_prob_a >= 0.5 {
            (&self.team_a, self.win_prob_a)
        } else {
            (&self.team_b, self.win_prob_b)
        }
    }
}

/// Prediction plus the fit diagnostics it should be read against
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport<'a> {
    #[serde(flatten)]
    pub prediction: MatchupPrediction,
    pub calibration: &'a CalibrationCurve,
    pub residuals: &'a ResidualDistribution,
}

/// Stateless view over a [`ServiceContext`]; cheap to create per request
#[derive(Debug, Clone, Copy)]
pub struct Predictor<'a> {
    context: &'a ServiceContext,
}

impl<'a> Predictor<'a> {
    pub fn new(context: &'a ServiceContext) -> Self {
        Predictor { context }
    }

    /// Evaluate both models on A's season-average features.
    ///
    /// B's features are not consulted: its probability is the complement of
    /// A's. An unknown team yields a zero feature vector, never an error.
    pub fn predict(&self, team_a: &str, team_b: &str) -> MatchupPrediction {
        let features = self.context.feature_vector(team_a);
        let model = self.context.model();
        let win_prob_a = model.win_probability(&features);

        MatchupPrediction {
            team_a: EntityId::from(team_a),
            team_b: EntityId::from(team_b),
            win_prob_a,
            win_prob_b: 1.0 - win_prob_a,
            predicted_margin_a: model.predicted_margin(&features),
            team_a_found: self.context.contains(team_a),
            team_b_found: self.context.contains(team_b),
        }
    }

    pub fn report(&self, team_a: &str, team_b: &str) -> PredictionReport<'a> {
        PredictionReport {
            prediction: self.predict(team_a, team_b),
            calibration: self.context.calibration(),
            residuals: self.context.residuals(),
        }
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &MatchupPrediction, residuals: &ResidualDistribution) -> String {
    let (winner, win_prob) = pred.favourite();
    let spread = residuals.std();
    let mut notes = String::new();
    for (team, found) in [(&pred.team_a, pred.team_a_found), (&pred.team_b, pred.team_b_found)] {
        if !found {
            notes.push_str(&format!("│  Note: no games found for {}\n", team));
        }
    }

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}
├─────────────────────────────────────────────────┤
│  Win probability:  {} {:.1}%  ({} {:.1}% / {} {:.1}%)
│  Predicted margin: {} {:+.1} (±{:.1})
{}└─────────────────────────────────────────────────┘
"#,
        pred.team_a,
        pred.team_b,
        winner,
        win_prob * 100.0,
        pred.team_a,
        pred.win_prob_a * 100.0,
        pred.team_b,
        pred.win_prob_b * 100.0,
        pred.team_a,
        pred.predicted_margin_a,
        spread,
        notes
    )
}

/// Suffix on the histogram row holding the predicted margin
pub const MARGIN_MARKER: &str = "◀ predicted margin";

/// One row per bin: range, count and a bar scaled to the fullest bin
pub fn format_residual_histogram(histogram: &Histogram, marked_bin: Option<usize>) -> String {
    let max = histogram.max_count().max(1);
    let mut out = String::new();
    for (i, (count, range)) in histogram
        .counts
        .iter()
        .zip(histogram.edges.windows(2))
        .enumerate()
    {
        let bar = "█".repeat(count * 40 / max);
        let marker = if marked_bin == Some(i) { MARGIN_MARKER } else { "" };
        out.push_str(&format!(
            "  {:>7.1} .. {:>7.1} {:>5} {:<40} {}\n",
            range[0], range[1], count, bar, marker
        ));
    }
    out
}

/// Residual histogram with the bin of `margin` marked
pub fn format_margin_placement(
    margin: f64,
    residuals: &ResidualDistribution,
    histogram: &Histogram,
) -> String {
    let bin = histogram.bin_of(margin);
    let mut out = format!("Margin residuals (actual - predicted) vs predicted margin {:+.1}\n", margin);
    out.push_str(&format_residual_histogram(histogram, bin));
    if bin.is_none() {
        out.push_str(&format!(
            "  Predicted margin {:+.1} lies outside the residual range\n",
            margin
        ));
    }
    out.push_str(&format!(
        "  {:.1}% of residuals at or below {:+.1}\n",
        residuals.share_at_or_below(margin) * 100.0,
        margin
    ));
    out
}
