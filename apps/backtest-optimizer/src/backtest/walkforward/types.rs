//! Configuration and result types for walk-forward validation.

use serde::{Deserialize, Serialize};

use crate::backtest::config::InvalidSetting;
use crate::backtest::metrics::MetricsReport;
use crate::backtest::parallel::ParameterSet;

use super::analysis::sharpe_degradation;

/// Walk-forward validation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Fraction of bars used for the sweep, in (0, 1).
    pub train_ratio: f64,
    /// Best in-sample parameter sets re-run on the test series.
    pub top_n: usize,
    /// Sharpe degradation above which a set is flagged as overfit (0.5 = 50% drop).
    pub overfitting_threshold: f64,
}

impl WalkForwardConfig {
    /// Check the settings that the splitter does not.
    ///
    /// # Errors
    ///
    /// Returns an error when `top_n` is zero or the threshold is not finite.
    pub fn validate(&self) -> Result<(), InvalidSetting> {
        if self.top_n == 0 {
            return Err(InvalidSetting::new("top_n", "must be greater than zero"));
        }
        if !self.overfitting_threshold.is_finite() {
            return Err(InvalidSetting::new("overfitting_threshold", "must be finite"));
        }
        Ok(())
    }
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_ratio: 0.7,
            top_n: 5,
            overfitting_threshold: 0.5,
        }
    }
}

/// In-sample and out-of-sample metrics for one selected parameter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutOfSampleResult {
    /// Parameters chosen on the train series.
    pub params: ParameterSet,
    /// Metrics on the train series.
    pub in_sample: MetricsReport,
    /// Metrics on the held-out test series.
    pub out_of_sample: MetricsReport,
    /// Relative Sharpe drop from train to test.
    pub sharpe_degradation: Option<f64>,
}

impl OutOfSampleResult {
    /// Pair the two reports and compute the degradation.
    #[must_use]
    pub fn new(params: ParameterSet, in_sample: MetricsReport, out_of_sample: MetricsReport) -> Self {
        let sharpe_degradation =
            sharpe_degradation(in_sample.sharpe_ratio, out_of_sample.sharpe_ratio);
        Self {
            params,
            in_sample,
            out_of_sample,
            sharpe_degradation,
        }
    }

    /// True when the degradation exceeds `threshold`.
    #[must_use]
    pub fn is_overfit(&self, threshold: f64) -> bool {
        self.sharpe_degradation.is_some_and(|d| d > threshold)
    }
}

/// Overfitting indicators across all validated parameter sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverfittingSummary {
    /// Parameter sets validated out of sample.
    pub validated: usize,
    /// Mean in-sample Sharpe.
    pub avg_in_sample_sharpe: Option<f64>,
    /// Mean out-of-sample Sharpe.
    pub avg_out_of_sample_sharpe: Option<f64>,
    /// Mean Sharpe degradation.
    pub avg_sharpe_degradation: Option<f64>,
    /// Sets whose degradation exceeds the threshold.
    pub overfit_count: usize,
    /// `overfit_count / validated` (0 = none, 1 = all).
    pub overfitting_score: f64,
    /// Human-readable warning when any set is overfit.
    pub warning: Option<String>,
}

/// Out-of-sample validation of the best in-sample parameter sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkForwardReport {
    /// Bars in the train series.
    pub train_bars: usize,
    /// Bars in the test series.
    pub test_bars: usize,
    /// One entry per validated parameter set, in in-sample rank order.
    pub results: Vec<OutOfSampleResult>,
    /// Validation runs that failed on the test series.
    pub failed: usize,
    /// Aggregate overfitting indicators.
    pub summary: OverfittingSummary,
}
