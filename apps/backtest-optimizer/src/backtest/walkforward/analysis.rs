//! Overfitting analysis for out-of-sample results.

use super::types::{OutOfSampleResult, OverfittingSummary};

/// Relative Sharpe drop `(is - oos) / |is|`; `None` when either is undefined or `is` is zero.
#[must_use]
pub fn sharpe_degradation(in_sample: Option<f64>, out_of_sample: Option<f64>) -> Option<f64> {
    let is = in_sample?;
    let oos = out_of_sample?;
    if is == 0.0 {
        return None;
    }
    Some((is - oos) / is.abs())
}

#[allow(clippy::cast_precision_loss)]
fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Summarize overfitting across validated parameter sets.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(results: &[OutOfSampleResult], threshold: f64) -> OverfittingSummary {
    if results.is_empty() {
        return OverfittingSummary::default();
    }

    let validated = results.len();
    let overfit_count = results.iter().filter(|r| r.is_overfit(threshold)).count();

    let warning = (overfit_count > 0).then(|| {
        format!(
            "{overfit_count}/{validated} parameter sets show >{:.0}% Sharpe degradation",
            threshold * 100.0
        )
    });

    OverfittingSummary {
        validated,
        avg_in_sample_sharpe: average(results.iter().filter_map(|r| r.in_sample.sharpe_ratio)),
        avg_out_of_sample_sharpe: average(
            results.iter().filter_map(|r| r.out_of_sample.sharpe_ratio),
        ),
        avg_sharpe_degradation: average(results.iter().filter_map(|r| r.sharpe_degradation)),
        overfit_count,
        overfitting_score: overfit_count as f64 / validated as f64,
        warning,
    }
}
