//! Formatting utilities for metrics display.

use super::types::ProfitFactor;

/// Format a fraction as a percentage string.
#[must_use]
pub fn format_pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Format an optional ratio, `N/A` when undefined.
#[must_use]
pub fn format_ratio(value: Option<f64>) -> String {
    value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.2}"))
}

/// Format a profit factor, `∞` for the infinite sentinel.
#[must_use]
pub fn format_profit_factor(value: ProfitFactor) -> String {
    match value {
        ProfitFactor::Value(v) => format!("{v:.2}"),
        ProfitFactor::Infinite => "∞".to_string(),
    }
}
