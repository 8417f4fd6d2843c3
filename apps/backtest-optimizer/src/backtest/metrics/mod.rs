//! Performance metrics for completed runs.
//!
//! Trades are classified by net pnl: winners, losers and breakeven trades.
//! Breakeven trades are excluded from `total_trades` and the win rate. Risk
//! ratios are computed from per-bar returns of the equity curve and
//! annualised by the square root of the bars per year.

mod analyzer;
mod format;
mod math;
mod types;

pub use analyzer::PerformanceAnalyzer;
pub use format::{format_pct, format_profit_factor, format_ratio};
pub use types::{MetricKey, MetricsReport, ProfitFactor};
