//! Reduces a run's trade history and equity curve into a [`MetricsReport`].

use crate::backtest::engine::EquityCurve;
use crate::backtest::trade::Trade;

use super::math::{downside_deviation, mean, period_returns, std_dev};
use super::types::{MetricsReport, ProfitFactor};

/// Annualisation used when no timeframe is supplied (daily bars).
const DEFAULT_PERIODS_PER_YEAR: f64 = 365.0;

/// Deterministic one-shot performance analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceAnalyzer {
    initial_equity: f64,
    periods_per_year: f64,
    risk_free_rate: f64,
}

#[derive(Debug, Default)]
struct TradeStats {
    winning: u64,
    losing: u64,
    breakeven: u64,
    gross_profit: f64,
    gross_loss: f64,
    max_consecutive_wins: u64,
    max_consecutive_losses: u64,
}

#[derive(Debug, Default, PartialEq)]
struct Drawdown {
    max: f64,
    duration: u64,
}

impl PerformanceAnalyzer {
    /// Create an analyzer for runs that start with `initial_equity`.
    #[must_use]
    pub const fn new(initial_equity: f64) -> Self {
        Self {
            initial_equity,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
            risk_free_rate: 0.0,
        }
    }

    /// Bars per year, used to annualise ratios.
    #[must_use]
    pub const fn with_periods_per_year(mut self, periods: f64) -> Self {
        self.periods_per_year = periods;
        self
    }

    /// Annual risk-free rate subtracted from returns.
    #[must_use]
    pub const fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Compute the report.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn analyze(&self, trades: &[Trade], equity: &EquityCurve) -> MetricsReport {
        let values: Vec<f64> = equity.values().collect();
        let final_value = values.last().copied().unwrap_or(self.initial_equity);
        let total_return = if self.initial_equity > 0.0 {
            (final_value - self.initial_equity) / self.initial_equity
        } else {
            0.0
        };

        let stats = trade_stats(trades);
        let total_trades = stats.winning + stats.losing;
        let win_rate = if total_trades > 0 {
            stats.winning as f64 / total_trades as f64 * 100.0
        } else {
            0.0
        };
        let avg_gain = ratio_or_zero(stats.gross_profit, stats.winning);
        let avg_loss = ratio_or_zero(stats.gross_loss, stats.losing);
        let expectancy = ratio_or_zero(stats.gross_profit - stats.gross_loss, total_trades);

        let profit_factor = if stats.gross_loss > 0.0 {
            ProfitFactor::Value(stats.gross_profit / stats.gross_loss)
        } else if stats.gross_profit > 0.0 {
            ProfitFactor::Infinite
        } else {
            ProfitFactor::Value(0.0)
        };

        let drawdown = max_drawdown(&values);
        let returns = period_returns(&values);
        let annualiser = self.periods_per_year.max(0.0).sqrt();

        let avg_trade_duration = if trades.is_empty() {
            0.0
        } else {
            trades.iter().map(|t| t.duration_bars() as f64).sum::<f64>() / trades.len() as f64
        };

        MetricsReport {
            initial_value: self.initial_equity,
            final_value,
            total_return,
            total_trades,
            winning_trades: stats.winning,
            losing_trades: stats.losing,
            breakeven_trades: stats.breakeven,
            win_rate,
            avg_gain,
            avg_loss,
            gross_profit: stats.gross_profit,
            gross_loss: stats.gross_loss,
            profit_factor,
            expectancy,
            max_consecutive_wins: stats.max_consecutive_wins,
            max_consecutive_losses: stats.max_consecutive_losses,
            max_drawdown: drawdown.max,
            max_drawdown_duration: drawdown.duration,
            sharpe_ratio: self.sharpe(&returns).map(|s| s * annualiser),
            sortino_ratio: self.sortino(&returns).map(|s| s * annualiser),
            volatility: std_dev(&returns).map(|s| s * annualiser),
            avg_trade_duration,
            total_commission: trades.iter().map(|t| t.commission).sum(),
        }
    }

    fn excess_returns(&self, returns: &[f64]) -> Vec<f64> {
        let per_bar = if self.periods_per_year > 0.0 {
            self.risk_free_rate / self.periods_per_year
        } else {
            0.0
        };
        returns.iter().map(|r| r - per_bar).collect()
    }

    fn sharpe(&self, returns: &[f64]) -> Option<f64> {
        let excess = self.excess_returns(returns);
        let std = std_dev(&excess)?;
        if std <= f64::EPSILON {
            return None;
        }
        Some(mean(&excess)? / std)
    }

    fn sortino(&self, returns: &[f64]) -> Option<f64> {
        let excess = self.excess_returns(returns);
        let downside = downside_deviation(&excess)?;
        if downside <= f64::EPSILON {
            return None;
        }
        Some(mean(&excess)? / downside)
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio_or_zero(sum: f64, count: u64) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn trade_stats(trades: &[Trade]) -> TradeStats {
    let mut stats = TradeStats::default();
    let mut wins = 0u64;
    let mut losses = 0u64;

    for trade in trades {
        if trade.is_winner() {
            stats.winning += 1;
            stats.gross_profit += trade.pnl;
            wins += 1;
            losses = 0;
        } else if trade.is_loser() {
            stats.losing += 1;
            stats.gross_loss += trade.pnl.abs();
            losses += 1;
            wins = 0;
        } else {
            stats.breakeven += 1;
            wins = 0;
            losses = 0;
        }
        stats.max_consecutive_wins = stats.max_consecutive_wins.max(wins);
        stats.max_consecutive_losses = stats.max_consecutive_losses.max(losses);
    }

    stats
}

fn max_drawdown(values: &[f64]) -> Drawdown {
    let Some(&first) = values.first() else {
        return Drawdown::default();
    };

    let mut peak = first;
    let mut peak_index = 0usize;
    let mut result = Drawdown::default();

    for (index, &value) in values.iter().enumerate() {
        if value > peak {
            peak = value;
            peak_index = index;
        } else if peak > 0.0 {
            let drawdown = ((peak - value) / peak).clamp(0.0, 1.0);
            if drawdown > result.max {
                result.max = drawdown;
                result.duration = (index - peak_index) as u64;
            }
        }
    }

    result
}
