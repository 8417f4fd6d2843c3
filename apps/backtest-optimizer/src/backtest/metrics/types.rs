//! Metrics report and the keys used to rank it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Gross profit over gross loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    /// Finite ratio; 0 when there were no winning proceeds.
    Value(f64),
    /// Winning proceeds with no losing proceeds.
    Infinite,
}

impl ProfitFactor {
    /// Ratio as a float, `f64::INFINITY` for the sentinel.
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        match self {
            Self::Value(v) => v,
            Self::Infinite => f64::INFINITY,
        }
    }

    /// True for the infinite sentinel.
    #[must_use]
    pub const fn is_infinite(self) -> bool {
        matches!(self, Self::Infinite)
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::Infinite => f.write_str("inf"),
        }
    }
}

/// Read-only summary of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    // Account
    /// Starting equity.
    pub initial_value: f64,
    /// Equity after the last bar.
    pub final_value: f64,
    /// `(final - initial) / initial`.
    pub total_return: f64,

    // Trade statistics
    /// Winning plus losing trades; breakeven trades are excluded.
    pub total_trades: u64,
    /// Trades with positive net pnl.
    pub winning_trades: u64,
    /// Trades with negative net pnl.
    pub losing_trades: u64,
    /// Trades with exactly zero net pnl.
    pub breakeven_trades: u64,
    /// Winning share of `total_trades`, 0 to 100.
    pub win_rate: f64,
    /// Mean net pnl of winners.
    pub avg_gain: f64,
    /// Mean net loss of losers (positive).
    pub avg_loss: f64,
    /// Sum of winning pnl.
    pub gross_profit: f64,
    /// Sum of losing pnl (positive).
    pub gross_loss: f64,
    /// Gross profit over gross loss.
    pub profit_factor: ProfitFactor,
    /// Mean net pnl per counted trade.
    pub expectancy: f64,
    /// Longest run of winners.
    pub max_consecutive_wins: u64,
    /// Longest run of losers.
    pub max_consecutive_losses: u64,

    // Risk
    /// Largest peak-to-trough decline as a fraction in [0, 1].
    pub max_drawdown: f64,
    /// Bars from the peak to the trough that set `max_drawdown`.
    pub max_drawdown_duration: u64,
    /// Annualised Sharpe ratio.
    pub sharpe_ratio: Option<f64>,
    /// Annualised Sortino ratio.
    pub sortino_ratio: Option<f64>,
    /// Annualised standard deviation of per-bar returns.
    pub volatility: Option<f64>,

    // Costs and timing
    /// Mean bars held over all closed trades.
    pub avg_trade_duration: f64,
    /// Commission paid on both legs of every trade.
    pub total_commission: f64,
}

impl MetricsReport {
    /// Value of one metric, `None` when it is undefined.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn metric(&self, key: MetricKey) -> Option<f64> {
        let value = match key {
            MetricKey::InitialValue => self.initial_value,
            MetricKey::FinalValue => self.final_value,
            MetricKey::TotalReturn => self.total_return,
            MetricKey::TotalTrades => self.total_trades as f64,
            MetricKey::WinningTrades => self.winning_trades as f64,
            MetricKey::LosingTrades => self.losing_trades as f64,
            MetricKey::BreakevenTrades => self.breakeven_trades as f64,
            MetricKey::WinRate => self.win_rate,
            MetricKey::AvgGain => self.avg_gain,
            MetricKey::AvgLoss => self.avg_loss,
            MetricKey::GrossProfit => self.gross_profit,
            MetricKey::GrossLoss => self.gross_loss,
            MetricKey::ProfitFactor => self.profit_factor.as_f64(),
            MetricKey::Expectancy => self.expectancy,
            MetricKey::MaxConsecutiveWins => self.max_consecutive_wins as f64,
            MetricKey::MaxConsecutiveLosses => self.max_consecutive_losses as f64,
            MetricKey::MaxDrawdown => self.max_drawdown,
            MetricKey::MaxDrawdownDuration => self.max_drawdown_duration as f64,
            MetricKey::SharpeRatio => return self.sharpe_ratio,
            MetricKey::SortinoRatio => return self.sortino_ratio,
            MetricKey::Volatility => return self.volatility,
            MetricKey::AvgTradeDuration => self.avg_trade_duration,
            MetricKey::TotalCommission => self.total_commission,
        };
        Some(value)
    }
}

/// Names a [`MetricsReport`] field for ranking and tabulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKey {
    /// `initial_value`
    InitialValue,
    /// `final_value`
    FinalValue,
    /// `total_return`
    TotalReturn,
    /// `total_trades`
    TotalTrades,
    /// `winning_trades`
    WinningTrades,
    /// `losing_trades`
    LosingTrades,
    /// `breakeven_trades`
    BreakevenTrades,
    /// `win_rate`
    WinRate,
    /// `avg_gain`
    AvgGain,
    /// `avg_loss`
    AvgLoss,
    /// `gross_profit`
    GrossProfit,
    /// `gross_loss`
    GrossLoss,
    /// `profit_factor`
    ProfitFactor,
    /// `expectancy`
    Expectancy,
    /// `max_consecutive_wins`
    MaxConsecutiveWins,
    /// `max_consecutive_losses`
    MaxConsecutiveLosses,
    /// `max_drawdown`
    MaxDrawdown,
    /// `max_drawdown_duration`
    MaxDrawdownDuration,
    /// `sharpe_ratio`
    SharpeRatio,
    /// `sortino_ratio`
    SortinoRatio,
    /// `volatility`
    Volatility,
    /// `avg_trade_duration`
    AvgTradeDuration,
    /// `total_commission`
    TotalCommission,
}

impl MetricKey {
    /// Every key in report field order.
    pub const ALL: [Self; 23] = [
        Self::InitialValue,
        Self::FinalValue,
        Self::TotalReturn,
        Self::TotalTrades,
        Self::WinningTrades,
        Self::LosingTrades,
        Self::BreakevenTrades,
        Self::WinRate,
        Self::AvgGain,
        Self::AvgLoss,
        Self::GrossProfit,
        Self::GrossLoss,
        Self::ProfitFactor,
        Self::Expectancy,
        Self::MaxConsecutiveWins,
        Self::MaxConsecutiveLosses,
        Self::MaxDrawdown,
        Self::MaxDrawdownDuration,
        Self::SharpeRatio,
        Self::SortinoRatio,
        Self::Volatility,
        Self::AvgTradeDuration,
        Self::TotalCommission,
    ];

    /// Field name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::InitialValue => "initial_value",
            Self::FinalValue => "final_value",
            Self::TotalReturn => "total_return",
            Self::TotalTrades => "total_trades",
            Self::WinningTrades => "winning_trades",
            Self::LosingTrades => "losing_trades",
            Self::BreakevenTrades => "breakeven_trades",
            Self::WinRate => "win_rate",
            Self::AvgGain => "avg_gain",
            Self::AvgLoss => "avg_loss",
            Self::GrossProfit => "gross_profit",
            Self::GrossLoss => "gross_loss",
            Self::ProfitFactor => "profit_factor",
            Self::Expectancy => "expectancy",
            Self::MaxConsecutiveWins => "max_consecutive_wins",
            Self::MaxConsecutiveLosses => "max_consecutive_losses",
            Self::MaxDrawdown => "max_drawdown",
            Self::MaxDrawdownDuration => "max_drawdown_duration",
            Self::SharpeRatio => "sharpe_ratio",
            Self::SortinoRatio => "sortino_ratio",
            Self::Volatility => "volatility",
            Self::AvgTradeDuration => "avg_trade_duration",
            Self::TotalCommission => "total_commission",
        }
    }

    /// False for costs and risks, where smaller values rank first.
    #[must_use]
    pub const fn higher_is_better(self) -> bool {
        !matches!(
            self,
            Self::LosingTrades
                | Self::AvgLoss
                | Self::GrossLoss
                | Self::MaxConsecutiveLosses
                | Self::MaxDrawdown
                | Self::MaxDrawdownDuration
                | Self::Volatility
                | Self::TotalCommission
        )
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_factor_sentinel() {
        assert!(ProfitFactor::Infinite.is_infinite());
        assert_eq!(ProfitFactor::Infinite.as_f64(), f64::INFINITY);
        assert_eq!(ProfitFactor::Value(1.5).to_string(), "1.50");
        assert_eq!(ProfitFactor::Infinite.to_string(), "inf");
    }

    #[test]
    fn test_metric_key_names_match_serde() {
        for key in MetricKey::ALL {
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.name()));
        }
    }

    #[test]
    fn test_ranking_direction() {
        assert!(MetricKey::SharpeRatio.higher_is_better());
        assert!(!MetricKey::MaxDrawdown.higher_is_better());
    }
}
