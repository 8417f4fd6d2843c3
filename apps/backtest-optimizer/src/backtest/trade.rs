//! Closed trade records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::position::Side;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Holding time limit reached.
    MaxHoldTime,
    /// Close crossed the profit target.
    TakeProfit,
    /// Close crossed the fixed stop.
    StopLoss,
    /// Close crossed the trailing stop.
    TrailingStop,
    /// Strategy reversal signal.
    Signal,
    /// Series ended with the position still open.
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MaxHoldTime => "max_hold_time",
            Self::TakeProfit => "take_profit",
            Self::StopLoss => "stop_loss",
            Self::TrailingStop => "trailing_stop",
            Self::Signal => "signal",
            Self::EndOfData => "end_of_data",
        };
        f.write_str(name)
    }
}

/// Immutable record of a closed position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Direction.
    pub side: Side,
    /// Units traded.
    pub size: f64,
    /// Entry fill price.
    pub entry_price: f64,
    /// Exit fill price.
    pub exit_price: f64,
    /// Bar index of the entry.
    pub entry_index: usize,
    /// Bar index of the exit, always after the entry.
    pub exit_index: usize,
    /// Entry bar timestamp.
    pub entry_time: DateTime<Utc>,
    /// Exit bar timestamp.
    pub exit_time: DateTime<Utc>,
    /// Net P&L after commission on both legs.
    pub pnl: f64,
    /// Commission paid on both legs.
    pub commission: f64,
    /// Why the trade closed.
    pub exit_reason: ExitReason,
}

impl Trade {
    /// P&L before commission.
    #[must_use]
    pub fn gross_pnl(&self) -> f64 {
        self.pnl + self.commission
    }

    /// Holding period in bars.
    #[must_use]
    pub const fn duration_bars(&self) -> usize {
        self.exit_index - self.entry_index
    }

    /// Net P&L is strictly positive.
    #[must_use]
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    /// Net P&L is strictly negative.
    #[must_use]
    pub fn is_loser(&self) -> bool {
        self.pnl < 0.0
    }
}
