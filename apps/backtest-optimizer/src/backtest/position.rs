//! Open position state for a single simulation run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::ratchet_trailing_stop;
use super::trade::ExitReason;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Profits when price rises.
    Long,
    /// Profits when price falls.
    Short,
}

impl Side {
    /// `+1.0` for long, `-1.0` for short.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Long => 1.0,
            Self::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// The single open position of a run.
///
/// Stops are absolute price levels. For a long the stop sits below entry and
/// the target above; for a short the reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Direction.
    pub side: Side,
    /// Units held, strictly positive.
    pub size: f64,
    /// Fill price at entry.
    pub entry_price: f64,
    /// Bar index of the entry.
    pub entry_index: usize,
    /// Timestamp of the entry bar.
    pub entry_time: DateTime<Utc>,
    /// Fixed protective stop.
    pub stop_loss: f64,
    /// Fixed profit target.
    pub take_profit: f64,
    /// Trailing stop, only ever tightened.
    pub trailing_stop: f64,
    /// Commission paid on entry.
    pub entry_commission: f64,
}

impl Position {
    /// Tighten the trailing stop toward `close - k * atr` (mirrored for shorts).
    pub fn ratchet(&mut self, close: f64, atr: f64, k: f64) {
        self.trailing_stop = ratchet_trailing_stop(self.side, self.trailing_stop, close, atr, k);
    }

    /// Which price-based exit, if any, the close triggers.
    ///
    /// Target is checked before stops. A fixed stop hit takes precedence over
    /// the trailing stop since the trailing stop starts at the fixed stop and
    /// only tightens.
    #[must_use]
    pub fn price_exit(&self, close: f64) -> Option<ExitReason> {
        match self.side {
            Side::Long => {
                if close >= self.take_profit {
                    Some(ExitReason::TakeProfit)
                } else if close <= self.stop_loss {
                    Some(ExitReason::StopLoss)
                } else if close <= self.trailing_stop {
                    Some(ExitReason::TrailingStop)
                } else {
                    None
                }
            }
            Side::Short => {
                if close <= self.take_profit {
                    Some(ExitReason::TakeProfit)
                } else if close >= self.stop_loss {
                    Some(ExitReason::StopLoss)
                } else if close >= self.trailing_stop {
                    Some(ExitReason::TrailingStop)
                } else {
                    None
                }
            }
        }
    }

    /// Price move in the position's favour times size, before commission.
    #[must_use]
    pub fn gross_pnl(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) * self.size
    }

    /// Signed holding value at `price`: positive for longs, negative for shorts.
    #[must_use]
    pub fn market_value(&self, price: f64) -> f64 {
        self.side.sign() * self.size * price
    }
}
