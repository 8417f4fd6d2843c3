//! Incremental technical indicators.
//!
//! Every indicator is updated once per bar in O(1) amortized time and keeps
//! only a fixed-size window of history. Values are `None` until the
//! indicator has seen enough bars to warm up.
//!
//! # Example
//!
//! ```ignore
//! use backtest_optimizer::backtest::indicators::{Indicator, PriceSource, Sma};
//!
//! let mut sma = Sma::new(20, PriceSource::Close)?;
//! for bar in series.bars() {
//!     if let Some(value) = sma.update(bar) {
//!         // ...
//!     }
//! }
//! ```

mod moving_average;
mod oscillators;
mod ring;
mod volatility;
mod volume;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bars::Bar;

pub use moving_average::{Ema, Sma};
pub use oscillators::{Macd, MacdValue, Rsi};
pub use ring::RingBuffer;
pub use volatility::{Atr, Highest, Lowest};
pub use volume::Vwap;

/// Indicator construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    /// Window length of zero.
    #[error("{indicator} period must be at least 1")]
    ZeroPeriod {
        /// Indicator name.
        indicator: &'static str,
    },

    /// Window longer than any series the engine accepts.
    #[error("{indicator} period {period} exceeds the maximum of {max}")]
    PeriodTooLong {
        /// Indicator name.
        indicator: &'static str,
        /// Requested window.
        period: usize,
        /// Largest accepted window.
        max: usize,
    },
}

/// Largest indicator window, in bars.
pub const MAX_PERIOD: usize = 1_000_000;

/// A stateful indicator fed one bar at a time.
pub trait Indicator {
    /// Value produced per bar.
    type Output: Copy;

    /// Feed the next bar and return the updated value, if warmed up.
    fn update(&mut self, bar: &Bar) -> Option<Self::Output>;

    /// Most recent value, if warmed up.
    fn value(&self) -> Option<Self::Output>;
}

/// Which bar field an indicator reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Open price.
    Open,
    /// High price.
    High,
    /// Low price.
    Low,
    /// Close price.
    #[default]
    Close,
    /// Volume.
    Volume,
    /// `(high + low + close) / 3`.
    Typical,
}

impl PriceSource {
    /// Extract the field from a bar.
    #[must_use]
    pub fn of(self, bar: &Bar) -> f64 {
        match self {
            Self::Open => bar.open,
            Self::High => bar.high,
            Self::Low => bar.low,
            Self::Close => bar.close,
            Self::Volume => bar.volume,
            Self::Typical => bar.typical_price(),
        }
    }
}

pub(crate) const fn check_period(
    period: usize,
    indicator: &'static str,
) -> Result<usize, IndicatorError> {
    if period == 0 {
        Err(IndicatorError::ZeroPeriod { indicator })
    } else if period > MAX_PERIOD {
        Err(IndicatorError::PeriodTooLong {
            indicator,
            period,
            max: MAX_PERIOD,
        })
    } else {
        Ok(period)
    }
}
