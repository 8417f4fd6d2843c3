//! Strategy predicates and the static strategy registry.
//!
//! A strategy only decides *whether* to enter or exit. Sizing, stops,
//! cooldowns and holding limits belong to the engine, so every strategy gets
//! the same risk handling.
//!
//! Strategies are selected by [`StrategyKind`], a closed set of named
//! variants built from a [`ParameterSet`]. Missing parameters fall back to
//! each strategy's defaults; malformed ones are a per-run error.

mod darvas_box;
mod fibonacci_retracement;
mod liquidity_hunt;
mod moving_average_cross;
mod multi_layer;
pub(crate) mod params;
mod quick_flip;
mod sideways_range;
mod spot_day_trading;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bars::Bar;
use super::indicators::IndicatorError;
use super::parallel::ParameterSet;
use super::position::Side;

pub use darvas_box::DarvasBox;
pub use fibonacci_retracement::{FIB_LEVELS, FibonacciRetracement};
pub use liquidity_hunt::LiquidityHunt;
pub use moving_average_cross::MovingAverageCross;
pub use multi_layer::MultiLayer;
pub use quick_flip::QuickFlip;
pub use sideways_range::SidewaysRange;
pub use spot_day_trading::SpotDayTrading;

/// Errors raised while building or evaluating a strategy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StrategyError {
    /// A parameter has the wrong type or is out of range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An indicator could not be constructed.
    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    /// The predicate failed on the data it was given.
    #[error("Strategy evaluation failed: {0}")]
    Evaluation(String),
}

impl StrategyError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// What a strategy sees when deciding on a bar.
///
/// `history` ends at the current bar; later bars are never visible.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    /// Index of the current bar within the run's series.
    pub index: usize,
    /// The current bar.
    pub bar: &'a Bar,
    /// All bars up to and including the current one.
    pub history: &'a [Bar],
    /// Engine ATR, once warmed up.
    pub atr: Option<f64>,
}

impl BarContext<'_> {
    /// The bar before the current one.
    #[must_use]
    pub fn previous(&self) -> Option<&Bar> {
        self.index
            .checked_sub(1)
            .and_then(|i| self.history.get(i))
    }
}

/// Entry and exit predicates over incrementally updated indicators.
pub trait Strategy: Send {
    /// Registry name of the strategy.
    fn name(&self) -> &'static str;

    /// Feed the next bar to the strategy's indicators. Called exactly once
    /// per bar, before any signal is requested for that bar.
    fn update(&mut self, bar: &Bar);

    /// Side to enter on the current bar, if any.
    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError>;

    /// Whether an open position on `side` should close on a reversal signal.
    fn exit_signal(&self, _ctx: &BarContext<'_>, _side: Side) -> Result<bool, StrategyError> {
        Ok(false)
    }
}

/// Registry of available strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// EMA trend + RSI + MACD momentum with volume and volatility filters.
    SpotDayTrading,
    /// Long-only EMA trend with RSI band and volume surge.
    QuickFlip,
    /// Short/long SMA crossover (golden cross).
    MovingAverageCross,
    /// Breakout of the prior high/low box with an SMA trend filter.
    DarvasBox,
    /// VWAP trend, engulfing candle, volume and repeated-level confirmation.
    MultiLayer,
    /// Mean reversion from a band around an SMA.
    SidewaysRange,
    /// Fade sweeps beyond the prior high/low.
    LiquidityHunt,
    /// Entries at Fibonacci retracements of the recent range, with the SMA trend.
    FibonacciRetracement,
}

impl StrategyKind {
    /// All registered strategies.
    pub const ALL: [Self; 8] = [
        Self::SpotDayTrading,
        Self::QuickFlip,
        Self::MovingAverageCross,
        Self::DarvasBox,
        Self::MultiLayer,
        Self::SidewaysRange,
        Self::LiquidityHunt,
        Self::FibonacciRetracement,
    ];

    /// Registry name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SpotDayTrading => "spot_day_trading",
            Self::QuickFlip => "quick_flip",
            Self::MovingAverageCross => "moving_average_cross",
            Self::DarvasBox => "darvas_box",
            Self::MultiLayer => "multi_layer",
            Self::SidewaysRange => "sideways_range",
            Self::LiquidityHunt => "liquidity_hunt",
            Self::FibonacciRetracement => "fibonacci_retracement",
        }
    }

    /// Construct a fresh strategy instance for one run.
    pub fn build(self, params: &ParameterSet) -> Result<Box<dyn Strategy>, StrategyError> {
        Ok(match self {
            Self::SpotDayTrading => Box::new(SpotDayTrading::from_params(params)?),
            Self::QuickFlip => Box::new(QuickFlip::from_params(params)?),
            Self::MovingAverageCross => Box::new(MovingAverageCross::from_params(params)?),
            Self::DarvasBox => Box::new(DarvasBox::from_params(params)?),
            Self::MultiLayer => Box::new(MultiLayer::from_params(params)?),
            Self::SidewaysRange => Box::new(SidewaysRange::from_params(params)?),
            Self::LiquidityHunt => Box::new(LiquidityHunt::from_params(params)?),
            Self::FibonacciRetracement => Box::new(FibonacciRetracement::from_params(params)?),
        })
    }
}

/// Builds a fresh [`Strategy`] for each run of a sweep.
///
/// [`StrategyKind`] is the registry implementation; embedders can supply
/// their own strategies by implementing this for a type of theirs.
pub trait StrategyFactory: Sync {
    /// Name reported in logs and sweep outcomes.
    fn name(&self) -> &str;

    /// Construct a strategy instance for one parameter set.
    fn build(&self, params: &ParameterSet) -> Result<Box<dyn Strategy>, StrategyError>;
}

impl StrategyFactory for StrategyKind {
    fn name(&self) -> &str {
        Self::name(*self)
    }

    fn build(&self, params: &ParameterSet) -> Result<Box<dyn Strategy>, StrategyError> {
        Self::build(*self, params)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}


#[cfg(test)]
pub(crate) mod test_support {
    use super::{BarContext, Strategy};
    use crate::backtest::bars::Bar;
    use crate::backtest::position::Side;

    /// Feed every bar and collect the entry signal after each one.
    pub fn entry_signals(strategy: &mut dyn Strategy, bars: &[Bar], atr: Option<f64>) -> Vec<Option<Side>> {
        bars.iter()
            .enumerate()
            .map(|(index, bar)| {
                strategy.update(bar);
                let ctx = BarContext {
                    index,
                    bar,
                    history: &bars[..=index],
                    atr,
                };
                strategy.entry_signal(&ctx).unwrap()
            })
            .collect()
    }

    /// Feed every bar and collect the exit signal for `side` after each one.
    pub fn exit_signals(strategy: &mut dyn Strategy, bars: &[Bar], side: Side) -> Vec<bool> {
        bars.iter()
            .enumerate()
            .map(|(index, bar)| {
                strategy.update(bar);
                let ctx = BarContext {
                    index,
                    bar,
                    history: &bars[..=index],
                    atr: None,
                };
                strategy.exit_signal(&ctx, side).unwrap()
            })
            .collect()
    }
}
