//! Fading stop sweeps beyond recent extremes.

use super::{BarContext, Strategy, StrategyError, params};
use crate::backtest::bars::Bar;
use crate::backtest::indicators::{Highest, Indicator, Lowest, PriceSource};
use crate::backtest::parallel::ParameterSet;
use crate::backtest::position::Side;

/// Buys when the low pierces the prior `liquidity_period` lowest low by more
/// than `buffer`, sells when the high pierces the prior highest high.
#[derive(Debug, Clone)]
pub struct LiquidityHunt {
    highest: Highest,
    lowest: Lowest,
    buffer: f64,
    prior_high: Option<f64>,
    prior_low: Option<f64>,
}

impl LiquidityHunt {
    /// Build from parameters, falling back to the strategy defaults.
    pub fn from_params(params: &ParameterSet) -> Result<Self, StrategyError> {
        let period = params::period(params, "liquidity_period", 10)?;
        Ok(Self {
            highest: Highest::new(period, PriceSource::High)?,
            lowest: Lowest::new(period, PriceSource::Low)?,
            buffer: params::non_negative(params, "buffer", 0.05)?,
            prior_high: None,
            prior_low: None,
        })
    }
}

impl Strategy for LiquidityHunt {
    fn name(&self) -> &'static str {
        "liquidity_hunt"
    }

    fn update(&mut self, bar: &Bar) {
        self.prior_high = self.highest.value();
        self.prior_low = self.lowest.value();
        self.highest.update(bar);
        self.lowest.update(bar);
    }

    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
        let (Some(high), Some(low)) = (self.prior_high, self.prior_low) else {
            return Ok(None);
        };

        if ctx.bar.low < low * (1.0 - self.buffer) {
            Ok(Some(Side::Long))
        } else if ctx.bar.high > high * (1.0 + self.buffer) {
            Ok(Some(Side::Short))
        } else {
            Ok(None)
        }
    }
}
