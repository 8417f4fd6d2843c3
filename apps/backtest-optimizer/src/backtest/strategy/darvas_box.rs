//! Darvas box breakouts.

use super::{BarContext, Strategy, StrategyError, params};
use crate::backtest::bars::Bar;
use crate::backtest::indicators::{Highest, Indicator, Lowest, PriceSource, Sma};
use crate::backtest::parallel::ParameterSet;
use crate::backtest::position::Side;

/// Trades a close outside the box formed by the previous `box_period`
/// highs and lows, in the direction of the SMA trend.
#[derive(Debug, Clone)]
pub struct DarvasBox {
    highest: Highest,
    lowest: Lowest,
    sma: Sma,
    /// Box edges as of the previous bar.
    box_high: Option<f64>,
    box_low: Option<f64>,
}

impl DarvasBox {
    /// Build from parameters, falling back to the strategy defaults.
    pub fn from_params(params: &ParameterSet) -> Result<Self, StrategyError> {
        let box_period = params::period(params, "box_period", 20)?;
        Ok(Self {
            highest: Highest::new(box_period, PriceSource::High)?,
            lowest: Lowest::new(box_period, PriceSource::Low)?,
            sma: Sma::new(params::period(params, "sma_period", 50)?, PriceSource::Close)?,
            box_high: None,
            box_low: None,
        })
    }
}

impl Strategy for DarvasBox {
    fn name(&self) -> &'static str {
        "darvas_box"
    }

    fn update(&mut self, bar: &Bar) {
        self.box_high = self.highest.value();
        self.box_low = self.lowest.value();
        self.highest.update(bar);
        self.lowest.update(bar);
        self.sma.update(bar);
    }

    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
        let (Some(high), Some(low), Some(sma)) = (self.box_high, self.box_low, self.sma.value())
        else {
            return Ok(None);
        };

        let close = ctx.bar.close;
        if close > high && close > sma {
            Ok(Some(Side::Long))
        } else if close < low && close < sma {
            Ok(Some(Side::Short))
        } else {
            Ok(None)
        }
    }
}
