//! Intraday trend-following with momentum confirmation.

use super::{BarContext, Strategy, StrategyError, params};
use crate::backtest::bars::Bar;
use crate::backtest::indicators::{Ema, Indicator, Macd, PriceSource, Rsi, Sma};
use crate::backtest::parallel::ParameterSet;
use crate::backtest::position::Side;

/// Enters with the trend when EMAs are stacked, RSI clears its floor and
/// MACD is above its signal on the right side of zero.
///
/// Bars with below-average volume, or (optionally) an ATR above
/// `max_atr_threshold`, are skipped. Exits are left to the engine's
/// target and trailing stop.
#[derive(Debug, Clone)]
pub struct SpotDayTrading {
    ema_short: Ema,
    ema_long: Ema,
    rsi: Rsi,
    macd: Macd,
    volume_sma: Sma,
    rsi_lower: f64,
    volatility_filter: bool,
    max_atr_threshold: f64,
}

impl SpotDayTrading {
    /// Build from parameters, falling back to the strategy defaults.
    pub fn from_params(params: &ParameterSet) -> Result<Self, StrategyError> {
        let rsi_lower = params::float(params, "rsi_lower", 30.0)?;
        if !(0.0..=100.0).contains(&rsi_lower) {
            return Err(StrategyError::invalid("rsi_lower", "must be within [0, 100]"));
        }

        Ok(Self {
            ema_short: Ema::new(params::period(params, "ema_short_period", 30)?, PriceSource::Close)?,
            ema_long: Ema::new(params::period(params, "ema_long_period", 75)?, PriceSource::Close)?,
            rsi: Rsi::new(params::period(params, "rsi_period", 14)?)?,
            macd: Macd::new(
                params::period(params, "macd_fast", 15)?,
                params::period(params, "macd_slow", 30)?,
                params::period(params, "macd_signal", 10)?,
            )?,
            volume_sma: Sma::new(
                params::period(params, "volume_filter_period", 20)?,
                PriceSource::Volume,
            )?,
            rsi_lower,
            volatility_filter: params::flag(params, "volatility_filter", true)?,
            max_atr_threshold: params::positive(params, "max_atr_threshold", 2.0)?,
        })
    }

    fn filters_pass(&self, ctx: &BarContext<'_>) -> bool {
        let Some(avg_volume) = self.volume_sma.value() else {
            return false;
        };
        if ctx.bar.volume < avg_volume {
            return false;
        }
        !(self.volatility_filter && ctx.atr.is_some_and(|atr| atr > self.max_atr_threshold))
    }
}

impl Strategy for SpotDayTrading {
    fn name(&self) -> &'static str {
        "spot_day_trading"
    }

    fn update(&mut self, bar: &Bar) {
        self.ema_short.update(bar);
        self.ema_long.update(bar);
        self.rsi.update(bar);
        self.macd.update(bar);
        self.volume_sma.update(bar);
    }

    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
        if !self.filters_pass(ctx) {
            return Ok(None);
        }

        let (Some(short), Some(long), Some(rsi), Some(macd)) = (
            self.ema_short.value(),
            self.ema_long.value(),
            self.rsi.value(),
            self.macd.value(),
        ) else {
            return Ok(None);
        };

        let close = ctx.bar.close;
        if close > short
            && short > long
            && rsi > self.rsi_lower
            && macd.macd > macd.signal
            && macd.macd > 0.0
        {
            Ok(Some(Side::Long))
        } else if close < short
            && short < long
            && rsi < 100.0 - self.rsi_lower
            && macd.macd < macd.signal
            && macd.macd < 0.0
        {
            Ok(Some(Side::Short))
        } else {
            Ok(None)
        }
    }
}
