//! Long-only momentum scalp on volume surges.

use super::{BarContext, Strategy, StrategyError, params};
use crate::backtest::bars::Bar;
use crate::backtest::indicators::{Ema, Indicator, PriceSource, Rsi, Sma};
use crate::backtest::parallel::ParameterSet;
use crate::backtest::position::Side;

/// Buys when price is above both EMAs, RSI sits between 30 and 70 and
/// volume exceeds `volume_multiplier` times its average over the long EMA
/// window. Exits once price closes back under the short EMA.
#[derive(Debug, Clone)]
pub struct QuickFlip {
    ema_short: Ema,
    ema_long: Ema,
    rsi: Rsi,
    avg_volume: Sma,
    volume_multiplier: f64,
}

impl QuickFlip {
    /// Build from parameters, falling back to the strategy defaults.
    pub fn from_params(params: &ParameterSet) -> Result<Self, StrategyError> {
        let ema_long = params::period(params, "ema_long", 50)?;
        Ok(Self {
            ema_short: Ema::new(params::period(params, "ema_short", 21)?, PriceSource::Close)?,
            ema_long: Ema::new(ema_long, PriceSource::Close)?,
            rsi: Rsi::new(params::period(params, "rsi_period", 14)?)?,
            avg_volume: Sma::new(ema_long, PriceSource::Volume)?,
            volume_multiplier: params::positive(params, "volume_multiplier", 1.5)?,
        })
    }
}

impl Strategy for QuickFlip {
    fn name(&self) -> &'static str {
        "quick_flip"
    }

    fn update(&mut self, bar: &Bar) {
        self.ema_short.update(bar);
        self.ema_long.update(bar);
        self.rsi.update(bar);
        self.avg_volume.update(bar);
    }

    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
        let (Some(short), Some(long), Some(rsi), Some(avg_volume)) = (
            self.ema_short.value(),
            self.ema_long.value(),
            self.rsi.value(),
            self.avg_volume.value(),
        ) else {
            return Ok(None);
        };

        let bar = ctx.bar;
        let trend = bar.close > short && bar.close > long;
        let momentum = rsi > 30.0 && rsi < 70.0;
        let volume = bar.volume > self.volume_multiplier * avg_volume;

        Ok((trend && momentum && volume).then_some(Side::Long))
    }

    fn exit_signal(&self, ctx: &BarContext<'_>, side: Side) -> Result<bool, StrategyError> {
        Ok(side == Side::Long && self.ema_short.value().is_some_and(|ema| ctx.bar.close < ema))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::bars::test_support::series_from_closes;
    use crate::backtest::parallel::ParamValue;
    use crate::backtest::strategy::test_support::{entry_signals, exit_signals};

    fn params() -> ParameterSet {
        [
            ("ema_short", ParamValue::Int(2)),
            ("ema_long", ParamValue::Int(4)),
            ("rsi_period", ParamValue::Int(4)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_volume_surge_in_choppy_uptrend() {
        let closes = [100.0, 101.0, 100.2, 101.2, 100.4, 101.4, 100.6, 101.6];
        let series = series_from_closes(&closes);
        let mut bars = series.bars().to_vec();
        bars[7].volume = 5_000.0;

        let mut strategy = QuickFlip::from_params(&params()).unwrap();
        let signals = entry_signals(&mut strategy, &bars, None);
        assert_eq!(signals[7], Some(Side::Long));
        assert_eq!(signals[6], None);
    }

    #[test]
    fn test_exit_below_short_ema() {
        let series = series_from_closes(&[100.0, 101.0, 102.0, 95.0]);
        let mut strategy = QuickFlip::from_params(&params()).unwrap();
        let exits = exit_signals(&mut strategy, series.bars(), Side::Long);
        assert_eq!(exits, vec![false, false, false, true]);
    }
}
