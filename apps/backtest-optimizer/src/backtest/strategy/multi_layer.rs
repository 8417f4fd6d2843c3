//! Layered confirmation: VWAP trend, engulfing candle, volume and a
//! repeatedly tested price level.

use super::{BarContext, Strategy, StrategyError, params};
use crate::backtest::bars::Bar;
use crate::backtest::indicators::{Indicator, PriceSource, Rsi, Sma, Vwap};
use crate::backtest::parallel::ParameterSet;
use crate::backtest::position::Side;

/// Enters only when every layer agrees:
///
/// 1. trend: close above VWAP is bullish, otherwise bearish
/// 2. pattern: an engulfing candle in the trend direction
/// 3. volume above its SMA
/// 4. at least `pattern_3_rule_period` bars that closed exactly at the
///    previous close (a level tested repeatedly)
/// 5. RSI below `rsi_oversold` for longs, above `rsi_overbought` for shorts
///
/// Positions exit when price crosses back through VWAP.
#[derive(Debug, Clone)]
pub struct MultiLayer {
    vwap: Vwap,
    volume_sma: Sma,
    rsi: Rsi,
    touches_required: usize,
    rsi_oversold: f64,
    rsi_overbought: f64,
    touches: usize,
    prev_close: Option<f64>,
}

impl MultiLayer {
    /// Build from parameters, falling back to the strategy defaults.
    pub fn from_params(params: &ParameterSet) -> Result<Self, StrategyError> {
        Ok(Self {
            vwap: Vwap::new(params::period(params, "vwap_period", 50)?)?,
            volume_sma: Sma::new(
                params::period(params, "volume_sma_period", 20)?,
                PriceSource::Volume,
            )?,
            rsi: Rsi::new(params::period(params, "rsi_period", 14)?)?,
            touches_required: params::count(params, "pattern_3_rule_period", 3)?,
            rsi_oversold: params::float(params, "rsi_oversold", 30.0)?,
            rsi_overbought: params::float(params, "rsi_overbought", 70.0)?,
            touches: 0,
            prev_close: None,
        })
    }
}

impl Strategy for MultiLayer {
    fn name(&self) -> &'static str {
        "multi_layer"
    }

    fn update(&mut self, bar: &Bar) {
        if self.prev_close == Some(bar.close) {
            self.touches += 1;
        }
        self.prev_close = Some(bar.close);

        self.vwap.update(bar);
        self.volume_sma.update(bar);
        self.rsi.update(bar);
    }

    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
        let (Some(vwap), Some(avg_volume), Some(rsi), Some(prev)) = (
            self.vwap.value(),
            self.volume_sma.value(),
            self.rsi.value(),
            ctx.previous(),
        ) else {
            return Ok(None);
        };

        let bar = ctx.bar;
        if bar.volume <= avg_volume || self.touches < self.touches_required {
            return Ok(None);
        }

        let bullish = bar.close > vwap;
        if bullish && bar.is_bullish() && prev.is_bearish() && rsi < self.rsi_oversold {
            Ok(Some(Side::Long))
        } else if !bullish && bar.is_bearish() && prev.is_bullish() && rsi > self.rsi_overbought {
            Ok(Some(Side::Short))
        } else {
            Ok(None)
        }
    }

    fn exit_signal(&self, ctx: &BarContext<'_>, side: Side) -> Result<bool, StrategyError> {
        let Some(vwap) = self.vwap.value() else {
            return Ok(false);
        };
        Ok(match side {
            Side::Long => ctx.bar.close < vwap,
            Side::Short => ctx.bar.close > vwap,
        })
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
            ("vwap_period", ParamValue::Int(3)),
            ("volume_sma_period", ParamValue::Int(3)),
            ("rsi_period", ParamValue::Int(3)),
            ("pattern_3_rule_period", ParamValue::Int(1)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_oversold_bullish_engulfing_above_vwap() {
        let series = series_from_closes(&[100.0, 100.0, 80.0, 78.0, 83.0]);
        let mut bars = series.bars().to_vec();
        bars[3].open = 80.0;
        bars[3].high = 80.5;
        bars[4].open = 79.0;
        bars[4].low = 78.5;
        bars[4].volume = 3_000.0;

        let mut strategy = MultiLayer::from_params(&params()).unwrap();
        let signals = entry_signals(&mut strategy, &bars, None);
        assert_eq!(signals[4], Some(Side::Long));
        assert!(signals[..4].iter().all(Option::is_none));
    }

    #[test]
    fn test_no_entry_without_touches() {
        let series = series_from_closes(&[100.0, 99.0, 80.0, 78.0, 83.0]);
        let mut bars = series.bars().to_vec();
        bars[3].open = 80.0;
        bars[3].high = 80.5;
        bars[4].open = 79.0;
        bars[4].low = 78.5;
        bars[4].volume = 3_000.0;

        let mut strategy = MultiLayer::from_params(&params()).unwrap();
        let signals = entry_signals(&mut strategy, &bars, None);
        assert!(signals.iter().all(Option::is_none));
    }

    #[test]
    fn test_long_exits_below_vwap() {
        let series = series_from_closes(&[100.0, 100.0, 100.0, 90.0]);
        let mut strategy = MultiLayer::from_params(&params()).unwrap();
        let exits = exit_signals(&mut strategy, series.bars(), Side::Long);
        assert_eq!(exits, vec![false, false, false, true]);
    }
}
