//! Range-bound mean reversion.

use super::{BarContext, Strategy, StrategyError, params};
use crate::backtest::bars::Bar;
use crate::backtest::indicators::{Indicator, PriceSource, Sma};
use crate::backtest::parallel::ParameterSet;
use crate::backtest::position::Side;

/// Buys below `SMA * (1 - range_buffer)`, sells above `SMA * (1 + range_buffer)`,
/// and exits once price reverts through the SMA.
#[derive(Debug, Clone)]
pub struct SidewaysRange {
    ma: Sma,
    range_buffer: f64,
}

impl SidewaysRange {
    /// Build from parameters, falling back to the strategy defaults.
    pub fn from_params(params: &ParameterSet) -> Result<Self, StrategyError> {
        Ok(Self {
            ma: Sma::new(params::period(params, "ma_period", 20)?, PriceSource::Close)?,
            range_buffer: params::non_negative(params, "range_buffer", 0.01)?,
        })
    }
}

impl Strategy for SidewaysRange {
    fn name(&self) -> &'static str {
        "sideways_range"
    }

    fn update(&mut self, bar: &Bar) {
        self.ma.update(bar);
    }

    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
        let Some(ma) = self.ma.value() else {
            return Ok(None);
        };

        let close = ctx.bar.close;
        if close < ma * (1.0 - self.range_buffer) {
            Ok(Some(Side::Long))
        } else if close > ma * (1.0 + self.range_buffer) {
            Ok(Some(Side::Short))
        } else {
            Ok(None)
        }
    }

    fn exit_signal(&self, ctx: &BarContext<'_>, side: Side) -> Result<bool, StrategyError> {
        let Some(ma) = self.ma.value() else {
            return Ok(false);
        };
        Ok(match side {
            Side::Long => ctx.bar.close >= ma,
            Side::Short => ctx.bar.close <= ma,
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
        [("ma_period", ParamValue::Int(3))].into_iter().collect()
    }

    #[test]
    fn test_dip_below_band_buys() {
        let series = series_from_closes(&[100.0, 100.0, 100.0, 95.0]);
        let mut strategy = SidewaysRange::from_params(&params()).unwrap();
        let signals = entry_signals(&mut strategy, series.bars(), None);
        assert_eq!(signals, vec![None, None, None, Some(Side::Long)]);
    }

    #[test]
    fn test_spike_above_band_sells() {
        let series = series_from_closes(&[100.0, 100.0, 100.0, 105.0]);
        let mut strategy = SidewaysRange::from_params(&params()).unwrap();
        let signals = entry_signals(&mut strategy, series.bars(), None);
        assert_eq!(signals[3], Some(Side::Short));
    }

    #[test]
    fn test_long_exits_on_reversion() {
        let series = series_from_closes(&[100.0, 100.0, 100.0, 95.0, 101.0]);
        let mut strategy = SidewaysRange::from_params(&params()).unwrap();
        let exits = exit_signals(&mut strategy, series.bars(), Side::Long);
        assert!(!exits[3]);
        assert!(exits[4]);
    }
}
