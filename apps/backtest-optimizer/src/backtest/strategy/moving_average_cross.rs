//! Golden-cross trend following.

use super::{BarContext, Strategy, StrategyError, params};
use crate::backtest::bars::Bar;
use crate::backtest::indicators::{Indicator, PriceSource, Sma};
use crate::backtest::parallel::ParameterSet;
use crate::backtest::position::Side;

/// Long while the short SMA is above the long SMA, exit on the death cross.
///
/// With `require_close_above` (default) the close must also be above the
/// long SMA to enter.
#[derive(Debug, Clone)]
pub struct MovingAverageCross {
    short: Sma,
    long: Sma,
    require_close_above: bool,
}

impl MovingAverageCross {
    /// Build from parameters, falling back to the strategy defaults.
    pub fn from_params(params: &ParameterSet) -> Result<Self, StrategyError> {
        Ok(Self {
            short: Sma::new(params::period(params, "short_period", 50)?, PriceSource::Close)?,
            long: Sma::new(params::period(params, "long_period", 200)?, PriceSource::Close)?,
            require_close_above: params::flag(params, "require_close_above", true)?,
        })
    }
}

impl Strategy for MovingAverageCross {
    fn name(&self) -> &'static str {
        "moving_average_cross"
    }

    fn update(&mut self, bar: &Bar) {
        self.short.update(bar);
        self.long.update(bar);
    }

    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
        let (Some(short), Some(long)) = (self.short.value(), self.long.value()) else {
            return Ok(None);
        };
        let confirmed = !self.require_close_above || ctx.bar.close > long;
        Ok((short > long && confirmed).then_some(Side::Long))
    }

    fn exit_signal(&self, _ctx: &BarContext<'_>, side: Side) -> Result<bool, StrategyError> {
        let (Some(short), Some(long)) = (self.short.value(), self.long.value()) else {
            return Ok(false);
        };
        Ok(side == Side::Long && short < long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::bars::test_support::series_from_closes;
    use crate::backtest::parallel::ParamValue;
    use crate::backtest::strategy::test_support::{entry_signals, exit_signals};

    fn params() -> ParameterSet {
        [("short_period", ParamValue::Int(2)), ("long_period", ParamValue::Int(4))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_golden_cross_entry() {
        let series = series_from_closes(&[10.0, 10.0, 10.0, 10.0, 12.0, 14.0]);
        let mut strategy = MovingAverageCross::from_params(&params()).unwrap();
        let signals = entry_signals(&mut strategy, series.bars(), None);
        assert_eq!(signals, vec![None, None, None, None, Some(Side::Long), Some(Side::Long)]);
    }

    #[test]
    fn test_death_cross_exit() {
        let series = series_from_closes(&[14.0, 14.0, 14.0, 14.0, 12.0, 10.0]);
        let mut strategy = MovingAverageCross::from_params(&params()).unwrap();
        let exits = exit_signals(&mut strategy, series.bars(), Side::Long);
        assert_eq!(exits, vec![false, false, false, false, true, true]);
    }
}
