//! Fibonacci retracement entries in the direction of the SMA trend.

use super::{BarContext, Strategy, StrategyError, params};
use crate::backtest::bars::Bar;
use crate::backtest::indicators::{Highest, Indicator, Lowest, PriceSource, Sma};
use crate::backtest::parallel::ParameterSet;
use crate::backtest::position::Side;

/// Retracement ratios measured down from the range high.
pub const FIB_LEVELS: [f64; 4] = [0.236, 0.382, 0.5, 0.618];

/// Enters when the close sits within `tolerance` of a retracement level of
/// the recent high/low range. Long while the short SMA is above the long
/// SMA, short while it is below.
#[derive(Debug, Clone)]
pub struct FibonacciRetracement {
    short: Sma,
    long: Sma,
    highest: Highest,
    lowest: Lowest,
    tolerance: f64,
}

impl FibonacciRetracement {
    /// Build from parameters, falling back to the strategy defaults.
    pub fn from_params(params: &ParameterSet) -> Result<Self, StrategyError> {
        let range_period = params::period(params, "range_period", 20)?;
        Ok(Self {
            short: Sma::new(params::period(params, "short_ma_period", 20)?, PriceSource::Close)?,
            long: Sma::new(params::period(params, "long_ma_period", 50)?, PriceSource::Close)?,
            highest: Highest::new(range_period, PriceSource::High)?,
            lowest: Lowest::new(range_period, PriceSource::Low)?,
            tolerance: params::non_negative(params, "tolerance", 0.01)?,
        })
    }

    /// Whether `close` is within tolerance of any level of `[low, high]`.
    fn near_level(&self, close: f64, high: f64, low: f64) -> bool {
        let range = high - low;
        FIB_LEVELS
            .iter()
            .map(|ratio| range.mul_add(-ratio, high))
            .any(|level| (close - level).abs() <= self.tolerance * level)
    }
}

impl Strategy for FibonacciRetracement {
    fn name(&self) -> &'static str {
        "fibonacci_retracement"
    }

    fn update(&mut self, bar: &Bar) {
        self.short.update(bar);
        self.long.update(bar);
        self.highest.update(bar);
        self.lowest.update(bar);
    }

    fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
        let (Some(short), Some(long), Some(high), Some(low)) = (
            self.short.value(),
            self.long.value(),
            self.highest.value(),
            self.lowest.value(),
        ) else {
            return Ok(None);
        };

        if !self.near_level(ctx.bar.close, high, low) {
            return Ok(None);
        }
        Ok(if short > long {
            Some(Side::Long)
        } else if short < long {
            Some(Side::Short)
        } else {
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::bars::test_support::series_from_closes;
    use crate::backtest::parallel::ParamValue;
    use crate::backtest::strategy::test_support::entry_signals;

    fn params() -> ParameterSet {
        with_tolerance(0.01)
    }

    fn with_tolerance(tolerance: f64) -> ParameterSet {
        [
            ("short_ma_period", ParamValue::Int(2)),
            ("long_ma_period", ParamValue::Int(3)),
            ("range_period", ParamValue::Int(3)),
            ("tolerance", ParamValue::Float(tolerance)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_long_on_pullback_to_half_retracement() {
        // Range 10.5..12.5 on the last bar puts the 0.5 level at 11.5.
        let series = series_from_closes(&[10.0, 11.0, 12.0, 11.5]);
        let mut strategy = FibonacciRetracement::from_params(&params()).unwrap();
        let signals = entry_signals(&mut strategy, series.bars(), None);
        assert_eq!(signals, vec![None, None, None, Some(Side::Long)]);
    }

    #[test]
    fn test_short_on_bounce_in_downtrend() {
        let series = series_from_closes(&[12.0, 11.0, 10.0, 10.5]);
        let mut strategy = FibonacciRetracement::from_params(&params()).unwrap();
        let signals = entry_signals(&mut strategy, series.bars(), None);
        assert_eq!(signals, vec![None, None, None, Some(Side::Short)]);
    }

    #[test]
    fn test_no_entry_away_from_levels() {
        let set = with_tolerance(0.0);
        let series = series_from_closes(&[10.0, 11.0, 12.0, 11.6]);
        let mut strategy = FibonacciRetracement::from_params(&set).unwrap();
        let signals = entry_signals(&mut strategy, series.bars(), None);
        assert!(signals.iter().all(Option::is_none));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        assert!(FibonacciRetracement::from_params(&with_tolerance(-0.01)).is_err());
    }
}
