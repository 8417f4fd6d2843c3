//! Volatility and range indicators: ATR and rolling extremes.

use std::collections::VecDeque;

use super::{Indicator, IndicatorError, PriceSource, check_period};
use crate::backtest::bars::Bar;

/// Average True Range with Wilder smoothing.
///
/// The first bar's true range is `high - low`; later bars also consider the
/// gap from the previous close.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seen: usize,
    seed_sum: f64,
    value: Option<f64>,
}

impl Atr {
    /// Create an ATR of `period` bars.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period, "ATR")?;
        Ok(Self {
            period,
            prev_close: None,
            seen: 0,
            seed_sum: 0.0,
            value: None,
        })
    }

    fn true_range(&self, bar: &Bar) -> f64 {
        let range = bar.high - bar.low;
        self.prev_close.map_or(range, |pc| {
            range.max((bar.high - pc).abs()).max((bar.low - pc).abs())
        })
    }
}

impl Indicator for Atr {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let tr = self.true_range(bar);
        self.prev_close = Some(bar.close);

        let n = self.period as f64;
        match self.value {
            Some(prev) => self.value = Some(prev.mul_add(n - 1.0, tr) / n),
            None => {
                self.seed_sum += tr;
                self.seen += 1;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / n);
                }
            }
        }
        self.value
    }

    fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Rolling extreme over a window, kept in a monotonic deque.
#[derive(Debug, Clone)]
struct RollingExtreme {
    period: usize,
    source: PriceSource,
    /// `(bar ordinal, value)`, values monotone from the front.
    deque: VecDeque<(usize, f64)>,
    seen: usize,
}

impl RollingExtreme {
    fn new(period: usize, source: PriceSource) -> Self {
        Self {
            period,
            source,
            deque: VecDeque::new(),
            seen: 0,
        }
    }

    /// `dominates(a, b)` is true when `a` makes `b` irrelevant.
    fn push(&mut self, bar: &Bar, dominates: fn(f64, f64) -> bool) -> Option<f64> {
        let value = self.source.of(bar);
        let ordinal = self.seen;
        self.seen += 1;

        while self.deque.back().is_some_and(|&(_, v)| dominates(value, v)) {
            self.deque.pop_back();
        }
        self.deque.push_back((ordinal, value));
        while self
            .deque
            .front()
            .is_some_and(|&(i, _)| i + self.period <= ordinal)
        {
            self.deque.pop_front();
        }

        self.value()
    }

    fn value(&self) -> Option<f64> {
        if self.seen < self.period {
            return None;
        }
        self.deque.front().map(|&(_, v)| v)
    }
}

/// Highest value of `source` over the last `period` bars.
#[derive(Debug, Clone)]
pub struct Highest(RollingExtreme);

impl Highest {
    /// Create a rolling maximum.
    pub fn new(period: usize, source: PriceSource) -> Result<Self, IndicatorError> {
        let period = check_period(period, "Highest")?;
        Ok(Self(RollingExtreme::new(period, source)))
    }
}

impl Indicator for Highest {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.0.push(bar, |new, old| new >= old)
    }

    fn value(&self) -> Option<f64> {
        self.0.value()
    }
}

/// Lowest value of `source` over the last `period` bars.
#[derive(Debug, Clone)]
pub struct Lowest(RollingExtreme);

impl Lowest {
    /// Create a rolling minimum.
    pub fn new(period: usize, source: PriceSource) -> Result<Self, IndicatorError> {
        let period = check_period(period, "Lowest")?;
        Ok(Self(RollingExtreme::new(period, source)))
    }
}

impl Indicator for Lowest {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.0.push(bar, |new, old| new <= old)
    }

    fn value(&self) -> Option<f64> {
        self.0.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::bars::test_support::series_from_closes;

    #[test]
    fn test_atr_constant_range() {
        // Test bars have high - low = 1 and unchanged closes.
        let series = series_from_closes(&[10.0; 5]);
        let mut atr = Atr::new(3).unwrap();
        let values: Vec<Option<f64>> = series.bars().iter().map(|b| atr.update(b)).collect();
        assert_eq!(values[1], None);
        assert_eq!(values[2], Some(1.0));
        assert_eq!(values[4], Some(1.0));
    }

    #[test]
    fn test_atr_includes_gaps() {
        let series = series_from_closes(&[10.0, 20.0]);
        let mut atr = Atr::new(1).unwrap();
        let bars = series.bars();
        assert_eq!(atr.update(&bars[0]), Some(1.0));
        // |20.5 - 10| dominates the bar's own range.
        assert_eq!(atr.update(&bars[1]), Some(10.5));
    }

    #[test]
    fn test_rolling_extremes_slide() {
        let series = series_from_closes(&[3.0, 1.0, 4.0, 1.0, 5.0, 2.0, 2.0, 2.0]);
        let mut high = Highest::new(3, PriceSource::Close).unwrap();
        let mut low = Lowest::new(3, PriceSource::Close).unwrap();

        let highs: Vec<Option<f64>> = series.bars().iter().map(|b| high.update(b)).collect();
        let lows: Vec<Option<f64>> = series.bars().iter().map(|b| low.update(b)).collect();

        assert_eq!(
            highs,
            vec![None, None, Some(4.0), Some(4.0), Some(5.0), Some(5.0), Some(5.0), Some(2.0)]
        );
        assert_eq!(
            lows,
            vec![None, None, Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(2.0), Some(2.0)]
        );
    }
}
