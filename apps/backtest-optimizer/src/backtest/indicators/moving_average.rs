//! Simple and exponential moving averages.

use super::ring::RingBuffer;
use super::{Indicator, IndicatorError, PriceSource, check_period};
use crate::backtest::bars::Bar;

/// Simple moving average over a fixed window.
#[derive(Debug, Clone)]
pub struct Sma {
    window: RingBuffer,
    source: PriceSource,
}

impl Sma {
    /// Create an SMA of `period` bars over `source`.
    pub fn new(period: usize, source: PriceSource) -> Result<Self, IndicatorError> {
        let period = check_period(period, "SMA")?;
        Ok(Self {
            window: RingBuffer::new(period),
            source,
        })
    }

    /// Feed a raw value.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.window.push(value);
        self.window.mean()
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.push(self.source.of(bar))
    }

    fn value(&self) -> Option<f64> {
        self.window.mean()
    }
}

/// Exponential moving average, seeded with the SMA of the first `period`
/// values and smoothed with `alpha = 2 / (period + 1)` afterwards.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    source: PriceSource,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl Ema {
    /// Create an EMA of `period` bars over `source`.
    pub fn new(period: usize, source: PriceSource) -> Result<Self, IndicatorError> {
        let period = check_period(period, "EMA")?;
        Ok(Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            source,
            seed_sum: 0.0,
            seen: 0,
            value: None,
        })
    }

    /// Feed a raw value. Used to smooth derived series such as MACD.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                self.value = Some(self.alpha.mul_add(value - prev, prev));
            }
            None => {
                self.seed_sum += value;
                self.seen += 1;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.push(self.source.of(bar))
    }

    fn value(&self) -> Option<f64> {
        self.value
    }
}
