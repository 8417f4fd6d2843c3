//! Momentum oscillators: RSI and MACD.

use super::moving_average::Ema;
use super::{Indicator, IndicatorError, PriceSource, check_period};
use crate::backtest::bars::Bar;

/// Relative Strength Index with Wilder smoothing.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    changes_seen: usize,
    avg_gain: f64,
    avg_loss: f64,
    value: Option<f64>,
}

impl Rsi {
    /// Create an RSI over `period` close-to-close changes.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period, "RSI")?;
        Ok(Self {
            period,
            prev_close: None,
            changes_seen: 0,
            avg_gain: 0.0,
            avg_loss: 0.0,
            value: None,
        })
    }

    fn from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss <= 0.0 {
            // No losses in the window: saturated, or neutral when also flat.
            if avg_gain <= 0.0 { 50.0 } else { 100.0 }
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        }
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let close = bar.close;
        let Some(prev) = self.prev_close.replace(close) else {
            return None;
        };

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let n = self.period as f64;

        if self.changes_seen < self.period {
            self.avg_gain += gain / n;
            self.avg_loss += loss / n;
            self.changes_seen += 1;
            if self.changes_seen < self.period {
                return None;
            }
        } else {
            self.avg_gain = self.avg_gain.mul_add(n - 1.0, gain) / n;
            self.avg_loss = self.avg_loss.mul_add(n - 1.0, loss) / n;
        }

        self.value = Some(Self::from_averages(self.avg_gain, self.avg_loss));
        self.value
    }

    fn value(&self) -> Option<f64> {
        self.value
    }
}

/// One MACD reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdValue {
    /// Fast EMA minus slow EMA.
    pub macd: f64,
    /// EMA of the MACD line.
    pub signal: f64,
    /// MACD minus signal.
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    value: Option<MacdValue>,
}

impl Macd {
    /// Create a MACD with the given fast, slow and signal periods.
    pub fn new(fast: usize, slow: usize, signal: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            fast: Ema::new(fast, PriceSource::Close)?,
            slow: Ema::new(slow, PriceSource::Close)?,
            signal: Ema::new(signal, PriceSource::Close)?,
            value: None,
        })
    }
}

impl Indicator for Macd {
    type Output = MacdValue;

    fn update(&mut self, bar: &Bar) -> Option<MacdValue> {
        let fast = self.fast.update(bar);
        let slow = self.slow.update(bar);
        let (Some(fast), Some(slow)) = (fast, slow) else {
            return None;
        };

        let macd = fast - slow;
        let signal = self.signal.push(macd)?;
        self.value = Some(MacdValue {
            macd,
            signal,
            histogram: macd - signal,
        });
        self.value
    }

    fn value(&self) -> Option<MacdValue> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::bars::test_support::series_from_closes;

    fn feed<I: Indicator>(indicator: &mut I, closes: &[f64]) -> Option<I::Output> {
        let series = series_from_closes(closes);
        let mut last = None;
        for bar in series.bars() {
            last = indicator.update(bar);
        }
        last
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let mut rsi = Rsi::new(3).unwrap();
        assert_eq!(feed(&mut rsi, &[1.0, 2.0, 3.0, 4.0, 5.0]), Some(100.0));
    }

    #[test]
    fn test_rsi_flat_is_neutral() {
        let mut rsi = Rsi::new(3).unwrap();
        assert_eq!(feed(&mut rsi, &[5.0; 6]), Some(50.0));
    }

    #[test]
    fn test_rsi_warmup_needs_period_changes() {
        let mut rsi = Rsi::new(3).unwrap();
        assert_eq!(feed(&mut rsi, &[1.0, 2.0, 3.0]), None);
    }

    #[test]
    fn test_rsi_balanced_changes() {
        let mut rsi = Rsi::new(2).unwrap();
        let Some(value) = feed(&mut rsi, &[10.0, 11.0, 10.0]) else {
            panic!("RSI should be warm after two changes");
        };
        assert!((value - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_macd_positive_in_uptrend() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + f64::from(i)).collect();
        let mut macd = Macd::new(3, 6, 3).unwrap();
        let Some(value) = feed(&mut macd, &closes) else {
            panic!("MACD should be warm after 40 bars");
        };
        assert!(value.macd > 0.0);
        assert!((value.histogram - (value.macd - value.signal)).abs() < 1e-12);
    }
}
