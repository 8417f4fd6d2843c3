//! Volume-weighted average price over a rolling window.

use super::ring::RingBuffer;
use super::{Indicator, IndicatorError, check_period};
use crate::backtest::bars::Bar;

/// Rolling VWAP: `sum(typical * volume) / sum(volume)` over `period` bars.
///
/// Undefined (`None`) while the window's volume is zero.
#[derive(Debug, Clone)]
pub struct Vwap {
    price_volume: RingBuffer,
    volume: RingBuffer,
    value: Option<f64>,
}

impl Vwap {
    /// Create a VWAP over `period` bars.
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        let period = check_period(period, "VWAP")?;
        Ok(Self {
            price_volume: RingBuffer::new(period),
            volume: RingBuffer::new(period),
            value: None,
        })
    }
}

impl Indicator for Vwap {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        self.price_volume.push(bar.typical_price() * bar.volume);
        self.volume.push(bar.volume);

        self.value = if self.volume.is_full() && self.volume.sum() > f64::EPSILON {
            Some(self.price_volume.sum() / self.volume.sum())
        } else {
            None
        };
        self.value
    }

    fn value(&self) -> Option<f64> {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::bars::test_support::series_from_closes;

    #[test]
    fn test_vwap_constant_volume_is_typical_mean() {
        let series = series_from_closes(&[10.0, 12.0, 14.0]);
        let mut vwap = Vwap::new(3).unwrap();
        let mut last = None;
        for bar in series.bars() {
            last = vwap.update(bar);
        }
        // Typical price equals close for symmetric test bars.
        let Some(value) = last else {
            panic!("VWAP should be warm");
        };
        assert!((value - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_vwap_zero_volume_is_undefined() {
        let series = series_from_closes(&[10.0, 11.0]);
        let mut vwap = Vwap::new(2).unwrap();
        for bar in series.bars() {
            let mut bar = *bar;
            bar.volume = 0.0;
            assert_eq!(vwap.update(&bar), None);
        }
    }
}
