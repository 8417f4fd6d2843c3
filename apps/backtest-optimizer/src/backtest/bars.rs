//! OHLCV bar series.
//!
//! A [`BarSeries`] is validated once on construction and is immutable
//! afterwards. Bar storage is reference counted so sub-series produced by
//! the walk-forward splitter and the sweep workers share one allocation.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minutes in a 365-day year. Crypto venues trade around the clock, so
/// annualization uses calendar time rather than a trading-day calendar.
const MINUTES_PER_YEAR: f64 = 525_600.0;

/// Data errors raised while validating a bar series.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BarSeriesError {
    /// The series has no bars.
    #[error("Bar series for '{symbol}' is empty")]
    Empty {
        /// Symbol of the series.
        symbol: String,
    },

    /// A timestamp is not strictly greater than its predecessor.
    #[error("Bar series for '{symbol}' is not strictly increasing at index {index}")]
    NonMonotonicTimestamp {
        /// Symbol of the series.
        symbol: String,
        /// Index of the offending bar.
        index: usize,
    },

    /// A price or volume field is NaN or infinite.
    #[error("Bar {index} of '{symbol}' has a non-finite field")]
    NonFiniteValue {
        /// Symbol of the series.
        symbol: String,
        /// Index of the offending bar.
        index: usize,
    },

    /// Volume is negative.
    #[error("Bar {index} of '{symbol}' has negative volume")]
    NegativeVolume {
        /// Symbol of the series.
        symbol: String,
        /// Index of the offending bar.
        index: usize,
    },

    /// High is below low.
    #[error("Bar {index} of '{symbol}' has high below low")]
    InvertedRange {
        /// Symbol of the series.
        symbol: String,
        /// Index of the offending bar.
        index: usize,
    },

    /// Timeframe string could not be parsed.
    #[error("Invalid timeframe '{value}': expected a positive count followed by m, h, d or w")]
    InvalidTimeframe {
        /// The rejected input.
        value: String,
    },
}

/// One OHLCV sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time.
    pub timestamp: DateTime<Utc>,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    #[must_use]
    pub const fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Typical price `(high + low + close) / 3`.
    #[must_use]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// True when the candle closed above its open.
    #[must_use]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// True when the candle closed below its open.
    #[must_use]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Bar duration, stored in whole minutes.
///
/// Parsed from the exchange notation used for candle requests: `15m`, `1h`,
/// `4h`, `1d`, `1w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    minutes: u32,
}

impl Timeframe {
    /// Create a timeframe from a minute count. Returns `None` for zero.
    #[must_use]
    pub const fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes == 0 {
            None
        } else {
            Some(Self { minutes })
        }
    }

    /// Bar duration in minutes.
    #[must_use]
    pub const fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Number of bars in a calendar year.
    #[must_use]
    pub fn periods_per_year(&self) -> f64 {
        MINUTES_PER_YEAR / f64::from(self.minutes)
    }
}

impl FromStr for Timeframe {
    type Err = BarSeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BarSeriesError::InvalidTimeframe {
            value: s.to_string(),
        };

        let trimmed = s.trim();
        let Some(unit) = trimmed.chars().last() else {
            return Err(invalid());
        };
        let count: u32 = trimmed[..trimmed.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| invalid())?;

        let multiplier = match unit {
            'm' => 1,
            'h' => 60,
            'd' => 1_440,
            'w' => 10_080,
            _ => return Err(invalid()),
        };

        count
            .checked_mul(multiplier)
            .and_then(Self::from_minutes)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = BarSeriesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(value: Timeframe) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.minutes;
        if m % 10_080 == 0 {
            write!(f, "{}w", m / 10_080)
        } else if m % 1_440 == 0 {
            write!(f, "{}d", m / 1_440)
        } else if m % 60 == 0 {
            write!(f, "{}h", m / 60)
        } else {
            write!(f, "{m}m")
        }
    }
}

/// Unvalidated bar data for one symbol, as handed over by a data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesInput {
    /// Instrument symbol.
    pub symbol: String,
    /// Bar duration.
    pub timeframe: Timeframe,
    /// Raw bars, oldest first.
    pub bars: Vec<Bar>,
}

impl SeriesInput {
    /// Validate into a [`BarSeries`].
    pub fn into_series(self) -> Result<BarSeries, BarSeriesError> {
        BarSeries::new(self.symbol, self.timeframe, self.bars)
    }
}

/// Ordered, immutable view over validated bars for one symbol and timeframe.
#[derive(Debug, Clone)]
pub struct BarSeries {
    symbol: Arc<str>,
    timeframe: Timeframe,
    bars: Arc<[Bar]>,
    window: Range<usize>,
}

impl BarSeries {
    /// Validate and wrap a list of bars.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        bars: Vec<Bar>,
    ) -> Result<Self, BarSeriesError> {
        let symbol: String = symbol.into();

        if bars.is_empty() {
            return Err(BarSeriesError::Empty { symbol });
        }

        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_finite() {
                return Err(BarSeriesError::NonFiniteValue { symbol, index });
            }
            if bar.volume < 0.0 {
                return Err(BarSeriesError::NegativeVolume { symbol, index });
            }
            if bar.high < bar.low {
                return Err(BarSeriesError::InvertedRange { symbol, index });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(BarSeriesError::NonMonotonicTimestamp { symbol, index });
            }
        }

        let len = bars.len();
        Ok(Self {
            symbol: symbol.into(),
            timeframe,
            bars: bars.into(),
            window: 0..len,
        })
    }

    /// Instrument symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Bar duration.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Bars in this view, oldest first.
    #[must_use]
    pub fn bars(&self) -> &[Bar] {
        &self.bars[self.window.clone()]
    }

    /// Number of bars in this view.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.window.end - self.window.start
    }

    /// True when the view has no bars. Only possible for an empty slice.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bar at `index`, relative to this view.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars().get(index)
    }

    /// Sub-series over `range`, re-based to index 0 and sharing storage.
    ///
    /// Returns `None` when the range is empty or out of bounds.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Option<Self> {
        if range.start >= range.end || range.end > self.len() {
            return None;
        }
        let start = self.window.start + range.start;
        let end = self.window.start + range.end;
        Some(Self {
            symbol: Arc::clone(&self.symbol),
            timeframe: self.timeframe,
            bars: Arc::clone(&self.bars),
            window: start..end,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Bar, BarSeries, Timeframe};

    /// One-minute bars with the given closes, high/low at close ± 0.5.
    pub fn series_from_closes(closes: &[f64]) -> BarSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    start + Duration::minutes(i as i64),
                    c,
                    c + 0.5,
                    c - 0.5,
                    c,
                    1_000.0,
                )
            })
            .collect();
        BarSeries::new("TEST", Timeframe::from_minutes(1).unwrap(), bars).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use test_case::test_case;

    use super::*;

    fn bar_at(minute: i64, close: f64) -> Bar {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Bar::new(
            start + Duration::minutes(minute),
            close,
            close + 1.0,
            close - 1.0,
            close,
            10.0,
        )
    }

    fn one_minute() -> Timeframe {
        Timeframe::from_minutes(1).unwrap()
    }

    #[test_case("15m", 15 ; "minutes")]
    #[test_case("1h", 60 ; "hours")]
    #[test_case("4h", 240 ; "four hours")]
    #[test_case("1d", 1_440 ; "days")]
    #[test_case("1w", 10_080 ; "weeks")]
    fn test_timeframe_parse(input: &str, minutes: u32) {
        let tf: Timeframe = input.parse().unwrap();
        assert_eq!(tf.minutes(), minutes);
        assert_eq!(tf.to_string(), input);
    }

    #[test_case("" ; "empty")]
    #[test_case("0m" ; "zero")]
    #[test_case("15x" ; "unknown unit")]
    #[test_case("m" ; "missing count")]
    fn test_timeframe_parse_rejects(input: &str) {
        assert!(input.parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_periods_per_year() {
        let tf: Timeframe = "1d".parse().unwrap();
        assert!((tf.periods_per_year() - 365.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_series_rejected() {
        let result = BarSeries::new("BTC/USDT", one_minute(), Vec::new());
        assert!(matches!(result, Err(BarSeriesError::Empty { .. })));
    }

    #[test]
    fn test_non_monotonic_rejected() {
        let bars = vec![bar_at(0, 10.0), bar_at(2, 11.0), bar_at(1, 12.0)];
        let result = BarSeries::new("BTC/USDT", one_minute(), bars);
        assert_eq!(
            result.unwrap_err(),
            BarSeriesError::NonMonotonicTimestamp {
                symbol: "BTC/USDT".to_string(),
                index: 2
            }
        );
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let bars = vec![bar_at(0, 10.0), bar_at(0, 11.0)];
        assert!(BarSeries::new("X", one_minute(), bars).is_err());
    }

    #[test]
    fn test_negative_volume_rejected() {
        let mut bar = bar_at(0, 10.0);
        bar.volume = -1.0;
        let result = BarSeries::new("X", one_minute(), vec![bar]);
        assert!(matches!(result, Err(BarSeriesError::NegativeVolume { .. })));
    }

    #[test]
    fn test_nan_rejected() {
        let mut bar = bar_at(0, 10.0);
        bar.close = f64::NAN;
        let result = BarSeries::new("X", one_minute(), vec![bar]);
        assert!(matches!(result, Err(BarSeriesError::NonFiniteValue { .. })));
    }

    #[test]
    fn test_gaps_allowed() {
        let bars = vec![bar_at(0, 10.0), bar_at(60, 11.0), bar_at(61, 12.0)];
        let series = BarSeries::new("X", one_minute(), bars).unwrap();
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_slice_rebases_and_shares() {
        let bars: Vec<Bar> = (0..10).map(|i| bar_at(i, 100.0 + i as f64)).collect();
        let series = BarSeries::new("X", one_minute(), bars).unwrap();

        let Some(tail) = series.slice(4..10) else {
            panic!("slice within bounds should succeed");
        };
        assert_eq!(tail.len(), 6);
        assert_eq!(tail.get(0).map(|b| b.close), Some(104.0));

        let Some(inner) = tail.slice(1..3) else {
            panic!("nested slice should succeed");
        };
        assert_eq!(inner.bars()[0].close, 105.0);
        assert!(tail.slice(3..3).is_none());
        assert!(tail.slice(0..7).is_none());
    }

    #[test]
    fn test_series_input_deserializes() {
        let json = r#"{
            "symbol": "ETH/USDT",
            "timeframe": "15m",
            "bars": [
                {"timestamp": "2024-01-01T00:00:00Z", "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 3.0}
            ]
        }"#;
        let input: SeriesInput = serde_json::from_str(json).unwrap();
        let series = input.into_series().unwrap();
        assert_eq!(series.timeframe().minutes(), 15);
        assert_eq!(series.symbol(), "ETH/USDT");
    }
}
