//! Chronological train/test split of a bar series.

use thiserror::Error;

use crate::backtest::bars::BarSeries;

/// Errors from splitting a series.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SplitError {
    /// Train ratio outside the open interval (0, 1).
    #[error("Train ratio must be in (0, 1), got {ratio}")]
    InvalidRatio {
        /// Offending ratio.
        ratio: f64,
    },

    /// The split would leave the train or test side empty.
    #[error("Splitting {len} bars at {train} leaves an empty side")]
    EmptySide {
        /// Series length.
        len: usize,
        /// Bars that would go to training.
        train: usize,
    },
}

/// Splits a series into a training prefix and a test suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkForwardSplitter {
    train_ratio: f64,
}

impl WalkForwardSplitter {
    /// Create a splitter.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRatio` unless `0 < train_ratio < 1`.
    pub fn new(train_ratio: f64) -> Result<Self, SplitError> {
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(SplitError::InvalidRatio { ratio: train_ratio });
        }
        Ok(Self { train_ratio })
    }

    /// Configured train ratio.
    #[must_use]
    pub const fn train_ratio(&self) -> f64 {
        self.train_ratio
    }

    /// Number of training bars for a series of `len` bars.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn train_len(&self, len: usize) -> usize {
        ((len as f64) * self.train_ratio).floor() as usize
    }

    /// Split into `(train, test)`; both share the original storage.
    ///
    /// # Errors
    ///
    /// Returns `EmptySide` when the series is too short for both sides.
    pub fn split(&self, series: &BarSeries) -> Result<(BarSeries, BarSeries), SplitError> {
        let len = series.len();
        let train = self.train_len(len);
        let empty = SplitError::EmptySide { len, train };

        let train_series = series.slice(0..train).ok_or_else(|| empty.clone())?;
        let test_series = series.slice(train..len).ok_or(empty)?;
        Ok((train_series, test_series))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;
    use crate::backtest::bars::test_support::series_from_closes;

    fn series(n: usize) -> BarSeries {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        series_from_closes(&closes)
    }

    #[test]
    fn test_seventy_thirty_split() {
        let original = series(100);
        let splitter = WalkForwardSplitter::new(0.7).unwrap();
        let (train, test) = splitter.split(&original).unwrap();

        assert_eq!(train.len(), 70);
        assert_eq!(test.len(), 30);
        assert_eq!(train.bars(), &original.bars()[0..70]);
        assert_eq!(test.bars(), &original.bars()[70..100]);
    }

    #[test_case(0.0 ; "zero")]
    #[test_case(1.0 ; "one")]
    #[test_case(-0.5 ; "negative")]
    #[test_case(f64::NAN ; "nan")]
    fn test_degenerate_ratio_rejected(ratio: f64) {
        assert!(matches!(
            WalkForwardSplitter::new(ratio),
            Err(SplitError::InvalidRatio { .. })
        ));
    }

    #[test]
    fn test_too_short_series_rejected() {
        let splitter = WalkForwardSplitter::new(0.5).unwrap();
        assert!(matches!(
            splitter.split(&series(1)),
            Err(SplitError::EmptySide { len: 1, train: 0 })
        ));
    }

    proptest! {
        #[test]
        fn prop_split_partitions_series(len in 2usize..300, ratio in 0.01f64..0.99) {
            let original = series(len);
            let splitter = WalkForwardSplitter::new(ratio).unwrap();
            prop_assume!(splitter.train_len(len) > 0);
            let (train, test) = splitter.split(&original).unwrap();

            prop_assert_eq!(train.len() + test.len(), original.len());
            prop_assert_eq!(train.bars(), &original.bars()[..train.len()]);
            prop_assert_eq!(test.bars(), &original.bars()[train.len()..]);
            prop_assert!(
                train.bars().last().map(|b| b.timestamp) < test.bars().first().map(|b| b.timestamp)
            );
        }
    }
}
