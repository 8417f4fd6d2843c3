//! Error types for parameter sweeps.

use thiserror::Error;

use crate::backtest::bars::BarSeriesError;
use crate::backtest::config::InvalidSetting;
use crate::backtest::walkforward::SplitError;

use super::grid::GridError;

/// Errors that stop a sweep before or instead of running it.
///
/// Per-run failures are not in here; they are collected on the outcome.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SweepError {
    /// Run or parallel settings are out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] InvalidSetting),

    /// The bar series failed validation.
    #[error("Invalid bar data: {0}")]
    Data(#[from] BarSeriesError),

    /// The parameter grid could not be built or batched.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// The walk-forward split could not be made.
    #[error(transparent)]
    Split(#[from] SplitError),

    /// Thread pool initialization failed.
    #[error("Failed to initialize thread pool: {message}")]
    ThreadPool {
        /// Error message.
        message: String,
    },
}
