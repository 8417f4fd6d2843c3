//! Configuration for parallel sweep execution.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backtest::config::InvalidSetting;

/// Configuration for parallel sweep execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Maximum number of worker threads (0 = use all available).
    pub max_threads: usize,

    /// Combinations materialised per batch.
    pub batch_size: usize,

    /// Timeout per individual run (seconds, 0 = no timeout).
    pub job_timeout_secs: u64,

    /// Minimum batch size worth parallelizing (smaller batches run sequentially).
    pub min_parallel_jobs: usize,

    /// Whether to log per-batch progress.
    pub track_progress: bool,
}

impl ParallelConfig {
    /// Check the settings before a sweep starts.
    ///
    /// # Errors
    ///
    /// Returns an error when `batch_size` is zero.
    pub fn validate(&self) -> Result<(), InvalidSetting> {
        if self.batch_size == 0 {
            return Err(InvalidSetting::new("batch_size", "must be greater than zero"));
        }
        Ok(())
    }

    /// Per-run time budget, if any.
    #[must_use]
    pub const fn job_timeout(&self) -> Option<Duration> {
        if self.job_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.job_timeout_secs))
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_threads: 0,
            batch_size: 50,
            job_timeout_secs: 0,
            min_parallel_jobs: 4,
            track_progress: true,
        }
    }
}
