//! Parameter sweep configuration.

use serde::Deserialize;

use crate::backtest::parallel::{ParallelConfig, ParameterSpecs};
use crate::backtest::{StrategyKind, WalkForwardConfig};

/// What to sweep and how to schedule it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SweepConfig {
    /// Strategy to optimize.
    pub strategy: StrategyKind,
    /// Parameter specifications in declaration order.
    #[serde(default)]
    pub parameters: ParameterSpecs,
    /// Combinations materialised per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Worker threads (0 = available cores).
    #[serde(default)]
    pub max_threads: usize,
    /// Per-run timeout in seconds (0 = none).
    #[serde(default)]
    pub job_timeout_secs: u64,
    /// Smaller batches run on the calling thread.
    #[serde(default = "default_min_parallel_jobs")]
    pub min_parallel_jobs: usize,
    /// Log per-batch progress.
    #[serde(default = "default_true")]
    pub track_progress: bool,
    /// Train/test split and out-of-sample validation.
    #[serde(default)]
    pub walk_forward: Option<WalkForwardConfig>,
}

impl SweepConfig {
    /// Scheduling settings for the coordinator.
    #[must_use]
    pub const fn parallel(&self) -> ParallelConfig {
        ParallelConfig {
            max_threads: self.max_threads,
            batch_size: self.batch_size,
            job_timeout_secs: self.job_timeout_secs,
            min_parallel_jobs: self.min_parallel_jobs,
            track_progress: self.track_progress,
        }
    }
}

const fn default_batch_size() -> usize {
    50
}

const fn default_min_parallel_jobs() -> usize {
    4
}

const fn default_true() -> bool {
    true
}
