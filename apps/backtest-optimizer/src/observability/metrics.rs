//! Sweep metrics recorded through the `metrics` facade.
//!
//! The library installs no recorder. Embedders that want the numbers install
//! their own exporter; without one every call here is a no-op.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::backtest::parallel::RunStatus;

/// Runs finished, labelled by `outcome`.
pub const SWEEP_RUNS_TOTAL: &str = "sweep_runs_total";
/// Wall-clock time of one run.
pub const SWEEP_RUN_DURATION_SECONDS: &str = "sweep_run_duration_seconds";
/// Parameter combinations scheduled.
pub const SWEEP_COMBINATIONS_TOTAL: &str = "sweep_combinations_total";

// ============================================================================
// Sweep Metrics
// ============================================================================

/// Record one finished run.
///
/// # Arguments
///
/// * `status` - How the run ended
/// * `elapsed` - Wall-clock time spent in the run
pub fn record_run(status: RunStatus, elapsed: Duration) {
    counter!(SWEEP_RUNS_TOTAL, "outcome" => status.as_label()).increment(1);
    histogram!(SWEEP_RUN_DURATION_SECONDS, "outcome" => status.as_label())
        .record(elapsed.as_secs_f64());
}

/// Record the size of a grid about to be swept.
pub fn record_combinations(total: usize) {
    counter!(SWEEP_COMBINATIONS_TOTAL).increment(total as u64);
}
