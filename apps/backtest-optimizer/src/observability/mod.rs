//! Observability for parameter sweeps.
//!
//! Log output is configured by [`crate::telemetry`]; this module holds the
//! counters and histograms emitted while a sweep runs.

mod metrics;

pub use metrics::{
    SWEEP_COMBINATIONS_TOTAL, SWEEP_RUN_DURATION_SECONDS, SWEEP_RUNS_TOTAL, record_combinations,
    record_run,
};
