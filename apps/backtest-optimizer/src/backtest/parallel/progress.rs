//! Progress tracking shared by sweep workers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// How a single run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Produced a metrics report.
    Completed,
    /// Strategy error, panic or cancellation.
    Failed,
    /// Exceeded the per-run budget.
    TimedOut,
}

impl RunStatus {
    /// Metric label for this status.
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Lock-free counters updated from worker threads.
#[derive(Debug)]
pub struct ProgressTracker {
    total: u64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    started: Instant,
}

impl ProgressTracker {
    /// Start tracking a sweep of `total` runs.
    #[must_use]
    pub fn new(total: u64) -> Self {
        Self {
            total,
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    /// Count one finished run.
    pub fn record(&self, status: RunStatus) {
        let counter = match status {
            RunStatus::Completed => &self.completed,
            RunStatus::Failed => &self.failed,
            RunStatus::TimedOut => &self.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn progress(&self) -> Progress {
        let completed = self.completed.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let timed_out = self.timed_out.load(Ordering::Relaxed);
        let finished = completed + failed + timed_out;
        let elapsed = self.started.elapsed().as_secs_f64();

        let runs_per_sec = if elapsed > 0.0 {
            finished as f64 / elapsed
        } else {
            0.0
        };
        let eta_secs = if runs_per_sec > 0.0 {
            (self.total.saturating_sub(finished) as f64 / runs_per_sec) as u64
        } else {
            0
        };

        Progress {
            total: self.total,
            completed,
            failed,
            timed_out,
            elapsed_secs: elapsed as u64,
            eta_secs,
            runs_per_sec,
        }
    }
}

/// Progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Runs in the sweep.
    pub total: u64,
    /// Runs that produced a report.
    pub completed: u64,
    /// Runs that failed.
    pub failed: u64,
    /// Runs that hit the time budget.
    pub timed_out: u64,
    /// Seconds since the sweep started.
    pub elapsed_secs: u64,
    /// Estimated seconds remaining.
    pub eta_secs: u64,
    /// Throughput so far.
    pub runs_per_sec: f64,
}

impl Progress {
    /// Runs finished in any state.
    #[must_use]
    pub const fn finished(&self) -> u64 {
        self.completed + self.failed + self.timed_out
    }

    /// Completion percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.finished() as f64 / self.total as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counts_each_status() {
        let tracker = ProgressTracker::new(10);

        tracker.record(RunStatus::Completed);
        tracker.record(RunStatus::Completed);
        tracker.record(RunStatus::Failed);
        tracker.record(RunStatus::TimedOut);

        let progress = tracker.progress();
        assert_eq!(progress.total, 10);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.timed_out, 1);
        assert_eq!(progress.finished(), 4);
        assert!((progress.percentage() - 40.0).abs() < 0.1);
    }

    #[test]
    fn test_empty_sweep_is_complete() {
        let progress = ProgressTracker::new(0).progress();
        assert!((progress.percentage() - 100.0).abs() < f64::EPSILON);
        assert_eq!(progress.eta_secs, 0);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(RunStatus::Completed.as_label(), "completed");
        assert_eq!(RunStatus::TimedOut.as_label(), "timed_out");
    }
}
