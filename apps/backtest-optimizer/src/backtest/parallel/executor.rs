//! Parameter sweep coordinator using Rayon.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, info, span, warn};

use crate::backtest::bars::{BarSeries, SeriesInput};
use crate::backtest::config::RunConfig;
use crate::backtest::engine::{RunError, StrategyEngine};
use crate::backtest::metrics::{MetricsReport, PerformanceAnalyzer};
use crate::backtest::strategy::StrategyFactory;
use crate::backtest::walkforward::{
    OutOfSampleResult, WalkForwardConfig, WalkForwardReport, WalkForwardSplitter, summarize,
};
use crate::observability;

use super::config::ParallelConfig;
use super::error::SweepError;
use super::grid::ParameterGrid;
use super::progress::{ProgressTracker, RunStatus};
use super::result::{ResultsTable, RunFailure, SweepOutcome};
use super::types::ParameterSet;

/// Drives one simulation per grid combination and collects the reports.
///
/// Runs share nothing mutable: each worker gets the series by reference,
/// builds its own strategy and engine, and returns its own report. The
/// coordinator appends reports in grid order after each batch.
#[derive(Debug)]
pub struct OptimizationCoordinator {
    run_config: RunConfig,
    parallel: ParallelConfig,
    pool: rayon::ThreadPool,
    cancel: CancellationToken,
}

impl OptimizationCoordinator {
    /// Validate configuration and build the worker pool.
    ///
    /// # Errors
    ///
    /// Returns an error if a setting is out of range or the pool cannot start.
    pub fn new(run_config: RunConfig, parallel: ParallelConfig) -> Result<Self, SweepError> {
        run_config.validate()?;
        parallel.validate()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(parallel.max_threads)
            .thread_name(|i| format!("sweep-worker-{i}"))
            .build()
            .map_err(|e| SweepError::ThreadPool {
                message: e.to_string(),
            })?;

        Ok(Self {
            run_config,
            parallel,
            pool,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that aborts the remaining grid when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort the remaining grid; completed rows are kept.
    pub fn cancel(&self) {
        warn!("Sweep cancellation requested");
        self.cancel.cancel();
    }

    /// Worker threads in the pool.
    #[must_use]
    pub fn effective_thread_count(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Sweep `grid` over `series`, building one strategy per run from `factory`.
    ///
    /// With walk-forward enabled the sweep sees only the train prefix, and the
    /// best sets are then re-run on the held-out suffix.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid walk-forward settings or a series too
    /// short to split. Individual run failures are collected, not returned.
    #[allow(clippy::cast_possible_truncation)]
    pub fn optimize<F: StrategyFactory + ?Sized>(
        &self,
        series: &BarSeries,
        factory: &F,
        grid: &ParameterGrid,
        walk_forward: Option<&WalkForwardConfig>,
    ) -> Result<SweepOutcome, SweepError> {
        let started = Instant::now();

        let (sweep_series, holdout) = match walk_forward {
            Some(config) => {
                config.validate()?;
                let (train, test) = WalkForwardSplitter::new(config.train_ratio)?.split(series)?;
                (train, Some((config, test)))
            }
            None => (series.clone(), None),
        };

        let total = grid.total_combinations();
        let batches = grid.batches(self.parallel.batch_size)?;
        info!(
            symbol = series.symbol(),
            strategy = factory.name(),
            total,
            batches = batches.len(),
            bars = sweep_series.len(),
            threads = self.effective_thread_count(),
            "Starting parameter sweep"
        );
        observability::record_combinations(total);

        let tracker = ProgressTracker::new(total as u64);
        let mut table = ResultsTable::new(grid.names().map(String::from).collect());
        let mut failures = Vec::new();
        let mut offset = 0;

        for batch in batches {
            if self.cancel.is_cancelled() {
                break;
            }

            let results = self.run_batch(&sweep_series, factory, &batch, offset, &tracker);
            let batch_len = batch.len();
            for (i, (params, result)) in batch.into_iter().zip(results).enumerate() {
                match result {
                    Ok(report) => table.push(params, report),
                    Err(error) => failures.push(RunFailure {
                        index: offset + i,
                        params,
                        error,
                    }),
                }
            }
            offset += batch_len;

            if self.parallel.track_progress {
                let progress = tracker.progress();
                debug!(
                    percent = progress.percentage(),
                    finished = progress.finished(),
                    total = progress.total,
                    eta_secs = progress.eta_secs,
                    runs_per_sec = progress.runs_per_sec,
                    "Sweep progress"
                );
            }
        }

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!(
                completed = table.len(),
                remaining = total - offset,
                "Sweep cancelled; keeping completed results"
            );
        }

        let out_of_sample = match holdout {
            Some((config, test)) if !cancelled => {
                Some(self.validate_out_of_sample(&table, &test, sweep_series.len(), factory, config))
            }
            _ => None,
        };

        let outcome = SweepOutcome {
            symbol: series.symbol().to_string(),
            strategy: factory.name().to_string(),
            completed: table.len(),
            failed: failures.len(),
            table,
            failures,
            total_combinations: total,
            cancelled,
            elapsed_ms: started.elapsed().as_millis() as u64,
            out_of_sample,
        };

        info!(
            symbol = %outcome.symbol,
            completed = outcome.completed,
            failed = outcome.failed,
            total,
            elapsed_ms = outcome.elapsed_ms,
            "Parameter sweep complete"
        );

        Ok(outcome)
    }

    /// Sweep several series with the same grid.
    ///
    /// Series that fail validation or are too short to split are logged and
    /// skipped; the rest are swept in order.
    ///
    /// # Errors
    ///
    /// Returns configuration errors, which would fail every series alike.
    pub fn optimize_many<F: StrategyFactory + ?Sized>(
        &self,
        inputs: &[SeriesInput],
        factory: &F,
        grid: &ParameterGrid,
        walk_forward: Option<&WalkForwardConfig>,
    ) -> Result<Vec<SweepOutcome>, SweepError> {
        if let Some(config) = walk_forward {
            config.validate()?;
            WalkForwardSplitter::new(config.train_ratio)?;
        }

        let mut outcomes = Vec::with_capacity(inputs.len());
        for input in inputs {
            if self.cancel.is_cancelled() {
                break;
            }

            let series = match input.clone().into_series() {
                Ok(series) => series,
                Err(error) => {
                    warn!(symbol = %input.symbol, %error, "Skipping invalid bar series");
                    continue;
                }
            };

            match self.optimize(&series, factory, grid, walk_forward) {
                Ok(outcome) => outcomes.push(outcome),
                Err(SweepError::Split(error)) => {
                    warn!(symbol = %input.symbol, %error, "Skipping series too short to split");
                }
                Err(error) => return Err(error),
            }
        }

        Ok(outcomes)
    }

    fn run_batch<F: StrategyFactory + ?Sized>(
        &self,
        series: &BarSeries,
        factory: &F,
        batch: &[ParameterSet],
        offset: usize,
        tracker: &ProgressTracker,
    ) -> Vec<Result<MetricsReport, RunError>> {
        let run = |(i, params): (usize, &ParameterSet)| {
            self.execute_run(series, factory, params, offset + i, tracker)
        };

        if batch.len() >= self.parallel.min_parallel_jobs {
            self.pool
                .install(|| batch.par_iter().enumerate().map(&run).collect())
        } else {
            batch.iter().enumerate().map(&run).collect()
        }
    }

    fn execute_run<F: StrategyFactory + ?Sized>(
        &self,
        series: &BarSeries,
        factory: &F,
        params: &ParameterSet,
        index: usize,
        tracker: &ProgressTracker,
    ) -> Result<MetricsReport, RunError> {
        let span = span!(Level::DEBUG, "sweep_run", index);
        let _enter = span.enter();
        let started = Instant::now();

        let result = if self.cancel.is_cancelled() {
            Err(RunError::Cancelled)
        } else {
            self.simulate(series, factory, params)
        };

        let status = match &result {
            Ok(_) => RunStatus::Completed,
            Err(RunError::Timeout { .. }) => RunStatus::TimedOut,
            Err(_) => RunStatus::Failed,
        };
        tracker.record(status);
        observability::record_run(status, started.elapsed());

        match &result {
            Err(RunError::Cancelled) => debug!(index, "Run cancelled"),
            Err(error) => warn!(index, params = %params, %error, "Run failed; excluded from results"),
            Ok(_) => {}
        }

        result
    }

    /// One isolated run: panics inside the strategy become `RunError::Panicked`.
    fn simulate<F: StrategyFactory + ?Sized>(
        &self,
        series: &BarSeries,
        factory: &F,
        params: &ParameterSet,
    ) -> Result<MetricsReport, RunError> {
        let mut engine =
            StrategyEngine::new(self.run_config.clone()).with_cancellation(self.cancel.clone());
        if let Some(timeout) = self.parallel.job_timeout() {
            engine = engine.with_timeout(timeout);
        }

        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| engine.simulate(series, factory, params)))
                .map_err(|payload| RunError::Panicked {
                    message: panic_message(payload.as_ref()),
                })??;

        let analyzer = PerformanceAnalyzer::new(self.run_config.starting_cash)
            .with_periods_per_year(series.timeframe().periods_per_year())
            .with_risk_free_rate(self.run_config.risk_free_rate);
        Ok(analyzer.analyze(&outcome.trades, &outcome.equity_curve))
    }

    fn validate_out_of_sample<F: StrategyFactory + ?Sized>(
        &self,
        table: &ResultsTable,
        test: &BarSeries,
        train_bars: usize,
        factory: &F,
        config: &WalkForwardConfig,
    ) -> WalkForwardReport {
        let selected = table.top_by_sharpe(config.top_n);
        info!(
            selected = selected.len(),
            test_bars = test.len(),
            "Validating best parameter sets out of sample"
        );

        let runs: Vec<_> = self.pool.install(|| {
            selected
                .par_iter()
                .map(|row| (*row, self.simulate(test, factory, &row.params)))
                .collect()
        });

        let mut results = Vec::with_capacity(runs.len());
        let mut failed = 0;
        for (row, run) in runs {
            match run {
                Ok(out_of_sample) => results.push(OutOfSampleResult::new(
                    row.params.clone(),
                    row.report.clone(),
                    out_of_sample,
                )),
                Err(error) => {
                    failed += 1;
                    warn!(params = %row.params, %error, "Out-of-sample run failed");
                }
            }
        }

        let summary = summarize(&results, config.overfitting_threshold);
        if let Some(warning) = &summary.warning {
            warn!(%warning, "Out-of-sample degradation detected");
        }

        WalkForwardReport {
            train_bars,
            test_bars: test.len(),
            results,
            failed,
            summary,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
