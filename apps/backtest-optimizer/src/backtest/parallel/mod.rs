//! Parallel parameter sweeps using Rayon.
//!
//! A [`ParameterGrid`] enumerates every combination of strategy tunables in a
//! deterministic order. The [`OptimizationCoordinator`] walks the grid in
//! bounded batches, runs each combination as an isolated simulation on a
//! dedicated thread pool, and collects the reports into a [`ResultsTable`].
//!
//! Runs share nothing mutable. A failing, panicking or timed-out run is
//! logged and reported in [`SweepOutcome::failures`]; it never aborts the
//! sweep.
//!
//! # Example
//!
//! ```ignore
//! use backtest_optimizer::backtest::{RunConfig, StrategyKind};
//! use backtest_optimizer::backtest::parallel::{
//!     OptimizationCoordinator, ParallelConfig, ParameterGrid,
//! };
//!
//! let grid = ParameterGrid::builder()
//!     .add_int_param("short_period", vec![10, 20, 50])
//!     .add_range("long_period", 100.0, 250.0, 50.0)
//!     .build()?;
//!
//! let coordinator = OptimizationCoordinator::new(RunConfig::default(), ParallelConfig::default())?;
//! let outcome = coordinator.optimize(&series, &StrategyKind::MovingAverageCross, &grid, None)?;
//! println!("{}", outcome.table.to_csv());
//! ```

mod config;
mod error;
mod executor;
mod grid;
mod progress;
mod result;
mod types;

pub use config::ParallelConfig;
pub use error::SweepError;
pub use executor::OptimizationCoordinator;
pub use grid::{
    Batches, GridError, GridIter, ParamSpec, ParameterGrid, ParameterGridBuilder, ParameterSpecs,
};
pub use progress::{Progress, ProgressTracker, RunStatus};
pub use result::{ResultRow, ResultsTable, RunFailure, SweepOutcome};
pub use types::{ParamValue, ParameterSet};
