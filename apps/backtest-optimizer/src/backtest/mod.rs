//! Strategy simulation and parameter-sweep optimization.
//!
//! This module provides the full backtesting pipeline:
//!
//! - **Bars**: Validated OHLCV series shared by reference across runs
//! - **Indicators**: Streaming EMA, SMA, RSI, MACD, ATR, VWAP and rolling extremes
//! - **Strategies**: Per-bar entry/exit state machines built from parameter sets
//! - **Engine**: Bar-by-bar simulation with ATR sizing, stops, cooldown and max hold
//! - **Metrics**: Return, risk and trade statistics for one run
//! - **Parallel**: Grid enumeration and batched sweeps on a Rayon pool
//! - **Walk-forward**: Train/test split and out-of-sample degradation analysis
//!
//! # Example
//!
//! ```ignore
//! use backtest_optimizer::backtest::{
//!     PerformanceAnalyzer, RunConfig, StrategyEngine, StrategyKind,
//! };
//!
//! let engine = StrategyEngine::new(RunConfig::default());
//! let outcome = engine.simulate(&series, &StrategyKind::QuickFlip, &params)?;
//!
//! let report = PerformanceAnalyzer::new(1_000.0)
//!     .with_periods_per_year(series.timeframe().periods_per_year())
//!     .analyze(&outcome.trades, &outcome.equity_curve);
//! ```

mod bars;
mod config;
mod engine;
pub mod indicators;
pub mod metrics;
pub mod parallel;
mod position;
mod risk;
pub mod strategy;
mod trade;
pub mod walkforward;

pub use bars::{Bar, BarSeries, BarSeriesError, SeriesInput, Timeframe};
pub use config::{InvalidSetting, RunConfig};
pub use engine::{EquityCurve, EquityPoint, RunError, RunOutcome, StrategyEngine};
pub use metrics::{MetricKey, MetricsReport, PerformanceAnalyzer, ProfitFactor};
pub use parallel::{
    OptimizationCoordinator, ParallelConfig, ParamSpec, ParamValue, ParameterGrid, ParameterSet,
    ParameterSpecs, ResultsTable, SweepError, SweepOutcome,
};
pub use position::{Position, Side};
pub use risk::{
    RiskSettings, affordable_size, cooldown_elapsed, max_hold_exceeded, position_size,
    ratchet_trailing_stop, stop_and_target,
};
pub use strategy::{BarContext, Strategy, StrategyError, StrategyFactory, StrategyKind};
pub use trade::{ExitReason, Trade};
pub use walkforward::{WalkForwardConfig, WalkForwardReport, WalkForwardSplitter};
