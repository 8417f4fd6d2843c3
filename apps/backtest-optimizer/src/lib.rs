// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Backtest Optimizer - Rust Core Library
//!
//! Deterministic strategy simulation and parameter-sweep optimization.
//!
//! # Architecture
//!
//! - **Backtest**: The simulation-and-optimization engine
//!   - `bars`: Validated OHLCV series
//!   - `indicators`: Streaming technical indicators
//!   - `strategy`: Per-bar strategy state machines and their registry
//!   - `engine`: Bar-by-bar simulation with risk-managed exits
//!   - `metrics`: Performance analysis of one run
//!   - `parallel`: Parameter grids and the sweep coordinator
//!   - `walkforward`: Train/test validation of the best parameter sets
//!
//! - **Ambient**
//!   - `config`: YAML configuration with environment interpolation
//!   - `telemetry`: Tracing subscriber setup
//!   - `observability`: Sweep counters and histograms

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Simulation and Optimization
// =============================================================================

/// Strategy simulation, performance metrics and parameter sweeps.
pub mod backtest;

// =============================================================================
// Configuration and Observability
// =============================================================================

/// YAML configuration loading and validation.
pub mod config;

/// Sweep metrics recorded through the `metrics` facade.
pub mod observability;

/// Tracing subscriber initialisation.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use backtest::{
    BarSeries, MetricsReport, OptimizationCoordinator, ParameterGrid, ParameterSet, RunConfig,
    SeriesInput, StrategyEngine, StrategyFactory, StrategyKind, SweepError, SweepOutcome,
};
pub use config::{Config, ConfigError, load_config, load_config_from_string};
