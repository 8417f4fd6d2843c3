//! Backtest Optimizer Binary
//!
//! Runs one parameter sweep and prints the results table as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin backtest-optimizer -- bars.json [config.yaml]
//! ```
//!
//! `bars.json` holds an array of `{symbol, timeframe, bars}` objects. The
//! config path defaults to `config.yaml`.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter, overrides `logging.level`
//! - Any `${VAR}` referenced from the config file

use std::io::Write;

use anyhow::{Context, Result};
use backtest_optimizer::backtest::ParameterGrid;
use backtest_optimizer::backtest::metrics::format_pct;
use backtest_optimizer::telemetry::init_tracing;
use backtest_optimizer::{OptimizationCoordinator, SeriesInput, load_config};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let bars_path = args
        .next()
        .context("usage: backtest-optimizer <bars.json> [config.yaml]")?;
    let config_path = args.next();

    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    tracing::info!(
        strategy = %config.sweep.strategy,
        bars = %bars_path,
        "Starting Backtest Optimizer"
    );

    let raw = std::fs::read_to_string(&bars_path)
        .with_context(|| format!("Failed to read bar file '{bars_path}'"))?;
    let inputs: Vec<SeriesInput> =
        serde_json::from_str(&raw).with_context(|| format!("Invalid bar file '{bars_path}'"))?;

    let grid = ParameterGrid::from_parameter_specs(&config.sweep.parameters)?;
    let coordinator = OptimizationCoordinator::new(config.run.clone(), config.sweep.parallel())?;
    let outcomes = coordinator.optimize_many(
        &inputs,
        &config.sweep.strategy,
        &grid,
        config.sweep.walk_forward.as_ref(),
    )?;

    let mut out = std::io::stdout().lock();
    for outcome in &outcomes {
        if let Some(best) = outcome.table.best_by_sharpe() {
            tracing::info!(
                symbol = %outcome.symbol,
                params = %best.params,
                total_return = %format_pct(best.report.total_return),
                "Best parameter set"
            );
        }
        if let Some(report) = &outcome.out_of_sample {
            tracing::info!(
                symbol = %outcome.symbol,
                validated = report.summary.validated,
                overfit = report.summary.overfit_count,
                "Out-of-sample validation"
            );
        }

        writeln!(out, "# {} {}", outcome.symbol, outcome.strategy)?;
        out.write_all(outcome.table.to_csv().as_bytes())?;
    }

    tracing::info!(series = outcomes.len(), "Backtest Optimizer finished");
    Ok(())
}
