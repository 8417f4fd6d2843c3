//! Per-bar strategy simulation.
//!
//! The engine walks a [`BarSeries`] strictly in order, once per bar, with a
//! single position slot. Per bar it:
//!
//! 1. updates its ATR and the strategy's indicators
//! 2. if a position is open, ratchets the trailing stop and evaluates exits
//!    by priority: max hold time, take profit, stop loss / trailing stop,
//!    strategy signal (at most one exit per bar)
//! 3. if flat at the start of the bar and not on the last bar, applies the
//!    cooldown gate and asks the strategy for an entry
//! 4. marks the account to market and appends one equity sample
//!
//! Any position still open after the last bar is closed at the final close
//! and the last equity sample is restated, so no position dangles.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::bars::{Bar, BarSeries};
use super::config::RunConfig;
use super::indicators::{Atr, Indicator};
use super::parallel::ParameterSet;
use super::position::{Position, Side};
use super::risk::{
    RiskSettings, affordable_size, cooldown_elapsed, max_hold_exceeded, position_size,
    stop_and_target,
};
use super::strategy::{BarContext, Strategy, StrategyError, StrategyFactory};
use super::trade::{ExitReason, Trade};

/// Bars between deadline and cancellation checks.
const BUDGET_CHECK_INTERVAL: usize = 32;

/// Per-run failures. The sweep logs and skips these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The strategy could not be built or failed on the data.
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// The run exceeded its time budget.
    #[error("Run timed out after {seconds}s")]
    Timeout {
        /// Configured budget in seconds.
        seconds: u64,
    },

    /// The sweep was cancelled while the run was in progress.
    #[error("Run cancelled")]
    Cancelled,

    /// The run panicked.
    #[error("Run panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },
}

/// One portfolio-value sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Bar timestamp.
    pub timestamp: DateTime<Utc>,
    /// Cash plus marked-to-market position value.
    pub equity: f64,
}

/// Portfolio value per bar, owned by one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    /// Create an empty curve with room for `capacity` samples.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Append a sample.
    pub fn push(&mut self, timestamp: DateTime<Utc>, equity: f64) {
        self.points.push(EquityPoint { timestamp, equity });
    }

    /// All samples in bar order.
    #[must_use]
    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    /// Equity values in bar order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.equity)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent equity value.
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.points.last().map(|p| p.equity)
    }

    fn restate_last(&mut self, equity: f64) {
        if let Some(point) = self.points.last_mut() {
            point.equity = equity;
        }
    }
}

/// Trade history and equity curve of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Closed trades in exit order.
    pub trades: Vec<Trade>,
    /// One sample per bar.
    pub equity_curve: EquityCurve,
    /// Equity after the final bar, with every position closed.
    pub final_equity: f64,
}

/// Deterministic single-position strategy simulator.
#[derive(Debug, Clone)]
pub struct StrategyEngine {
    config: RunConfig,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl StrategyEngine {
    /// Create an engine for the given run configuration.
    #[must_use]
    pub const fn new(config: RunConfig) -> Self {
        Self {
            config,
            timeout: None,
            cancel: None,
        }
    }

    /// Fail runs that take longer than `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Abort runs when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run configuration.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Build the strategy and risk settings for `params` and run them.
    pub fn simulate<F: StrategyFactory + ?Sized>(
        &self,
        series: &BarSeries,
        factory: &F,
        params: &ParameterSet,
    ) -> Result<RunOutcome, RunError> {
        let risk = RiskSettings::resolve(&self.config, params)?;
        let mut strategy = factory.build(params)?;
        self.run(series, strategy.as_mut(), &risk)
    }

    /// Run `strategy` over `series`.
    pub fn run(
        &self,
        series: &BarSeries,
        strategy: &mut dyn Strategy,
        risk: &RiskSettings,
    ) -> Result<RunOutcome, RunError> {
        let started = Instant::now();
        let bars = series.bars();
        let bar_minutes = series.timeframe().minutes();
        let last_index = bars.len().saturating_sub(1);

        let mut atr = Atr::new(risk.atr_period).map_err(StrategyError::from)?;
        let mut account = Account::new(self.config.starting_cash, risk.commission);
        let mut position: Option<Position> = None;
        let mut last_trade_bar: Option<usize> = None;
        let mut trades = Vec::new();
        let mut equity_curve = EquityCurve::with_capacity(bars.len());

        for (index, bar) in bars.iter().enumerate() {
            if index % BUDGET_CHECK_INTERVAL == 0 {
                self.check_budget(started)?;
            }

            let atr_value = atr.update(bar);
            strategy.update(bar);
            let ctx = BarContext {
                index,
                bar,
                history: &bars[..=index],
                atr: atr_value,
            };

            if let Some(open) = position.as_mut() {
                if let Some(atr) = atr_value {
                    open.ratchet(bar.close, atr, risk.trailing_stop_atr);
                }

                let reason = if max_hold_exceeded(
                    open.entry_index,
                    index,
                    bar_minutes,
                    risk.max_hold_minutes,
                ) {
                    Some(ExitReason::MaxHoldTime)
                } else if let Some(reason) = open.price_exit(bar.close) {
                    Some(reason)
                } else if strategy.exit_signal(&ctx, open.side)? {
                    Some(ExitReason::Signal)
                } else {
                    None
                };

                if let (Some(reason), Some(open)) = (reason, position.take()) {
                    trades.push(account.close(open, bar, index, reason));
                    last_trade_bar = Some(index);
                }
            } else if index < last_index
                && cooldown_elapsed(last_trade_bar, index, risk.cooldown_bars)
                && let Some(side) = strategy.entry_signal(&ctx)?
                && let Some(atr) = atr_value
            {
                position = account.open(side, bar, index, atr, risk);
                if position.is_some() {
                    last_trade_bar = Some(index);
                }
            }

            equity_curve.push(bar.timestamp, account.mark(position.as_ref(), bar.close));
        }

        if let (Some(open), Some(bar)) = (position.take(), bars.last()) {
            trades.push(account.close(open, bar, last_index, ExitReason::EndOfData));
            equity_curve.restate_last(account.cash);
        }

        debug!(
            strategy = strategy.name(),
            bars = bars.len(),
            trades = trades.len(),
            final_equity = account.cash,
            "Simulation complete"
        );

        Ok(RunOutcome {
            trades,
            equity_curve,
            final_equity: account.cash,
        })
    }

    fn check_budget(&self, started: Instant) -> Result<(), RunError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(RunError::Cancelled);
        }
        if let Some(timeout) = self.timeout
            && started.elapsed() > timeout
        {
            return Err(RunError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
        Ok(())
    }
}

/// Cash ledger for a spot account with commission on both legs.
#[derive(Debug)]
struct Account {
    cash: f64,
    commission: f64,
}

impl Account {
    const fn new(cash: f64, commission: f64) -> Self {
        Self { cash, commission }
    }

    fn mark(&self, position: Option<&Position>, price: f64) -> f64 {
        self.cash + position.map_or(0.0, |p| p.market_value(price))
    }

    /// Open at the bar close. `None` when the sized position is empty.
    fn open(
        &mut self,
        side: Side,
        bar: &Bar,
        index: usize,
        atr: f64,
        risk: &RiskSettings,
    ) -> Option<Position> {
        let price = bar.close;
        let size = position_size(self.cash, risk.risk_per_trade, atr, risk.stop_loss_atr)
            .min(affordable_size(self.cash, price, self.commission));
        if size <= 0.0 || !size.is_finite() {
            return None;
        }

        let notional = size * price;
        let entry_commission = notional * self.commission;
        self.cash += side.sign().mul_add(-notional, -entry_commission);

        let (stop_loss, take_profit) =
            stop_and_target(price, side, atr, risk.stop_loss_atr, risk.take_profit_atr);

        trace!(index, %side, size, price, stop_loss, take_profit, "Entered position");

        Some(Position {
            side,
            size,
            entry_price: price,
            entry_index: index,
            entry_time: bar.timestamp,
            stop_loss,
            take_profit,
            trailing_stop: stop_loss,
            entry_commission,
        })
    }

    /// Close at the bar close and return the trade record.
    fn close(&mut self, position: Position, bar: &Bar, index: usize, reason: ExitReason) -> Trade {
        let price = bar.close;
        let notional = position.size * price;
        let exit_commission = notional * self.commission;
        self.cash += position.side.sign().mul_add(notional, -exit_commission);

        let commission = position.entry_commission + exit_commission;
        let pnl = position.gross_pnl(price) - commission;

        trace!(index, side = %position.side, price, pnl, %reason, "Exited position");

        Trade {
            side: position.side,
            size: position.size,
            entry_price: position.entry_price,
            exit_price: price,
            entry_index: position.entry_index,
            exit_index: index,
            entry_time: position.entry_time,
            exit_time: bar.timestamp,
            pnl,
            commission,
            exit_reason: reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::bars::test_support::series_from_closes;
    use crate::backtest::parallel::ParamValue;
    use crate::backtest::strategy::StrategyKind;

    /// Enters on fixed bars, optionally exits on a fixed bar.
    struct Scripted {
        entries: Vec<(usize, Side)>,
        exit_at: Option<usize>,
    }

    impl Strategy for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn update(&mut self, _bar: &Bar) {}

        fn entry_signal(&self, ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
            Ok(self
                .entries
                .iter()
                .find(|(i, _)| *i == ctx.index)
                .map(|(_, side)| *side))
        }

        fn exit_signal(&self, ctx: &BarContext<'_>, _side: Side) -> Result<bool, StrategyError> {
            Ok(self.exit_at == Some(ctx.index))
        }
    }

    /// Fails as soon as it is asked for a signal.
    struct Failing;

    impl Strategy for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn update(&mut self, _bar: &Bar) {}

        fn entry_signal(&self, _ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
            Err(StrategyError::Evaluation("boom".to_string()))
        }
    }

    fn risk() -> RiskSettings {
        RiskSettings {
            risk_per_trade: 0.02,
            stop_loss_atr: 1.2,
            take_profit_atr: 1_000.0,
            trailing_stop_atr: 1.0,
            atr_period: 1,
            cooldown_bars: 0,
            max_hold_minutes: None,
            commission: 0.0,
        }
    }

    fn engine() -> StrategyEngine {
        StrategyEngine::new(RunConfig {
            commission: 0.0,
            ..RunConfig::default()
        })
    }

    fn rising(n: usize) -> BarSeries {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        series_from_closes(&closes)
    }

    #[test]
    fn test_open_position_closed_at_end_of_data() {
        let series = rising(10);
        let mut strategy = Scripted {
            entries: vec![(1, Side::Long)],
            exit_at: None,
        };
        let outcome = engine().run(&series, &mut strategy, &risk()).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        let trade = &outcome.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.entry_index, 1);
        assert_eq!(trade.exit_index, 9);
        assert!(trade.pnl > 0.0);
        assert_eq!(outcome.equity_curve.len(), 10);
        assert_eq!(outcome.equity_curve.last(), Some(outcome.final_equity));
        assert!((outcome.final_equity - (1_000.0 + trade.pnl)).abs() < 1e-9);
    }

    #[test]
    fn test_no_entry_on_last_bar() {
        let series = rising(5);
        let mut strategy = Scripted {
            entries: vec![(4, Side::Long)],
            exit_at: None,
        };
        let outcome = engine().run(&series, &mut strategy, &risk()).unwrap();
        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.final_equity, 1_000.0);
    }

    #[test]
    fn test_max_hold_takes_priority_over_signal() {
        let series = rising(20);
        let mut strategy = Scripted {
            entries: vec![(1, Side::Long)],
            exit_at: Some(6),
        };
        let risk = RiskSettings {
            max_hold_minutes: Some(5),
            ..risk()
        };
        let outcome = engine().run(&series, &mut strategy, &risk).unwrap();
        assert_eq!(outcome.trades[0].exit_reason, ExitReason::MaxHoldTime);
        assert_eq!(outcome.trades[0].exit_index, 6);
    }

    #[test]
    fn test_signal_exit_and_single_position() {
        let series = rising(20);
        let mut strategy = Scripted {
            entries: vec![(1, Side::Long), (2, Side::Long), (3, Side::Short)],
            exit_at: Some(4),
        };
        let outcome = engine().run(&series, &mut strategy, &risk()).unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].exit_reason, ExitReason::Signal);
        assert_eq!(outcome.trades[0].exit_index, 4);
    }

    #[test]
    fn test_no_reentry_on_exit_bar() {
        let series = rising(20);
        let mut strategy = Scripted {
            entries: vec![(1, Side::Long), (4, Side::Long), (5, Side::Long)],
            exit_at: Some(4),
        };
        let outcome = engine().run(&series, &mut strategy, &risk()).unwrap();
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[1].entry_index, 5);
    }

    #[test]
    fn test_cooldown_blocks_entries() {
        let series = rising(20);
        let mut strategy = Scripted {
            entries: vec![(1, Side::Long), (5, Side::Long), (12, Side::Long)],
            exit_at: Some(3),
        };
        let risk = RiskSettings {
            cooldown_bars: 5,
            ..risk()
        };
        let outcome = engine().run(&series, &mut strategy, &risk).unwrap();

        // Exit at 3 re-anchors the cooldown, so the bar-5 signal is ignored.
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[1].entry_index, 12);
    }

    #[test]
    fn test_short_stop_loss_in_rising_market() {
        let series = rising(20);
        let mut strategy = Scripted {
            entries: vec![(1, Side::Short)],
            exit_at: None,
        };
        let outcome = engine().run(&series, &mut strategy, &risk()).unwrap();
        let trade = &outcome.trades[0];
        assert!(matches!(
            trade.exit_reason,
            ExitReason::StopLoss | ExitReason::TrailingStop
        ));
        assert!(trade.pnl < 0.0);
        assert!(trade.exit_index > trade.entry_index);
    }

    #[test]
    fn test_commission_charged_on_both_legs() {
        let series = rising(10);
        let mut strategy = Scripted {
            entries: vec![(1, Side::Long)],
            exit_at: Some(5),
        };
        let engine = StrategyEngine::new(RunConfig {
            commission: 0.01,
            ..RunConfig::default()
        });
        let risk = RiskSettings {
            commission: 0.01,
            ..risk()
        };
        let outcome = engine.run(&series, &mut strategy, &risk).unwrap();
        let trade = &outcome.trades[0];

        let expected = trade.size * (trade.entry_price + trade.exit_price) * 0.01;
        assert!((trade.commission - expected).abs() < 1e-9);
        assert!((trade.gross_pnl() - trade.size * 4.0).abs() < 1e-9);
        assert!((outcome.final_equity - (1_000.0 + trade.pnl)).abs() < 1e-9);
    }

    #[test]
    fn test_strategy_error_propagates() {
        let series = rising(5);
        let result = engine().run(&series, &mut Failing, &risk());
        assert!(matches!(result, Err(RunError::Strategy(_))));
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let engine = engine().with_cancellation(token);
        let mut strategy = Scripted {
            entries: Vec::new(),
            exit_at: None,
        };
        let result = engine.run(&rising(5), &mut strategy, &risk());
        assert_eq!(result, Err(RunError::Cancelled));
    }

    #[test]
    fn test_simulate_rejects_bad_parameters() {
        let params: ParameterSet = [("atr_period", ParamValue::Int(0))].into_iter().collect();
        let result = engine().simulate(&rising(5), &StrategyKind::SpotDayTrading, &params);
        assert!(matches!(result, Err(RunError::Strategy(_))));
    }

    /// Sleeps on every bar so the time budget runs out.
    struct Sleepy;

    impl Strategy for Sleepy {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        fn update(&mut self, _bar: &Bar) {
            std::thread::sleep(Duration::from_millis(1));
        }

        fn entry_signal(&self, _ctx: &BarContext<'_>) -> Result<Option<Side>, StrategyError> {
            Ok(None)
        }
    }

    #[test]
    fn test_slow_run_times_out() {
        let engine = engine().with_timeout(Duration::from_millis(1));
        let result = engine.run(&rising(40), &mut Sleepy, &risk());
        assert!(matches!(result, Err(RunError::Timeout { .. })));
    }

    #[test]
    fn test_fast_run_within_budget() {
        let engine = engine().with_timeout(Duration::from_secs(60));
        let result = engine.run(&rising(40), &mut Sleepy, &risk());
        assert!(result.is_ok());
    }

    #[test]
    fn test_flat_zero_volume_series_never_trades() {
        let series = series_from_closes(&[50.0; 30]);
        let bars: Vec<Bar> = series
            .bars()
            .iter()
            .map(|b| Bar {
                high: b.close,
                low: b.close,
                volume: 0.0,
                ..*b
            })
            .collect();
        let series = BarSeries::new("FLAT", series.timeframe(), bars).unwrap();

        let mut strategy = Scripted {
            entries: (0..30).map(|i| (i, Side::Long)).collect(),
            exit_at: None,
        };
        let outcome = engine().run(&series, &mut strategy, &risk()).unwrap();
        assert!(outcome.trades.is_empty());
        assert!(outcome.equity_curve.values().all(|v| v == 1_000.0));
    }
}
