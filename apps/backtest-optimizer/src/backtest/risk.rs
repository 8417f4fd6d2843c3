//! Position sizing, protective levels and entry/exit gates.
//!
//! Everything here is a pure function of its inputs. Numeric degeneracies
//! (zero ATR, non-finite values) resolve to a zero size rather than an error
//! so a flat or illiquid bar simply produces no trade.

use serde::{Deserialize, Serialize};

use super::config::RunConfig;
use super::parallel::ParameterSet;
use super::position::Side;
use super::strategy::{StrategyError, params};

/// Units to trade so that a stop-out loses `equity * risk_fraction`.
///
/// Returns `0.0` when the stop distance `atr * stop_multiplier` is not
/// strictly positive or any input is non-finite.
#[must_use]
pub fn position_size(equity: f64, risk_fraction: f64, atr: f64, stop_multiplier: f64) -> f64 {
    let stop_distance = atr * stop_multiplier;
    if !(equity.is_finite() && risk_fraction.is_finite() && stop_distance.is_finite())
        || stop_distance <= 0.0
    {
        return 0.0;
    }

    let size = equity * risk_fraction / stop_distance;
    if size.is_finite() && size > 0.0 { size } else { 0.0 }
}

/// Largest size whose notional plus entry commission fits in `cash`.
#[must_use]
pub fn affordable_size(cash: f64, price: f64, commission: f64) -> f64 {
    if cash <= 0.0 || price <= 0.0 {
        return 0.0;
    }
    cash / (price * (1.0 + commission))
}

/// Initial `(stop_loss, take_profit)` for a fill at `entry_price`.
#[must_use]
pub fn stop_and_target(
    entry_price: f64,
    side: Side,
    atr: f64,
    stop_multiplier: f64,
    target_multiplier: f64,
) -> (f64, f64) {
    let stop_distance = atr * stop_multiplier;
    let target_distance = atr * target_multiplier;
    match side {
        Side::Long => (entry_price - stop_distance, entry_price + target_distance),
        Side::Short => (entry_price + stop_distance, entry_price - target_distance),
    }
}

/// Tighten a trailing stop; never loosens it.
#[must_use]
pub fn ratchet_trailing_stop(side: Side, current: f64, close: f64, atr: f64, k: f64) -> f64 {
    let candidate = match side {
        Side::Long => close - k * atr,
        Side::Short => close + k * atr,
    };
    if !candidate.is_finite() {
        return current;
    }
    match side {
        Side::Long => current.max(candidate),
        Side::Short => current.min(candidate),
    }
}

/// True when at least `cooldown` bars have passed since the last trade event.
#[must_use]
pub const fn cooldown_elapsed(last_trade_bar: Option<usize>, index: usize, cooldown: usize) -> bool {
    match last_trade_bar {
        None => true,
        Some(anchor) => index.saturating_sub(anchor) >= cooldown,
    }
}

/// True when the elapsed holding time reaches the configured maximum.
#[must_use]
pub fn max_hold_exceeded(
    entry_index: usize,
    index: usize,
    bar_minutes: u32,
    max_hold_minutes: Option<u64>,
) -> bool {
    let Some(max_minutes) = max_hold_minutes else {
        return false;
    };
    let elapsed_bars = index.saturating_sub(entry_index) as u64;
    elapsed_bars.saturating_mul(u64::from(bar_minutes)) >= max_minutes
}

/// Effective risk settings for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSettings {
    /// Fraction of equity risked per trade.
    pub risk_per_trade: f64,
    /// Stop distance in ATR multiples.
    pub stop_loss_atr: f64,
    /// Target distance in ATR multiples.
    pub take_profit_atr: f64,
    /// Trailing distance in ATR multiples.
    pub trailing_stop_atr: f64,
    /// ATR window.
    pub atr_period: usize,
    /// Bars between trade events.
    pub cooldown_bars: usize,
    /// Holding limit in minutes.
    pub max_hold_minutes: Option<u64>,
    /// Commission rate per fill.
    pub commission: f64,
}

impl RiskSettings {
    /// Overlay parameter-set overrides on the run defaults.
    pub fn resolve(config: &RunConfig, params: &ParameterSet) -> Result<Self, StrategyError> {
        let risk_per_trade = params::positive(params, "risk_per_trade", config.risk_per_trade)?;
        if risk_per_trade > 1.0 {
            return Err(StrategyError::invalid("risk_per_trade", "must not exceed 1"));
        }

        let max_hold_minutes = match params.get("max_hold_time") {
            Some(_) => Some(params::period(params, "max_hold_time", 1)? as u64),
            None => config.max_hold_minutes,
        };

        Ok(Self {
            risk_per_trade,
            stop_loss_atr: params::positive(params, "stop_loss_atr", config.stop_loss_atr)?,
            take_profit_atr: params::positive(params, "take_profit_atr", config.take_profit_atr)?,
            trailing_stop_atr: params::positive(
                params,
                "trailing_stop_atr",
                config.trailing_stop_atr,
            )?,
            atr_period: params::period(params, "atr_period", config.atr_period)?,
            cooldown_bars: params::count(params, "cooldown_period", config.cooldown_bars)?,
            max_hold_minutes,
            commission: config.commission,
        })
    }
}

impl Default for RiskSettings {
    fn default() -> Self {
        let config = RunConfig::default();
        Self {
            risk_per_trade: config.risk_per_trade,
            stop_loss_atr: config.stop_loss_atr,
            take_profit_atr: config.take_profit_atr,
            trailing_stop_atr: config.trailing_stop_atr,
            atr_period: config.atr_period,
            cooldown_bars: config.cooldown_bars,
            max_hold_minutes: config.max_hold_minutes,
            commission: config.commission,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::backtest::parallel::ParamValue;

    #[test]
    fn test_position_size_basic() {
        // 1000 * 0.02 / (2 * 1.2)
        let size = position_size(1_000.0, 0.02, 2.0, 1.2);
        assert!((size - 20.0 / 2.4).abs() < 1e-12);
    }

    #[test_case(0.0, 1.2 ; "zero atr")]
    #[test_case(2.0, 0.0 ; "zero multiplier")]
    #[test_case(-1.0, 1.2 ; "negative atr")]
    #[test_case(f64::NAN, 1.2 ; "nan atr")]
    #[test_case(f64::INFINITY, 1.2 ; "infinite atr")]
    fn test_position_size_degenerate_is_zero(atr: f64, multiplier: f64) {
        assert_eq!(position_size(1_000.0, 0.02, atr, multiplier), 0.0);
    }

    #[test]
    fn test_affordable_size_includes_commission() {
        let size = affordable_size(1_010.0, 100.0, 0.01);
        assert!((size - 10.0).abs() < 1e-12);
        assert_eq!(affordable_size(0.0, 100.0, 0.0), 0.0);
    }

    #[test]
    fn test_stop_and_target_sides() {
        assert_eq!(stop_and_target(100.0, Side::Long, 2.0, 1.5, 2.0), (97.0, 104.0));
        assert_eq!(stop_and_target(100.0, Side::Short, 2.0, 1.5, 2.0), (103.0, 96.0));
    }

    #[test]
    fn test_ratchet_never_loosens() {
        assert_eq!(ratchet_trailing_stop(Side::Long, 95.0, 100.0, 2.0, 1.0), 98.0);
        assert_eq!(ratchet_trailing_stop(Side::Long, 98.0, 97.0, 2.0, 1.0), 98.0);
        assert_eq!(ratchet_trailing_stop(Side::Short, 105.0, 100.0, 2.0, 1.0), 102.0);
        assert_eq!(ratchet_trailing_stop(Side::Short, 102.0, 103.0, 2.0, 1.0), 102.0);
    }

    #[test]
    fn test_cooldown_gate() {
        assert!(cooldown_elapsed(None, 0, 25));
        assert!(!cooldown_elapsed(Some(10), 20, 25));
        assert!(cooldown_elapsed(Some(10), 35, 25));
        assert!(cooldown_elapsed(Some(10), 10, 0));
    }

    #[test]
    fn test_max_hold_gate() {
        // 15-minute bars, 720-minute limit: 48 bars.
        assert!(!max_hold_exceeded(0, 47, 15, Some(720)));
        assert!(max_hold_exceeded(0, 48, 15, Some(720)));
        assert!(!max_hold_exceeded(0, 10_000, 15, None));
    }

    #[test]
    fn test_settings_overlay_parameters() {
        let params: ParameterSet = [
            ("stop_loss_atr", ParamValue::Float(1.5)),
            ("cooldown_period", ParamValue::Int(0)),
            ("max_hold_time", ParamValue::Int(60)),
        ]
        .into_iter()
        .collect();

        let settings = RiskSettings::resolve(&RunConfig::default(), &params).unwrap();
        assert_eq!(settings.stop_loss_atr, 1.5);
        assert_eq!(settings.cooldown_bars, 0);
        assert_eq!(settings.max_hold_minutes, Some(60));
        assert_eq!(settings.take_profit_atr, 2.0);
    }

    #[test]
    fn test_settings_reject_bad_override() {
        let params: ParameterSet = [("atr_period", ParamValue::Int(0))].into_iter().collect();
        assert!(RiskSettings::resolve(&RunConfig::default(), &params).is_err());

        let params: ParameterSet = [("take_profit_atr", ParamValue::Bool(true))]
            .into_iter()
            .collect();
        assert!(RiskSettings::resolve(&RunConfig::default(), &params).is_err());
    }
}
