//! Run configuration shared by every simulation in a sweep.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration value outside its allowed domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct InvalidSetting {
    /// Name of the offending setting.
    pub field: &'static str,
    /// What was wrong with it.
    pub reason: String,
}

impl InvalidSetting {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Account and risk defaults for a simulation run.
///
/// Risk fields act as defaults; a parameter set may override them under the
/// keys `risk_per_trade`, `stop_loss_atr`, `take_profit_atr`,
/// `trailing_stop_atr`, `atr_period`, `cooldown_period` and `max_hold_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Starting cash balance.
    pub starting_cash: f64,
    /// Commission rate charged on the notional of each fill.
    pub commission: f64,
    /// Fraction of equity risked per trade.
    pub risk_per_trade: f64,
    /// Stop distance in ATR multiples.
    pub stop_loss_atr: f64,
    /// Take-profit distance in ATR multiples.
    pub take_profit_atr: f64,
    /// Trailing stop distance in ATR multiples.
    pub trailing_stop_atr: f64,
    /// ATR window used for sizing and stops.
    pub atr_period: usize,
    /// Bars that must pass after a trade event before a new entry.
    pub cooldown_bars: usize,
    /// Maximum holding time in minutes; `None` disables the limit.
    pub max_hold_minutes: Option<u64>,
    /// Annual risk-free rate for Sharpe/Sortino.
    pub risk_free_rate: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            starting_cash: 1_000.0,
            commission: 0.001,
            risk_per_trade: 0.02,
            stop_loss_atr: 1.2,
            take_profit_atr: 2.0,
            trailing_stop_atr: 1.0,
            atr_period: 14,
            cooldown_bars: 25,
            max_hold_minutes: Some(720),
            risk_free_rate: 0.0,
        }
    }
}

impl RunConfig {
    /// Check every field against its domain.
    pub fn validate(&self) -> Result<(), InvalidSetting> {
        if !(self.starting_cash.is_finite() && self.starting_cash > 0.0) {
            return Err(InvalidSetting::new("starting_cash", "must be positive"));
        }
        if !(self.commission.is_finite() && (0.0..1.0).contains(&self.commission)) {
            return Err(InvalidSetting::new("commission", "must be in [0, 1)"));
        }
        if !(self.risk_per_trade > 0.0 && self.risk_per_trade <= 1.0) {
            return Err(InvalidSetting::new("risk_per_trade", "must be in (0, 1]"));
        }
        for (field, value) in [
            ("stop_loss_atr", self.stop_loss_atr),
            ("take_profit_atr", self.take_profit_atr),
            ("trailing_stop_atr", self.trailing_stop_atr),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(InvalidSetting::new(field, "must be positive"));
            }
        }
        if self.atr_period == 0 {
            return Err(InvalidSetting::new("atr_period", "must be at least 1"));
        }
        if self.max_hold_minutes == Some(0) {
            return Err(InvalidSetting::new("max_hold_minutes", "must be positive"));
        }
        if !(self.risk_free_rate.is_finite() && (0.0..1.0).contains(&self.risk_free_rate)) {
            return Err(InvalidSetting::new("risk_free_rate", "must be in [0, 1)"));
        }
        Ok(())
    }
}
