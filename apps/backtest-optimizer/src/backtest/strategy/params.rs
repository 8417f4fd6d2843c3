//! Typed readers over a [`ParameterSet`] with defaults.

use super::StrategyError;
use crate::backtest::parallel::ParameterSet;

/// Finite number, or `default` when absent.
pub fn float(params: &ParameterSet, name: &str, default: f64) -> Result<f64, StrategyError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value
            .as_float()
            .filter(|v| v.is_finite())
            .ok_or_else(|| StrategyError::invalid(name, format!("expected a number, got {value}"))),
    }
}

/// Strictly positive number.
pub fn positive(params: &ParameterSet, name: &str, default: f64) -> Result<f64, StrategyError> {
    let value = float(params, name, default)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(StrategyError::invalid(name, format!("must be positive, got {value}")))
    }
}

/// Non-negative number.
pub fn non_negative(params: &ParameterSet, name: &str, default: f64) -> Result<f64, StrategyError> {
    let value = float(params, name, default)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(StrategyError::invalid(name, format!("must not be negative, got {value}")))
    }
}

/// Non-negative whole number.
pub fn count(params: &ParameterSet, name: &str, default: usize) -> Result<usize, StrategyError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value
            .as_int()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| {
                StrategyError::invalid(name, format!("expected a non-negative integer, got {value}"))
            }),
    }
}

/// Window length, at least 1.
pub fn period(params: &ParameterSet, name: &str, default: usize) -> Result<usize, StrategyError> {
    let value = count(params, name, default)?;
    if value == 0 {
        return Err(StrategyError::invalid(name, "period must be at least 1"));
    }
    Ok(value)
}

/// Boolean switch.
pub fn flag(params: &ParameterSet, name: &str, default: bool) -> Result<bool, StrategyError> {
    match params.get(name) {
        None => Ok(default),
        Some(value) => value
            .as_bool()
            .ok_or_else(|| StrategyError::invalid(name, format!("expected a boolean, got {value}"))),
    }
}
