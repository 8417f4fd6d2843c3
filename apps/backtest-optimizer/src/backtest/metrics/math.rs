//! Statistical helpers for return series.

/// Arithmetic mean; `None` for an empty slice.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1); `None` below two samples.
#[allow(clippy::cast_precision_loss)]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Root mean square of the negative values, over the full sample count.
#[allow(clippy::cast_precision_loss)]
pub fn downside_deviation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let squares: f64 = values.iter().filter(|v| **v < 0.0).map(|v| v * v).sum();
    Some((squares / values.len() as f64).sqrt())
}

/// Simple per-step returns; steps from a non-positive value are skipped.
pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10.0, 20.0, 30.0, 40.0]), Some(25.0));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        let Some(std) = std_dev(&[10.0, 20.0, 30.0, 40.0]) else {
            panic!("std_dev should succeed for four values");
        };
        // sqrt(500 / 3)
        assert!((std - 12.909_944).abs() < 1e-6);
        assert_eq!(std_dev(&[1.0]), None);
    }

    #[test]
    fn test_downside_deviation_ignores_gains() {
        let Some(dd) = downside_deviation(&[0.1, -0.2, 0.3, -0.2]) else {
            panic!("downside deviation should succeed");
        };
        assert!((dd - (0.08_f64 / 4.0).sqrt()).abs() < 1e-12);
        assert_eq!(downside_deviation(&[0.1, 0.2]), Some(0.0));
    }

    #[test]
    fn test_period_returns() {
        let returns = period_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);
        assert!(period_returns(&[100.0]).is_empty());
    }
}
