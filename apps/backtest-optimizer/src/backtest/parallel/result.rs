//! Result types for parameter sweeps.

use std::cmp::Ordering;
use std::fmt::Write;

use serde::Serialize;

use crate::backtest::engine::RunError;
use crate::backtest::metrics::{MetricKey, MetricsReport};
use crate::backtest::walkforward::WalkForwardReport;

use super::types::ParameterSet;

/// One successfully completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    /// Parameters of the run.
    pub params: ParameterSet,
    /// Metrics of the run.
    pub report: MetricsReport,
}

/// A run excluded from the results table.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFailure {
    /// Position of the parameter set in the grid.
    pub index: usize,
    /// Parameters of the failed run.
    pub params: ParameterSet,
    /// Why it failed.
    pub error: RunError,
}

/// Append-only table of completed runs, in grid order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultsTable {
    param_names: Vec<String>,
    rows: Vec<ResultRow>,
}

/// Best first; undefined values always rank last.
fn rank(a: Option<f64>, b: Option<f64>, higher_is_better: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if higher_is_better => y.total_cmp(&x),
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl ResultsTable {
    /// Create an empty table for the given parameter columns.
    #[must_use]
    pub const fn new(param_names: Vec<String>) -> Self {
        Self {
            param_names,
            rows: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, params: ParameterSet, report: MetricsReport) {
        self.rows.push(ResultRow { params, report });
    }

    /// Parameter columns followed by metric columns.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.param_names
            .iter()
            .map(String::as_str)
            .chain(MetricKey::ALL.iter().map(|k| k.name()))
            .collect()
    }

    /// All rows in grid order.
    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of completed runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no run completed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows ordered best-first by `key`; ties keep grid order.
    #[must_use]
    pub fn sorted_by(&self, key: MetricKey) -> Vec<&ResultRow> {
        let mut rows: Vec<&ResultRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            rank(a.report.metric(key), b.report.metric(key), key.higher_is_better())
        });
        rows
    }

    /// Up to `n` rows ranked by Sharpe ratio, then by final value.
    #[must_use]
    pub fn top_by_sharpe(&self, n: usize) -> Vec<&ResultRow> {
        let mut rows: Vec<&ResultRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            rank(a.report.sharpe_ratio, b.report.sharpe_ratio, true).then_with(|| {
                rank(
                    Some(a.report.final_value),
                    Some(b.report.final_value),
                    true,
                )
            })
        });
        rows.truncate(n);
        rows
    }

    /// Highest-Sharpe row; falls back to final value when no Sharpe is defined.
    #[must_use]
    pub fn best_by_sharpe(&self) -> Option<&ResultRow> {
        self.top_by_sharpe(1).into_iter().next()
    }

    /// Render as CSV: parameter columns, then metric columns. Undefined metrics are empty.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut csv = self.columns().join(",");
        csv.push('\n');

        for row in &self.rows {
            let params = self
                .param_names
                .iter()
                .map(|name| row.params.get(name).map_or_else(String::new, |v| v.to_string()));
            let metrics = MetricKey::ALL.iter().map(|key| {
                row.report
                    .metric(*key)
                    .map_or_else(String::new, |v| v.to_string())
            });
            let line: Vec<String> = params.chain(metrics).collect();
            let _ = writeln!(csv, "{}", line.join(","));
        }

        csv
    }
}

/// Everything a sweep produced.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Instrument symbol.
    pub symbol: String,
    /// Name of the strategy that was swept.
    pub strategy: String,
    /// Completed runs.
    pub table: ResultsTable,
    /// Runs excluded from the table.
    pub failures: Vec<RunFailure>,
    /// Size of the parameter grid.
    pub total_combinations: usize,
    /// Runs that produced a report.
    pub completed: usize,
    /// Runs that failed, timed out or were cancelled.
    pub failed: usize,
    /// True when the sweep stopped before the grid was exhausted.
    pub cancelled: bool,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
    /// Out-of-sample validation, when walk-forward was enabled.
    pub out_of_sample: Option<WalkForwardReport>,
}

impl SweepOutcome {
    /// Share of attempted runs that completed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let attempted = self.completed + self.failed;
        if attempted == 0 {
            0.0
        } else {
            self.completed as f64 / attempted as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::engine::EquityCurve;
    use crate::backtest::metrics::PerformanceAnalyzer;
    use crate::backtest::parallel::ParamValue;

    fn row(period: i64, sharpe: Option<f64>, final_value: f64) -> (ParameterSet, MetricsReport) {
        let params: ParameterSet = [("period", ParamValue::Int(period))].into_iter().collect();
        let report = MetricsReport {
            sharpe_ratio: sharpe,
            final_value,
            ..PerformanceAnalyzer::new(1_000.0).analyze(&[], &EquityCurve::default())
        };
        (params, report)
    }

    fn table() -> ResultsTable {
        let mut table = ResultsTable::new(vec!["period".to_string()]);
        for (params, report) in [
            row(10, Some(0.5), 1_050.0),
            row(20, None, 1_200.0),
            row(30, Some(1.5), 1_100.0),
            row(40, Some(1.5), 1_150.0),
        ] {
            table.push(params, report);
        }
        table
    }

    #[test]
    fn test_best_by_sharpe_breaks_ties_on_final_value() {
        let table = table();
        let Some(best) = table.best_by_sharpe() else {
            panic!("table should have a best row");
        };
        assert_eq!(best.params.get("period"), Some(ParamValue::Int(40)));
    }

    #[test]
    fn test_sorted_by_puts_undefined_last() {
        let table = table();
        let order: Vec<Option<ParamValue>> = table
            .sorted_by(MetricKey::SharpeRatio)
            .iter()
            .map(|r| r.params.get("period"))
            .collect();
        assert_eq!(
            order,
            vec![
                Some(ParamValue::Int(30)),
                Some(ParamValue::Int(40)),
                Some(ParamValue::Int(10)),
                Some(ParamValue::Int(20)),
            ]
        );
    }

    #[test]
    fn test_top_by_sharpe_truncates() {
        let table = table();
        assert_eq!(table.top_by_sharpe(2).len(), 2);
        assert_eq!(table.top_by_sharpe(10).len(), 4);
    }

    #[test]
    fn test_csv_layout() {
        let table = table();
        let csv = table.to_csv();
        let mut lines = csv.lines();

        let Some(header) = lines.next() else {
            panic!("csv should have a header");
        };
        assert!(header.starts_with("period,initial_value,final_value,"));
        assert_eq!(header.split(',').count(), 1 + MetricKey::ALL.len());

        let Some(first) = lines.next() else {
            panic!("csv should have rows");
        };
        assert!(first.starts_with("10,1000,1050,"));
        assert_eq!(first.split(',').count(), 1 + MetricKey::ALL.len());
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn test_empty_table() {
        let table = ResultsTable::new(Vec::new());
        assert!(table.best_by_sharpe().is_none());
        assert_eq!(table.to_csv().lines().count(), 1);
    }
}
