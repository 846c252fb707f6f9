//! Core types for the wearstream pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw records, time-series tables, resampling configuration, and
//! range rules.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single scalar cell value as found in source data.
///
/// Sources deliver loosely typed cells; numeric coercion is the normalizer's
/// job, so text that happens to look numeric stays text until then.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Coerce this cell to a real number, if possible.
    ///
    /// Numbers pass through, numeric text parses, everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(t) => t.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Convert a JSON value to a scalar cell.
    ///
    /// Nested arrays/objects are preserved as their JSON text so that extra
    /// columns survive the pipeline untouched.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Scalar::Null,
            serde_json::Value::Bool(b) => Scalar::Bool(*b),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Scalar::Number)
                .unwrap_or_else(|| Scalar::Text(n.to_string())),
            serde_json::Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Number(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

/// One source row: an unordered mapping of column name to scalar value.
///
/// Column-name case and synonyms are resolved by the normalizer.
pub type RawRecord = BTreeMap<String, Scalar>;

/// One row of a time-series table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Point in time; never `None` after normalization.
    pub timestamp: Option<DateTime<Utc>>,
    /// Named cells other than the timestamp.
    pub cells: BTreeMap<String, Scalar>,
}

impl Row {
    pub fn new(timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            timestamp,
            cells: BTreeMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.cells.get(column)
    }

    /// Numeric view of a cell, `None` when absent or non-numeric.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        self.cells.get(column).and_then(Scalar::as_f64)
    }
}

/// An ordered sequence of rows sharing a column set.
///
/// The `timestamp` column, when present, always sorts first in `columns`;
/// remaining columns are kept in lexicographic order so table shape is
/// deterministic regardless of source ordering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl TimeSeriesTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from rows, deriving the column list from their cells.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let mut names: Vec<String> = Vec::new();
        let has_timestamp = rows.iter().any(|r| r.timestamp.is_some());
        for row in &rows {
            for name in row.cells.keys() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.clone());
                }
            }
        }
        names.sort();
        let mut columns = Vec::with_capacity(names.len() + 1);
        if has_timestamp {
            columns.push("timestamp".to_string());
        }
        columns.extend(names);
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// (row count, column count)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Per-row view of a column's cells; `None` where a row lacks the cell.
    pub fn column_values(&self, name: &str) -> Vec<Option<&Scalar>> {
        self.rows.iter().map(|r| r.get(name)).collect()
    }

    /// Per-row numeric view of a column.
    pub fn numeric_column(&self, name: &str) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.numeric(name)).collect()
    }

    /// Re-encode rows as raw records, timestamps as RFC 3339 text.
    ///
    /// This is the inverse of normalization's shaping step and is what makes
    /// normalization idempotent end to end.
    pub fn to_records(&self) -> Vec<RawRecord> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = row.cells.clone();
                if let Some(ts) = row.timestamp {
                    record.insert("timestamp".to_string(), Scalar::Text(ts.to_rfc3339()));
                }
                record
            })
            .collect()
    }
}

/// Fixed-duration resampling frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    Min1,
    Min5,
    Min15,
    Min30,
    Hour1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Min1 => "1m",
            Interval::Min5 => "5m",
            Interval::Min15 => "15m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Interval::Min1 => Duration::minutes(1),
            Interval::Min5 => Duration::minutes(5),
            Interval::Min15 => Duration::minutes(15),
            Interval::Min30 => Duration::minutes(30),
            Interval::Hour1 => Duration::hours(1),
        }
    }

    /// Floor a timestamp to the start of its bucket on this interval's grid.
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let step = self.duration().num_seconds();
        let floored = ts.timestamp().div_euclid(step) * step;
        Utc.timestamp_opt(floored, 0).single().unwrap_or(ts)
    }
}

/// Policy for resolving nulls introduced by re-indexing onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMethod {
    Interpolate,
    ForwardFill,
    BackwardFill,
    Zero,
    Drop,
}

impl FillMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillMethod::Interpolate => "interpolate",
            FillMethod::ForwardFill => "forward_fill",
            FillMethod::BackwardFill => "backward_fill",
            FillMethod::Zero => "zero",
            FillMethod::Drop => "drop",
        }
    }
}

/// Per-bucket aggregation applied when resampling.
///
/// Mean is the default: readings inside a bucket are treated as repeated
/// noisy samples of the same underlying signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean,
    Sum,
    Min,
    Max,
    Last,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Sum => "sum",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Last => "last",
        }
    }

    /// Reduce the observed values of one bucket. `None` when the bucket saw
    /// no numeric observations.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            Aggregation::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            Aggregation::Sum => Some(values.iter().sum()),
            Aggregation::Min => values.iter().copied().reduce(f64::min),
            Aggregation::Max => values.iter().copied().reduce(f64::max),
            Aggregation::Last => values.last().copied(),
        }
    }
}

impl Default for Aggregation {
    fn default() -> Self {
        Aggregation::Mean
    }
}

/// A named range rule: inclusive lower and upper bounds for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub metric: String,
    pub low: f64,
    pub high: f64,
}

impl MetricRange {
    pub fn new(metric: impl Into<String>, low: f64, high: f64) -> Self {
        Self {
            metric: metric.into(),
            low,
            high,
        }
    }

    /// Whether a value sits inside the inclusive bounds.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// An ordered set of range rules.
///
/// Always an explicit value handed to the validator or pipeline config, so
/// multiple rule sets (e.g. age-adjusted heart-rate bounds) can coexist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeRules {
    pub rules: Vec<MetricRange>,
}

impl RangeRules {
    pub fn new(rules: Vec<MetricRange>) -> Self {
        Self { rules }
    }

    /// No rules at all; validation becomes a no-op.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricRange> {
        self.rules.iter()
    }
}

impl Default for RangeRules {
    fn default() -> Self {
        Self {
            rules: vec![
                MetricRange::new("sleep_hours", 4.0, 10.0),
                MetricRange::new("heart_rate", 50.0, 100.0),
                MetricRange::new("step_count", 1000.0, 20000.0),
            ],
        }
    }
}
