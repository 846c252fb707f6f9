//! Quality reporting
//!
//! This module summarizes a table independent of any range rules: shape,
//! per-column missing counts, and descriptive statistics. Validation
//! results can be merged in afterwards, and every report carries a
//! provenance block identifying the producing engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::types::{Scalar, TimeSeriesTable};
use crate::validator::ValidationOutcome;
use crate::{PRODUCER_NAME, VERSION};

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; absent below two observations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Identity of the engine that produced a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub producer: String,
    pub version: String,
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
}

impl ReportProvenance {
    fn new() -> Self {
        Self {
            producer: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
        }
    }
}

/// Structured quality summary of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub provenance: ReportProvenance,
    pub rows: usize,
    pub columns: usize,
    /// True when the source yielded no rows; statistics are then absent
    /// rather than computed on an empty table.
    pub no_data: bool,
    /// Null or absent cells per column.
    pub missing: BTreeMap<String, usize>,
    /// Descriptive statistics per numeric column.
    pub stats: BTreeMap<String, ColumnStats>,
    /// Range-rule violation messages, when validation ran.
    pub violations: Vec<String>,
    /// Number of distinct rows violating any rule.
    pub violating_rows: usize,
}

impl QualityReport {
    /// Summarize a table: shape, missingness, per-column statistics.
    pub fn for_table(table: &TimeSeriesTable) -> Self {
        let (rows, columns) = table.shape();
        let no_data = table.is_empty();

        let mut missing = BTreeMap::new();
        let mut stats = BTreeMap::new();

        for column in &table.columns {
            let absent = if column == "timestamp" {
                table.rows.iter().filter(|r| r.timestamp.is_none()).count()
            } else {
                table
                    .column_values(column)
                    .iter()
                    .filter(|c| c.map_or(true, Scalar::is_null))
                    .count()
            };
            missing.insert(column.clone(), absent);

            if column != "timestamp" {
                let values: Vec<f64> = table
                    .rows
                    .iter()
                    .filter_map(|r| r.numeric(column))
                    .collect();
                if let Some(column_stats) = describe(&values) {
                    stats.insert(column.clone(), column_stats);
                }
            }
        }

        Self {
            provenance: ReportProvenance::new(),
            rows,
            columns,
            no_data,
            missing,
            stats,
            violations: Vec::new(),
            violating_rows: 0,
        }
    }

    /// Merge a validation outcome into the report.
    pub fn with_validation(mut self, outcome: &ValidationOutcome) -> Self {
        self.violations = outcome.messages.clone();
        self.violating_rows = outcome.violating_rows.len();
        self
    }

    /// One-line human summary, used by the CLI.
    pub fn summary(&self) -> String {
        if self.no_data {
            return "no data".to_string();
        }
        format!(
            "{} rows x {} columns, {} violation(s)",
            self.rows,
            self.columns,
            self.violations.len()
        )
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Describe a numeric series; `None` when it has no observations.
fn describe(values: &[f64]) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;

    let std = if count > 1 {
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        Some(variance.sqrt())
    } else {
        None
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    Some(ColumnStats {
        count,
        mean,
        std,
        min: sorted[0],
        q25: percentile(&sorted, 0.25),
        median: percentile(&sorted, 0.5),
        q75: percentile(&sorted, 0.75),
        max: sorted[count - 1],
    })
}

/// Percentile by linear interpolation between closest ranks. Input must be
/// sorted and non-empty.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let position = p * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let fraction = position - lower as f64;
    if lower + 1 < sorted.len() {
        sorted[lower] + fraction * (sorted[lower + 1] - sorted[lower])
    } else {
        sorted[lower]
    }
}
