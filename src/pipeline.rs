//! Pipeline orchestration
//!
//! This module provides the public entry points for wearstream. One call
//! takes a source through normalization, optional raw validation,
//! alignment, optional post-alignment validation, and quality reporting.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::aligner::Aligner;
use crate::error::PipelineError;
use crate::normalizer::Normalizer;
use crate::report::QualityReport;
use crate::sources::{self, CsvSource, JsonSource, SourceAdapter};
use crate::types::{Aggregation, FillMethod, Interval, RangeRules, RawRecord, TimeSeriesTable};
use crate::validator::{ValidationOutcome, Validator};

/// Configuration for one pipeline instance.
///
/// Validation can run against the pre-alignment table (raw sensor-level
/// anomalies, before averaging smooths them away), the post-alignment
/// table (anomalies that only appear after resampling), both, or neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub interval: Interval,
    pub fill_method: FillMethod,
    pub aggregation: Aggregation,
    pub rules: RangeRules,
    pub validate_raw: bool,
    pub validate_aligned: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interval: Interval::Hour1,
            fill_method: FillMethod::Interpolate,
            aggregation: Aggregation::Mean,
            rules: RangeRules::default(),
            validate_raw: true,
            validate_aligned: false,
        }
    }
}

/// Everything one pipeline invocation produces.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// The cleaned series on a regular grid.
    pub aligned: TimeSeriesTable,
    /// Quality report for the aligned table, validation info merged in.
    pub report: QualityReport,
    /// Outcome of pre-alignment validation, when configured.
    pub raw_validation: Option<ValidationOutcome>,
    /// Outcome of post-alignment validation, when configured.
    pub aligned_validation: Option<ValidationOutcome>,
    /// Rows discarded during normalization for unparseable timestamps.
    pub dropped_rows: usize,
}

/// Batch pipeline: normalize, validate, align, report.
///
/// Each run is pure given its input and the configuration; concurrent
/// callers may run independent pipelines freely.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline over already-parsed records.
    pub fn run_records(&self, records: &[RawRecord]) -> Result<PipelineOutput, PipelineError> {
        let normalized = Normalizer::normalize(records);

        // Zero usable rows: short-circuit to an empty series and a report
        // stating no data instead of resampling an empty table.
        if normalized.table.is_empty() {
            return Ok(PipelineOutput {
                report: QualityReport::for_table(&normalized.table),
                aligned: normalized.table,
                raw_validation: None,
                aligned_validation: None,
                dropped_rows: normalized.dropped_rows,
            });
        }

        let raw_validation = if self.config.validate_raw {
            Some(Validator::validate(&normalized.table, &self.config.rules)?)
        } else {
            None
        };

        let aligned = Aligner::align_with(
            &normalized.table,
            self.config.interval,
            self.config.fill_method,
            self.config.aggregation,
        );

        let aligned_validation = if self.config.validate_aligned {
            Some(Validator::validate(&aligned, &self.config.rules)?)
        } else {
            None
        };

        let mut report = QualityReport::for_table(&aligned);
        if let Some(outcome) = aligned_validation.as_ref().or(raw_validation.as_ref()) {
            report = report.with_validation(outcome);
        }

        Ok(PipelineOutput {
            aligned,
            report,
            raw_validation,
            aligned_validation,
            dropped_rows: normalized.dropped_rows,
        })
    }

    /// Run the pipeline over CSV text.
    pub fn run_csv(&self, raw: &str) -> Result<PipelineOutput, PipelineError> {
        self.run_records(&CsvSource.parse(raw)?)
    }

    /// Run the pipeline over JSON or NDJSON text.
    pub fn run_json(&self, raw: &str) -> Result<PipelineOutput, PipelineError> {
        self.run_records(&JsonSource.parse(raw)?)
    }

    /// Run the pipeline over a file, dispatching on its extension.
    pub fn run_path(&self, path: &Path) -> Result<PipelineOutput, PipelineError> {
        self.run_records(&sources::load_path(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricRange;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn hr_config() -> PipelineConfig {
        PipelineConfig {
            rules: RangeRules::new(vec![MetricRange::new("heart_rate", 50.0, 100.0)]),
            ..PipelineConfig::default()
        }
    }

    fn sample_csv() -> &'static str {
        "timestamp,heart_rate,step_count\n\
         2024-01-15 09:00:00,130,1200\n\
         2024-01-15 09:20:00,40,900\n"
    }

    #[test]
    fn test_raw_validation_scenario() {
        // 130 > 100 and 40 < 50: one message, both rows in the subset.
        let pipeline = Pipeline::new(hr_config());
        let output = pipeline.run_csv(sample_csv()).unwrap();

        let validation = output.raw_validation.unwrap();
        assert_eq!(
            validation.messages,
            vec!["heart_rate out of range (50-100)."]
        );
        assert_eq!(validation.violating_rows.len(), 2);
        assert_eq!(output.report.violations.len(), 1);
    }

    #[test]
    fn test_aligned_output_is_regular() {
        let pipeline = Pipeline::new(hr_config());
        let output = pipeline.run_csv(sample_csv()).unwrap();

        // Both readings land in the 09:00 hourly bucket and average out.
        assert_eq!(output.aligned.rows.len(), 1);
        assert_eq!(
            output.aligned.rows[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap())
        );
        assert_eq!(output.aligned.rows[0].numeric("heart_rate"), Some(85.0));
    }

    #[test]
    fn test_validation_smoothed_away_after_alignment() {
        // Averaging hides the raw extremes: post-alignment validation of
        // the same data is clean while raw validation is not.
        let config = PipelineConfig {
            validate_aligned: true,
            ..hr_config()
        };
        let pipeline = Pipeline::new(config);
        let output = pipeline.run_csv(sample_csv()).unwrap();

        assert!(!output.raw_validation.unwrap().is_clean());
        assert!(output.aligned_validation.unwrap().is_clean());
    }

    #[test]
    fn test_hourly_interpolation_scenario() {
        let json = r#"[
            {"timestamp": "2024-01-15T09:00:00Z", "v": 10},
            {"timestamp": "2024-01-15T10:00:00Z", "v": null},
            {"timestamp": "2024-01-15T11:00:00Z", "v": 30}
        ]"#;
        let config = PipelineConfig {
            validate_raw: false,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).run_json(json).unwrap();

        assert_eq!(
            output.aligned.numeric_column("v"),
            vec![Some(10.0), Some(20.0), Some(30.0)]
        );
    }

    #[test]
    fn test_empty_source_short_circuits() {
        let pipeline = Pipeline::new(hr_config());
        let output = pipeline.run_json("[]").unwrap();

        assert!(output.aligned.is_empty());
        assert!(output.report.no_data);
        assert_eq!(output.report.summary(), "no data");
        assert!(output.raw_validation.is_none());
    }

    #[test]
    fn test_all_rows_dropped_short_circuits() {
        let csv = "timestamp,heart_rate\nnot-a-time,70\nalso bad,80\n";
        let pipeline = Pipeline::new(hr_config());
        let output = pipeline.run_csv(csv).unwrap();

        assert!(output.aligned.is_empty());
        assert!(output.report.no_data);
        assert_eq!(output.dropped_rows, 2);
    }

    #[test]
    fn test_missing_rule_column_propagates() {
        let config = PipelineConfig {
            rules: RangeRules::new(vec![MetricRange::new("sleep_hours", 4.0, 10.0)]),
            ..PipelineConfig::default()
        };
        let result = Pipeline::new(config).run_csv(sample_csv());

        assert!(matches!(
            result,
            Err(PipelineError::MissingColumn(ref c)) if c == "sleep_hours"
        ));
    }

    #[test]
    fn test_dropped_row_count_reaches_output() {
        let csv = "timestamp,heart_rate\n\
                   2024-01-15 09:00:00,70\n\
                   garbage,75\n\
                   2024-01-15 10:00:00,80\n";
        let pipeline = Pipeline::new(hr_config());
        let output = pipeline.run_csv(csv).unwrap();

        assert_eq!(output.dropped_rows, 1);
        assert_eq!(output.aligned.rows.len(), 2);
    }

    #[test]
    fn test_non_negative_metrics_after_run() {
        let csv = "timestamp,heart_rate,step_count\n\
                   2024-01-15 09:00:00,-20,3000\n\
                   2024-01-15 10:00:00,66,-1\n";
        let config = PipelineConfig {
            validate_raw: false,
            ..PipelineConfig::default()
        };
        let output = Pipeline::new(config).run_csv(csv).unwrap();

        for row in &output.aligned.rows {
            for column in ["heart_rate", "step_count"] {
                if let Some(value) = row.numeric(column) {
                    assert!(value >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_unsupported_path_is_fatal() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let result = pipeline.run_path(Path::new("data.parquet"));
        assert!(matches!(result, Err(PipelineError::SourceFormat(_))));
    }
}
