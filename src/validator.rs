//! Range validation
//!
//! This module checks configured metric ranges against a table and reports
//! violations. It works the same on raw-normalized and aligned tables, so
//! callers can gate quality at ingestion time or sanity-check after
//! resampling.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::{RangeRules, Row, TimeSeriesTable};

/// Result of validating one table against a rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// One human-readable message per rule with at least one violating row.
    pub messages: Vec<String>,
    /// Indices of violating rows in the validated table, original order.
    pub violating_indices: Vec<usize>,
    /// The violating rows themselves; a row appears once even when it
    /// violates several rules.
    pub violating_rows: Vec<Row>,
}

impl ValidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Validator for range rules
pub struct Validator;

impl Validator {
    /// Validate a table against a rule set.
    ///
    /// A rule referencing a column absent from the table is a configuration
    /// error, checked before any rule is evaluated so no partial outcome
    /// escapes. Null and non-numeric cells never violate; a numeric cell
    /// violates when it falls strictly outside the rule's inclusive bounds.
    pub fn validate(
        table: &TimeSeriesTable,
        rules: &RangeRules,
    ) -> Result<ValidationOutcome, PipelineError> {
        for rule in rules.iter() {
            if !table.has_column(&rule.metric) {
                return Err(PipelineError::MissingColumn(rule.metric.clone()));
            }
        }

        let mut flags = vec![false; table.rows.len()];
        let mut messages = Vec::new();

        for rule in rules.iter() {
            let mut any_violation = false;
            for (i, row) in table.rows.iter().enumerate() {
                if let Some(value) = row.numeric(&rule.metric) {
                    if !rule.contains(value) {
                        flags[i] = true;
                        any_violation = true;
                    }
                }
            }
            if any_violation {
                messages.push(format!(
                    "{} out of range ({}-{}).",
                    rule.metric, rule.low, rule.high
                ));
            }
        }

        let violating_indices: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter_map(|(i, flagged)| flagged.then_some(i))
            .collect();
        let violating_rows = violating_indices
            .iter()
            .map(|&i| table.rows[i].clone())
            .collect();

        Ok(ValidationOutcome {
            messages,
            violating_indices,
            violating_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricRange, Scalar};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn hr_table(values: &[Option<f64>]) -> TimeSeriesTable {
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let mut row = Row::new(Some(
                    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
                        + chrono::Duration::minutes(i as i64 * 20),
                ));
                let cell = match v {
                    Some(value) => Scalar::Number(*value),
                    None => Scalar::Null,
                };
                row.cells.insert("heart_rate".to_string(), cell);
                row
            })
            .collect();
        TimeSeriesTable::from_rows(rows)
    }

    fn hr_rules() -> RangeRules {
        RangeRules::new(vec![MetricRange::new("heart_rate", 50.0, 100.0)])
    }

    #[test]
    fn test_both_extremes_violate() {
        // 130 > 100 and 40 < 50: two violating rows, one message.
        let table = hr_table(&[Some(130.0), Some(40.0)]);
        let outcome = Validator::validate(&table, &hr_rules()).unwrap();

        assert_eq!(outcome.messages, vec!["heart_rate out of range (50-100)."]);
        assert_eq!(outcome.violating_indices, vec![0, 1]);
        assert_eq!(outcome.violating_rows.len(), 2);
    }

    #[test]
    fn test_inclusive_bounds_do_not_violate() {
        let table = hr_table(&[Some(50.0), Some(100.0), Some(75.0)]);
        let outcome = Validator::validate(&table, &hr_rules()).unwrap();

        assert!(outcome.is_clean());
        assert!(outcome.violating_rows.is_empty());
    }

    #[test]
    fn test_null_cells_do_not_violate() {
        let table = hr_table(&[None, Some(75.0)]);
        let outcome = Validator::validate(&table, &hr_rules()).unwrap();
        assert!(outcome.is_clean());
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let table = hr_table(&[Some(75.0)]);
        let rules = RangeRules::new(vec![MetricRange::new("step_count", 0.0, 1.0)]);

        let result = Validator::validate(&table, &rules);
        assert!(matches!(result, Err(PipelineError::MissingColumn(ref c)) if c == "step_count"));
    }

    #[test]
    fn test_row_counted_once_across_rules() {
        let mut table = hr_table(&[Some(130.0)]);
        for row in &mut table.rows {
            row.cells
                .insert("step_count".to_string(), Scalar::Number(50_000.0));
        }
        table.columns.push("step_count".to_string());

        let rules = RangeRules::new(vec![
            MetricRange::new("heart_rate", 50.0, 100.0),
            MetricRange::new("step_count", 1000.0, 20000.0),
        ]);

        let outcome = Validator::validate(&table, &rules).unwrap();
        // Two messages (one per violated rule) but the row appears once.
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.violating_rows.len(), 1);
    }

    #[test]
    fn test_order_preserved_in_subset() {
        let table = hr_table(&[Some(130.0), Some(75.0), Some(40.0)]);
        let outcome = Validator::validate(&table, &hr_rules()).unwrap();
        assert_eq!(outcome.violating_indices, vec![0, 2]);
    }

    #[test]
    fn test_empty_rules_are_noop() {
        let table = hr_table(&[Some(500.0)]);
        let outcome = Validator::validate(&table, &RangeRules::empty()).unwrap();
        assert!(outcome.is_clean());
    }
}
