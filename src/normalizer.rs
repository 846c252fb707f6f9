//! Schema normalization
//!
//! This module turns loosely typed raw records into a clean time-series
//! table:
//! - Column synonyms canonicalized, names lower-cased
//! - Timestamps parsed; rows without a parseable timestamp are dropped
//! - Recognized metric columns coerced to numbers and floored at zero

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::types::{RawRecord, Row, Scalar, TimeSeriesTable};

/// Declarative synonym table, applied to lower-cased column names before any
/// other processing.
pub const COLUMN_SYNONYMS: &[(&str, &str)] = &[
    ("datetime", "timestamp"),
    ("sleep_duration", "duration_minutes"),
];

/// Metric columns the normalizer coerces and floors at zero.
pub const METRIC_COLUMNS: &[&str] = &["heart_rate", "step_count", "duration_minutes"];

/// A normalized table together with the number of rows dropped for having
/// an unparseable timestamp. Dropping is silent by policy; the count is the
/// caller's only visibility into the loss.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub table: TimeSeriesTable,
    pub dropped_rows: usize,
}

/// Normalizer for raw wearable records
pub struct Normalizer;

impl Normalizer {
    /// Normalize raw records into a time-series table.
    ///
    /// Empty input is a no-op. Output rows are sorted by timestamp
    /// ascending, and the operation is idempotent: normalizing
    /// `table.to_records()` of a normalized table reproduces it.
    pub fn normalize(records: &[RawRecord]) -> NormalizedTable {
        if records.is_empty() {
            return NormalizedTable {
                table: TimeSeriesTable::new(),
                dropped_rows: 0,
            };
        }

        let mut rows = Vec::with_capacity(records.len());
        let mut dropped_rows = 0;

        for record in records {
            let mut timestamp = None;
            let mut row = Row::new(None);

            for (name, cell) in record {
                let column = canonical_column(name);
                if column == "timestamp" {
                    timestamp = parse_timestamp(cell);
                    continue;
                }
                if METRIC_COLUMNS.contains(&column.as_str()) {
                    let value = cell.as_f64().unwrap_or(0.0).max(0.0);
                    row.cells.insert(column, Scalar::Number(value));
                } else {
                    row.cells.insert(column, cell.clone());
                }
            }

            match timestamp {
                Some(ts) => {
                    row.timestamp = Some(ts);
                    rows.push(row);
                }
                None => dropped_rows += 1,
            }
        }

        rows.sort_by_key(|r| r.timestamp);

        NormalizedTable {
            table: TimeSeriesTable::from_rows(rows),
            dropped_rows,
        }
    }
}

/// Canonical form of a column name: lower-cased, synonyms resolved.
fn canonical_column(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    for (synonym, canonical) in COLUMN_SYNONYMS {
        if lowered == *synonym {
            return (*canonical).to_string();
        }
    }
    lowered
}

/// Parse a timestamp cell.
///
/// Text accepts RFC 3339 and the common date/time layouts below, read as
/// UTC; numbers are taken as Unix seconds. Anything else fails the row.
fn parse_timestamp(cell: &Scalar) -> Option<DateTime<Utc>> {
    match cell {
        Scalar::Text(t) => parse_timestamp_str(t.trim()),
        Scalar::Number(n) => Utc.timestamp_opt(*n as i64, 0).single(),
        _ => None,
    }
}

fn parse_timestamp_str(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    const LAYOUTS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for layout in LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }

    None
}
