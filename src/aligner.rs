//! Temporal alignment
//!
//! This module resamples a normalized table onto a strictly regular time
//! grid:
//! - Rows bucketed by truncated timestamp, metrics aggregated per bucket
//! - Grid re-indexed to cover the observed span with no gaps or duplicates
//! - Nulls introduced by re-indexing resolved by a caller-selected fill
//!   strategy

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::types::{Aggregation, FillMethod, Interval, Row, Scalar, TimeSeriesTable};

/// Aligner for resampling time-series tables
pub struct Aligner;

impl Aligner {
    /// Resample onto a regular grid using mean aggregation.
    pub fn align(table: &TimeSeriesTable, interval: Interval, fill: FillMethod) -> TimeSeriesTable {
        Self::align_with(table, interval, fill, Aggregation::Mean)
    }

    /// Resample onto a regular grid with an explicit bucket aggregation.
    ///
    /// A table without a `timestamp` column (or without any timestamped
    /// rows) is returned unchanged. Only columns that produced at least one
    /// numeric observation become metric columns of the aligned output;
    /// text pass-through columns have no aggregate and are left behind.
    pub fn align_with(
        table: &TimeSeriesTable,
        interval: Interval,
        fill: FillMethod,
        aggregation: Aggregation,
    ) -> TimeSeriesTable {
        if !table.has_column("timestamp") {
            return table.clone();
        }

        let timestamped: Vec<&Row> = table.rows.iter().filter(|r| r.timestamp.is_some()).collect();
        if timestamped.is_empty() {
            return table.clone();
        }

        // Bucket observed values per (bucket start, column).
        let mut buckets: BTreeMap<DateTime<Utc>, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
        let mut metric_columns: Vec<String> = Vec::new();

        for row in &timestamped {
            let Some(ts) = row.timestamp else { continue };
            let bucket = buckets.entry(interval.truncate(ts)).or_default();
            for (column, cell) in &row.cells {
                if let Some(value) = cell.as_f64() {
                    bucket.entry(column.clone()).or_default().push(value);
                    if !metric_columns.iter().any(|c| c == column) {
                        metric_columns.push(column.clone());
                    }
                }
            }
        }
        metric_columns.sort();

        // Regular grid spanning the truncated min..=max observation times.
        let step = interval.duration();
        let first = match buckets.keys().next() {
            Some(t) => *t,
            None => return table.clone(),
        };
        let last = buckets.keys().next_back().copied().unwrap_or(first);

        let mut grid = Vec::new();
        let mut t = first;
        while t <= last {
            grid.push(t);
            t = t + step;
        }

        // Aggregate each metric onto the grid, then fill.
        let mut series: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
        for column in &metric_columns {
            let mut values: Vec<Option<f64>> = grid
                .iter()
                .map(|point| {
                    buckets
                        .get(point)
                        .and_then(|b| b.get(column))
                        .and_then(|observed| aggregation.apply(observed))
                })
                .collect();
            fill_series(&mut values, fill);
            series.insert(column.clone(), values);
        }

        let mut rows = Vec::with_capacity(grid.len());
        for (i, point) in grid.iter().enumerate() {
            if fill == FillMethod::Drop
                && metric_columns
                    .iter()
                    .any(|c| series[c][i].is_none())
            {
                continue;
            }
            let mut row = Row::new(Some(*point));
            for column in &metric_columns {
                let cell = match series[column][i] {
                    Some(v) => Scalar::Number(v),
                    None => Scalar::Null,
                };
                row.cells.insert(column.clone(), cell);
            }
            rows.push(row);
        }

        let mut columns = Vec::with_capacity(metric_columns.len() + 1);
        columns.push("timestamp".to_string());
        columns.extend(metric_columns);

        TimeSeriesTable { columns, rows }
    }
}

/// Resolve nulls in one metric series. `Drop` is handled at row level by
/// the caller.
fn fill_series(values: &mut [Option<f64>], fill: FillMethod) {
    match fill {
        FillMethod::Interpolate => {
            interpolate_gaps(values);
            backward_fill(values);
            forward_fill(values);
        }
        FillMethod::ForwardFill => forward_fill(values),
        FillMethod::BackwardFill => backward_fill(values),
        FillMethod::Zero => {
            for value in values.iter_mut() {
                if value.is_none() {
                    *value = Some(0.0);
                }
            }
        }
        FillMethod::Drop => {}
    }
}

/// Linear interpolation across interior null runs. Runs touching either
/// edge are left for the back/forward fill passes.
fn interpolate_gaps(values: &mut [Option<f64>]) {
    let mut i = 0;
    while i < values.len() {
        if values[i].is_some() {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i;
        while end < values.len() && values[end].is_none() {
            end += 1;
        }

        let prev = if start > 0 { values[start - 1] } else { None };
        let next = if end < values.len() { values[end] } else { None };

        if let (Some(y0), Some(y1)) = (prev, next) {
            let span = (end - start + 1) as f64;
            for (offset, value) in values[start..end].iter_mut().enumerate() {
                let fraction = (offset + 1) as f64 / span;
                *value = Some(y0 + (y1 - y0) * fraction);
            }
        }

        i = end;
    }
}

/// Propagate the last known value forward over trailing nulls.
fn forward_fill(values: &mut [Option<f64>]) {
    let mut last = None;
    for value in values.iter_mut() {
        match value {
            Some(v) => last = Some(*v),
            None => *value = last,
        }
    }
}

/// Propagate the next known value backward over leading nulls.
fn backward_fill(values: &mut [Option<f64>]) {
    let mut next = None;
    for value in values.iter_mut().rev() {
        match value {
            Some(v) => next = Some(*v),
            None => *value = next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap()
    }

    fn table_with(values: &[(DateTime<Utc>, &str, f64)]) -> TimeSeriesTable {
        let rows = values
            .iter()
            .map(|(t, column, v)| {
                let mut row = Row::new(Some(*t));
                row.cells.insert(column.to_string(), Scalar::Number(*v));
                row
            })
            .collect();
        TimeSeriesTable::from_rows(rows)
    }

    #[test]
    fn test_no_timestamp_column_is_noop() {
        let mut row = Row::new(None);
        row.cells.insert("heart_rate".to_string(), Scalar::Number(70.0));
        let table = TimeSeriesTable::from_rows(vec![row]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::Zero);
        assert_eq!(aligned, table);
    }

    #[test]
    fn test_grid_is_regular_and_gap_free() {
        // Observations at 09:05 and 12:40; hourly grid must cover 09..=12.
        let table = table_with(&[
            (ts(9, 5), "heart_rate", 70.0),
            (ts(12, 40), "heart_rate", 80.0),
        ]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::Interpolate);
        let stamps: Vec<DateTime<Utc>> =
            aligned.rows.iter().filter_map(|r| r.timestamp).collect();

        assert_eq!(stamps, vec![ts(9, 0), ts(10, 0), ts(11, 0), ts(12, 0)]);
    }

    #[test]
    fn test_mean_aggregation_within_bucket() {
        let table = table_with(&[
            (ts(9, 10), "heart_rate", 60.0),
            (ts(9, 50), "heart_rate", 80.0),
        ]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::Zero);
        assert_eq!(aligned.rows.len(), 1);
        assert_eq!(aligned.rows[0].numeric("heart_rate"), Some(70.0));
    }

    #[test]
    fn test_hourly_interpolation_midpoint() {
        // 09:00 -> 10, 11:00 -> 30; the empty 10:00 bucket lands on 20.
        let table = table_with(&[
            (ts(9, 0), "value", 10.0),
            (ts(11, 0), "value", 30.0),
        ]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::Interpolate);
        let values = aligned.numeric_column("value");
        assert_eq!(values, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn test_interpolate_leaves_no_nulls() {
        let table = table_with(&[
            (ts(9, 0), "value", 10.0),
            (ts(13, 0), "value", 50.0),
        ]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::Interpolate);
        assert!(aligned
            .rows
            .iter()
            .all(|r| r.numeric("value").is_some()));
    }

    #[test]
    fn test_forward_fill_keeps_leading_nulls() {
        let table = TimeSeriesTable::from_rows(vec![
            {
                let mut r = Row::new(Some(ts(9, 0)));
                r.cells.insert("a".to_string(), Scalar::Number(1.0));
                r
            },
            {
                let mut r = Row::new(Some(ts(11, 0)));
                r.cells.insert("a".to_string(), Scalar::Number(3.0));
                r.cells.insert("b".to_string(), Scalar::Number(5.0));
                r
            },
        ]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::ForwardFill);
        // Column b is unobserved before 11:00, so its leading cells stay null.
        assert_eq!(
            aligned.numeric_column("b"),
            vec![None, None, Some(5.0)]
        );
        // Column a forward-fills the 10:00 gap.
        assert_eq!(
            aligned.numeric_column("a"),
            vec![Some(1.0), Some(1.0), Some(3.0)]
        );
    }

    #[test]
    fn test_backward_fill_keeps_trailing_nulls() {
        let table = TimeSeriesTable::from_rows(vec![
            {
                let mut r = Row::new(Some(ts(9, 0)));
                r.cells.insert("a".to_string(), Scalar::Number(1.0));
                r.cells.insert("b".to_string(), Scalar::Number(4.0));
                r
            },
            {
                let mut r = Row::new(Some(ts(11, 0)));
                r.cells.insert("a".to_string(), Scalar::Number(3.0));
                r
            },
        ]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::BackwardFill);
        assert_eq!(
            aligned.numeric_column("b"),
            vec![Some(4.0), None, None]
        );
        assert_eq!(
            aligned.numeric_column("a"),
            vec![Some(1.0), Some(3.0), Some(3.0)]
        );
    }

    #[test]
    fn test_zero_fill() {
        let table = table_with(&[
            (ts(9, 0), "value", 10.0),
            (ts(11, 0), "value", 30.0),
        ]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::Zero);
        assert_eq!(
            aligned.numeric_column("value"),
            vec![Some(10.0), Some(0.0), Some(30.0)]
        );
    }

    #[test]
    fn test_drop_removes_incomplete_rows() {
        let table = TimeSeriesTable::from_rows(vec![
            {
                let mut r = Row::new(Some(ts(9, 0)));
                r.cells.insert("a".to_string(), Scalar::Number(1.0));
                r.cells.insert("b".to_string(), Scalar::Number(2.0));
                r
            },
            {
                let mut r = Row::new(Some(ts(10, 0)));
                r.cells.insert("a".to_string(), Scalar::Number(3.0));
                r
            },
        ]);

        let aligned = Aligner::align(&table, Interval::Hour1, FillMethod::Drop);
        // The 10:00 row misses b and is dropped.
        assert_eq!(aligned.rows.len(), 1);
        assert_eq!(aligned.rows[0].timestamp, Some(ts(9, 0)));
    }

    #[test]
    fn test_sum_aggregation_option() {
        let table = table_with(&[
            (ts(9, 10), "step_count", 500.0),
            (ts(9, 40), "step_count", 700.0),
        ]);

        let aligned = Aligner::align_with(
            &table,
            Interval::Hour1,
            FillMethod::Zero,
            Aggregation::Sum,
        );
        assert_eq!(aligned.rows[0].numeric("step_count"), Some(1200.0));
    }

    #[test]
    fn test_minute_grid_spacing() {
        let table = table_with(&[
            (ts(9, 0), "v", 1.0),
            (ts(9, 59), "v", 2.0),
        ]);

        let aligned = Aligner::align(&table, Interval::Min15, FillMethod::Interpolate);
        let stamps: Vec<DateTime<Utc>> =
            aligned.rows.iter().filter_map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![ts(9, 0), ts(9, 15), ts(9, 30), ts(9, 45)]);
        for pair in stamps.windows(2) {
            assert_eq!(pair[1] - pair[0], Interval::Min15.duration());
        }
    }
}
