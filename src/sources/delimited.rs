//! CSV source adapter
//!
//! Parses delimited text with a header row into raw records. Cells stay
//! text; numeric coercion happens in the normalizer. Empty cells become
//! nulls so missing-value counts see them.

use csv::ReaderBuilder;

use super::SourceAdapter;
use crate::error::PipelineError;
use crate::types::{RawRecord, Scalar};

/// Delimited-text (CSV) source
pub struct CsvSource;

impl SourceAdapter for CsvSource {
    fn parse(&self, raw: &str) -> Result<Vec<RawRecord>, PipelineError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(raw.as_bytes());

        let headers = reader.headers()?.clone();
        let mut records = Vec::new();

        for result in reader.records() {
            let record = result?;
            let mut row = RawRecord::new();
            for (header, field) in headers.iter().zip(record.iter()) {
                let cell = if field.is_empty() {
                    Scalar::Null
                } else {
                    Scalar::Text(field.to_string())
                };
                row.insert(header.to_string(), cell);
            }
            records.push(row);
        }

        Ok(records)
    }
}
