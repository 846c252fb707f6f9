//! JSON source adapter
//!
//! Accepts either a JSON array of flat objects or NDJSON (one object per
//! line). Blank NDJSON lines are skipped; parse failures carry the line
//! number.

use super::SourceAdapter;
use crate::error::PipelineError;
use crate::types::{RawRecord, Scalar};

/// Structured-record (JSON / NDJSON) source
pub struct JsonSource;

impl SourceAdapter for JsonSource {
    fn parse(&self, raw: &str) -> Result<Vec<RawRecord>, PipelineError> {
        if raw.trim_start().starts_with('[') {
            Self::parse_array(raw)
        } else {
            Self::parse_ndjson(raw)
        }
    }
}

impl JsonSource {
    /// Parse a JSON array of objects
    pub fn parse_array(json: &str) -> Result<Vec<RawRecord>, PipelineError> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
        values.iter().map(object_to_record).collect()
    }

    /// Parse NDJSON (newline-delimited JSON) records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawRecord>, PipelineError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: serde_json::Value =
                serde_json::from_str(trimmed).map_err(|e| {
                    PipelineError::SourceFormat(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    ))
                })?;
            records.push(object_to_record(&value)?);
        }
        Ok(records)
    }
}

fn object_to_record(value: &serde_json::Value) -> Result<RawRecord, PipelineError> {
    let object = value.as_object().ok_or_else(|| {
        PipelineError::SourceFormat(format!(
            "Expected a JSON object per record, got: {}",
            value
        ))
    })?;

    let mut record = RawRecord::new();
    for (key, cell) in object {
        record.insert(key.clone(), Scalar::from_json(cell));
    }
    Ok(record)
}
