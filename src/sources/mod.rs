//! Source adapters
//!
//! This module provides adapters that parse table-shaped source text into
//! raw records the normalizer can consume.

mod delimited;
mod json;

pub use delimited::CsvSource;
pub use json::JsonSource;

use std::fs;
use std::path::Path;

use crate::error::PipelineError;
use crate::types::RawRecord;

/// Trait for table-shaped source adapters
pub trait SourceAdapter {
    /// Parse raw source text into records
    fn parse(&self, raw: &str) -> Result<Vec<RawRecord>, PipelineError>;
}

/// Load records from a file, dispatching on its extension.
///
/// `.csv`, `.json` and `.ndjson` are recognized; anything else is a fatal
/// format error with no partial result.
pub fn load_path(path: &Path) -> Result<Vec<RawRecord>, PipelineError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => {
            let raw = fs::read_to_string(path)?;
            CsvSource.parse(&raw)
        }
        Some("json") | Some("ndjson") => {
            let raw = fs::read_to_string(path)?;
            JsonSource.parse(&raw)
        }
        _ => Err(PipelineError::SourceFormat(format!(
            "Unsupported file format '{}'. Use .csv or .json",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_path_rejects_unknown_extension() {
        let result = load_path(&PathBuf::from("fitness_data.xlsx"));
        assert!(matches!(result, Err(PipelineError::SourceFormat(_))));
    }
}
