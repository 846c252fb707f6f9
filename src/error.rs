//! Error types for the wearstream pipeline

use thiserror::Error;

/// Errors that can occur while loading or validating data.
///
/// Value-level anomalies (out-of-range readings, null gaps, dropped rows)
/// are reported through the quality report instead of this enum; only
/// unrecoverable format and configuration problems surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported source format: {0}")]
    SourceFormat(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation rule references missing column: {0}")]
    MissingColumn(String),

    #[error("Timestamp parse error: {0}")]
    Timestamp(String),
}
