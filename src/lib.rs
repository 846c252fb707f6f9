//! Wearstream - cleaning and alignment engine for noisy wearable sensor data
//!
//! Wearstream turns irregular, loosely typed wearable records into a clean,
//! uniformly sampled time series through a deterministic pipeline: source
//! parsing → schema normalization → temporal alignment → range validation
//! → quality reporting.
//!
//! ## Modules
//!
//! - **Sources**: CSV / JSON / NDJSON adapters producing raw records
//! - **Normalizer**: column canonicalization, timestamp parsing, metric coercion
//! - **Aligner**: fixed-frequency resampling with configurable gap filling
//! - **Validator**: range rules and violation reporting
//! - **Report**: shape, missingness and descriptive statistics
//! - **Pipeline**: one entry point sequencing the stages

pub mod aligner;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod sources;
pub mod types;
pub mod validator;

pub use aligner::Aligner;
pub use error::PipelineError;
pub use normalizer::{NormalizedTable, Normalizer};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput};
pub use report::QualityReport;
pub use sources::{load_path, CsvSource, JsonSource, SourceAdapter};
pub use types::{
    Aggregation, FillMethod, Interval, MetricRange, RangeRules, RawRecord, Row, Scalar,
    TimeSeriesTable,
};
pub use validator::{ValidationOutcome, Validator};

/// Wearstream version embedded in report provenance
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report provenance
pub const PRODUCER_NAME: &str = "wearstream";
