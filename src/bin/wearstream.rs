//! Wearstream CLI - command-line interface for the cleaning pipeline
//!
//! Commands:
//! - clean: run the full pipeline and write the aligned series
//! - report: produce a quality report without aligning
//! - validate: run range validation and fail on violations

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use wearstream::{
    Aggregation, CsvSource, FillMethod, Interval, JsonSource, Pipeline, PipelineConfig,
    PipelineError, QualityReport, RangeRules, RawRecord, Scalar, SourceAdapter, TimeSeriesTable,
    ValidationOutcome, Validator, VERSION,
};

/// Wearstream - cleaning and alignment engine for wearable sensor data
#[derive(Parser)]
#[command(name = "wearstream")]
#[command(version = VERSION)]
#[command(about = "Clean, align and validate wearable sensor time series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the aligned series
    Clean {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format; required when reading stdin, otherwise inferred
        /// from the file extension
        #[arg(long)]
        format: Option<InputFormat>,

        /// Resampling interval
        #[arg(long, default_value = "1h")]
        interval: IntervalArg,

        /// Gap fill strategy
        #[arg(long, default_value = "interpolate")]
        fill: FillArg,

        /// Per-bucket aggregation
        #[arg(long, default_value = "mean")]
        aggregation: AggregationArg,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Also write the quality report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Load range rules from a JSON file (defaults to the built-in set)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Skip validation of the pre-alignment table
        #[arg(long)]
        skip_raw_validation: bool,

        /// Also validate the aligned table
        #[arg(long)]
        validate_aligned: bool,
    },

    /// Produce a quality report without aligning
    Report {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format; required when reading stdin
        #[arg(long)]
        format: Option<InputFormat>,

        /// Pretty-print the report JSON
        #[arg(long)]
        json: bool,
    },

    /// Run range validation; exits non-zero when violations exist
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format; required when reading stdin
        #[arg(long)]
        format: Option<InputFormat>,

        /// Load range rules from a JSON file (defaults to the built-in set)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Output the validation outcome as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Delimited text with a header row
    Csv,
    /// JSON array of objects, or NDJSON
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// JSON array of row objects
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// Delimited text with a header row
    Csv,
}

#[derive(Clone, Copy, ValueEnum)]
enum IntervalArg {
    #[value(name = "1m")]
    Min1,
    #[value(name = "5m")]
    Min5,
    #[value(name = "15m")]
    Min15,
    #[value(name = "30m")]
    Min30,
    #[value(name = "1h")]
    Hour1,
}

impl From<IntervalArg> for Interval {
    fn from(arg: IntervalArg) -> Self {
        match arg {
            IntervalArg::Min1 => Interval::Min1,
            IntervalArg::Min5 => Interval::Min5,
            IntervalArg::Min15 => Interval::Min15,
            IntervalArg::Min30 => Interval::Min30,
            IntervalArg::Hour1 => Interval::Hour1,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FillArg {
    Interpolate,
    #[value(name = "forward_fill")]
    ForwardFill,
    #[value(name = "backward_fill")]
    BackwardFill,
    Zero,
    Drop,
}

impl From<FillArg> for FillMethod {
    fn from(arg: FillArg) -> Self {
        match arg {
            FillArg::Interpolate => FillMethod::Interpolate,
            FillArg::ForwardFill => FillMethod::ForwardFill,
            FillArg::BackwardFill => FillMethod::BackwardFill,
            FillArg::Zero => FillMethod::Zero,
            FillArg::Drop => FillMethod::Drop,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum AggregationArg {
    Mean,
    Sum,
    Min,
    Max,
    Last,
}

impl From<AggregationArg> for Aggregation {
    fn from(arg: AggregationArg) -> Self {
        match arg {
            AggregationArg::Mean => Aggregation::Mean,
            AggregationArg::Sum => Aggregation::Sum,
            AggregationArg::Min => Aggregation::Min,
            AggregationArg::Max => Aggregation::Max,
            AggregationArg::Last => Aggregation::Last,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let rendered = serde_json::to_string(&CliError::from(&e))
                .unwrap_or_else(|_| "Unknown error".to_string());
            eprintln!("{}", rendered);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), WearCliError> {
    match cli.command {
        Commands::Clean {
            input,
            format,
            interval,
            fill,
            aggregation,
            output,
            output_format,
            report,
            rules,
            skip_raw_validation,
            validate_aligned,
        } => cmd_clean(
            &input,
            format,
            interval,
            fill,
            aggregation,
            &output,
            output_format,
            report.as_deref(),
            rules.as_deref(),
            skip_raw_validation,
            validate_aligned,
        ),

        Commands::Report {
            input,
            format,
            json,
        } => cmd_report(&input, format, json),

        Commands::Validate {
            input,
            format,
            rules,
            json,
        } => cmd_validate(&input, format, rules.as_deref(), json),
    }
}

fn cmd_clean(
    input: &Path,
    format: Option<InputFormat>,
    interval: IntervalArg,
    fill: FillArg,
    aggregation: AggregationArg,
    output: &Path,
    output_format: OutputFormat,
    report_path: Option<&Path>,
    rules_path: Option<&Path>,
    skip_raw_validation: bool,
    validate_aligned: bool,
) -> Result<(), WearCliError> {
    let records = read_records(input, format)?;

    let config = PipelineConfig {
        interval: interval.into(),
        fill_method: fill.into(),
        aggregation: aggregation.into(),
        rules: load_rules(rules_path)?,
        validate_raw: !skip_raw_validation,
        validate_aligned,
    };

    let result = Pipeline::new(config).run_records(&records)?;

    let rendered = match output_format {
        OutputFormat::Json => serde_json::to_string(&table_to_json(&result.aligned))?,
        OutputFormat::JsonPretty => {
            serde_json::to_string_pretty(&table_to_json(&result.aligned))?
        }
        OutputFormat::Csv => table_to_csv(&result.aligned)?,
    };
    write_output(output, &rendered)?;

    if let Some(path) = report_path {
        fs::write(path, result.report.to_json_pretty()?)?;
    }

    Ok(())
}

fn cmd_report(
    input: &Path,
    format: Option<InputFormat>,
    pretty: bool,
) -> Result<(), WearCliError> {
    let records = read_records(input, format)?;
    let normalized = wearstream::Normalizer::normalize(&records);
    let report = QualityReport::for_table(&normalized.table);

    let rendered = if pretty {
        report.to_json_pretty()?
    } else {
        report.to_json()?
    };
    println!("{}", rendered);

    Ok(())
}

fn cmd_validate(
    input: &Path,
    format: Option<InputFormat>,
    rules_path: Option<&Path>,
    json: bool,
) -> Result<(), WearCliError> {
    let records = read_records(input, format)?;
    let normalized = wearstream::Normalizer::normalize(&records);
    let rules = load_rules(rules_path)?;

    let outcome = Validator::validate(&normalized.table, &rules)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    if outcome.is_clean() {
        Ok(())
    } else {
        Err(WearCliError::ValidationFailed(outcome.violating_rows.len()))
    }
}

fn print_outcome(outcome: &ValidationOutcome) {
    if outcome.is_clean() {
        println!("No errors found.");
        return;
    }
    println!("Data quality errors detected:");
    for message in &outcome.messages {
        println!("- {}", message);
    }
    println!("{} row(s) with errors", outcome.violating_rows.len());
}

/// Read records from a path, or from stdin when the path is `-`.
fn read_records(
    input: &Path,
    format: Option<InputFormat>,
) -> Result<Vec<RawRecord>, WearCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(WearCliError::NoInput);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        let format = format.ok_or(WearCliError::FormatRequired)?;
        let records = match format {
            InputFormat::Csv => CsvSource.parse(&buffer)?,
            InputFormat::Json => JsonSource.parse(&buffer)?,
        };
        return Ok(records);
    }

    match format {
        Some(InputFormat::Csv) => Ok(CsvSource.parse(&fs::read_to_string(input)?)?),
        Some(InputFormat::Json) => Ok(JsonSource.parse(&fs::read_to_string(input)?)?),
        None => Ok(wearstream::load_path(input)?),
    }
}

fn load_rules(path: Option<&Path>) -> Result<RangeRules, WearCliError> {
    match path {
        Some(p) => {
            let raw = fs::read_to_string(p)?;
            Ok(serde_json::from_str(&raw)?)
        }
        None => Ok(RangeRules::default()),
    }
}

fn write_output(output: &Path, rendered: &str) -> Result<(), WearCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", rendered);
    } else {
        fs::write(output, rendered)?;
    }
    Ok(())
}

/// Flatten a table to a JSON array of row objects, timestamps as RFC 3339.
fn table_to_json(table: &TimeSeriesTable) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = table
        .rows
        .iter()
        .map(|row| {
            let mut object = serde_json::Map::new();
            if let Some(ts) = row.timestamp {
                object.insert(
                    "timestamp".to_string(),
                    serde_json::Value::String(ts.to_rfc3339()),
                );
            }
            for (column, cell) in &row.cells {
                object.insert(column.clone(), scalar_to_json(cell));
            }
            serde_json::Value::Object(object)
        })
        .collect();
    serde_json::Value::Array(rows)
}

fn scalar_to_json(cell: &Scalar) -> serde_json::Value {
    match cell {
        Scalar::Null => serde_json::Value::Null,
        Scalar::Bool(b) => serde_json::Value::Bool(*b),
        Scalar::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Scalar::Text(t) => serde_json::Value::String(t.clone()),
    }
}

/// Render a table as CSV, null cells as empty fields.
fn table_to_csv(table: &TimeSeriesTable) -> Result<String, WearCliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;

    for row in &table.rows {
        let fields: Vec<String> = table
            .columns
            .iter()
            .map(|column| {
                if column == "timestamp" {
                    return row.timestamp.map(|ts| ts.to_rfc3339()).unwrap_or_default();
                }
                match row.get(column) {
                    Some(Scalar::Number(n)) => n.to_string(),
                    Some(Scalar::Text(t)) => t.clone(),
                    Some(Scalar::Bool(b)) => b.to_string(),
                    Some(Scalar::Null) | None => String::new(),
                }
            })
            .collect();
        writer.write_record(&fields)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| WearCliError::ParseError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| WearCliError::ParseError(e.to_string()))
}

#[derive(Debug)]
enum WearCliError {
    Io(io::Error),
    Pipeline(PipelineError),
    Json(serde_json::Error),
    Csv(csv::Error),
    NoInput,
    FormatRequired,
    ValidationFailed(usize),
    ParseError(String),
}

impl From<io::Error> for WearCliError {
    fn from(e: io::Error) -> Self {
        WearCliError::Io(e)
    }
}

impl From<PipelineError> for WearCliError {
    fn from(e: PipelineError) -> Self {
        WearCliError::Pipeline(e)
    }
}

impl From<serde_json::Error> for WearCliError {
    fn from(e: serde_json::Error) -> Self {
        WearCliError::Json(e)
    }
}

impl From<csv::Error> for WearCliError {
    fn from(e: csv::Error) -> Self {
        WearCliError::Csv(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<&WearCliError> for CliError {
    fn from(e: &WearCliError) -> Self {
        match e {
            WearCliError::Io(err) => CliError {
                code: "io_error".to_string(),
                message: err.to_string(),
                hint: None,
            },
            WearCliError::Pipeline(err) => CliError {
                code: "pipeline_error".to_string(),
                message: err.to_string(),
                hint: match err {
                    PipelineError::MissingColumn(_) => Some(
                        "Check the rule set against the input's columns".to_string(),
                    ),
                    PipelineError::SourceFormat(_) => {
                        Some("Supported formats: .csv, .json, .ndjson".to_string())
                    }
                    _ => None,
                },
            },
            WearCliError::Json(err) => CliError {
                code: "json_error".to_string(),
                message: err.to_string(),
                hint: None,
            },
            WearCliError::Csv(err) => CliError {
                code: "csv_error".to_string(),
                message: err.to_string(),
                hint: None,
            },
            WearCliError::NoInput => CliError {
                code: "no_input".to_string(),
                message: "stdin is a terminal; pipe data in or pass a file path".to_string(),
                hint: Some("Example: wearstream clean -i data.csv".to_string()),
            },
            WearCliError::FormatRequired => CliError {
                code: "format_required".to_string(),
                message: "reading stdin requires --format".to_string(),
                hint: Some("Pass --format csv or --format json".to_string()),
            },
            WearCliError::ValidationFailed(rows) => CliError {
                code: "validation_failed".to_string(),
                message: format!("{} row(s) violated range rules", rows),
                hint: None,
            },
            WearCliError::ParseError(msg) => CliError {
                code: "parse_error".to_string(),
                message: msg.clone(),
                hint: None,
            },
        }
    }
}
