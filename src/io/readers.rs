//! Benchmark readers.
//!
//! Every reader turns raw bytes into a `DataSet` in two steps: `read_from`
//! parses and validates, `create_dataset` shapes the parsed rows into points.
//! Readers never convert units; GuideLLM reports latencies in milliseconds
//! already.

use log::debug;
use serde_json::Value;

use crate::domain::{
    DataPoint, DataSet, InputFormat, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_NUM_TOKENS,
};
use crate::error::AppError;

pub mod guidellm_csv;
pub mod guidellm_html;
pub mod guidellm_json;

pub use guidellm_csv::GuideLlmCsvReader;
pub use guidellm_html::GuideLlmHtmlReader;
pub use guidellm_json::GuideLlmJsonReader;

/// Converts one benchmark export format into a `DataSet`.
pub trait BenchmarkReader {
    fn read_from(&mut self, bytes: &[u8]) -> Result<(), AppError>;
    fn create_dataset(&self) -> DataSet;
}

/// One benchmark run as reported by GuideLLM, whatever the file format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkRow {
    /// `synchronous`, `throughput`, `constant`, ...; empty when the format has none.
    pub strategy: String,
    pub request_rate: f64,
    pub input_tokens: f64,
    pub output_tokens: f64,
    /// Median TTFT (ms).
    pub ttft: f64,
    /// Mean ITL (ms).
    pub itl: f64,
}

/// Shape rows into a data set.
///
/// `throughput` runs saturate the server and are dropped; the strategy name
/// is matched ignoring ASCII case in every format, so `Throughput` is dropped
/// too. At most `limit` points are kept; batch and token limits get their
/// defaults.
pub fn rows_to_dataset(name: &str, rows: &[BenchmarkRow], limit: usize) -> DataSet {
    let mut ds = DataSet::new(name);
    for row in rows {
        if row.strategy.eq_ignore_ascii_case("throughput") {
            debug!("skipping throughput benchmark at {:.2} req/s", row.request_rate);
            continue;
        }
        if ds.len() >= limit {
            break;
        }
        ds.append(DataPoint {
            request_rate: row.request_rate,
            input_tokens: row.input_tokens,
            output_tokens: row.output_tokens,
            avg_ttft: row.ttft,
            avg_itl: row.itl,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_num_tokens: DEFAULT_MAX_NUM_TOKENS,
            ..DataPoint::default()
        });
    }
    ds
}

/// The crate's own `{name, data}` JSON.
#[derive(Debug, Clone, Default)]
pub struct DataSetReader {
    dataset: DataSet,
}

impl DataSetReader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BenchmarkReader for DataSetReader {
    fn read_from(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        self.dataset = serde_json::from_slice(bytes)
            .map_err(|e| AppError::new(2, format!("Invalid data set JSON: {e}")))?;
        Ok(())
    }

    fn create_dataset(&self) -> DataSet {
        self.dataset.clone()
    }
}

/// Resolve `InputFormat::Auto` from the location's extension and the content.
///
/// `.csv` and `.html`/`.htm` decide by extension. Anything else must be JSON:
/// a top-level array holds GuideLLM CSV records keyed by column name, an
/// object with a `data` array is a native data set, one with `benchmarks` is
/// a GuideLLM sweep.
pub fn detect_format(location: &str, bytes: &[u8]) -> Result<InputFormat, AppError> {
    let lower = location.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or(&lower);
    if path.ends_with(".csv") {
        return Ok(InputFormat::GuidellmCsv);
    }
    if path.ends_with(".html") || path.ends_with(".htm") {
        return Ok(InputFormat::GuidellmHtml);
    }
    if guidellm_csv::is_json_array(bytes) {
        return Ok(InputFormat::GuidellmCsv);
    }

    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::new(2, format!("Could not detect format of '{location}': not JSON ({e})")))?;
    if value.get("data").is_some_and(Value::is_array) {
        return Ok(InputFormat::Dataset);
    }
    if value.get("benchmarks").is_some_and(Value::is_array) {
        return Ok(InputFormat::GuidellmJson);
    }
    Err(AppError::new(
        2,
        format!("Could not detect format of '{location}': expected a `data` or `benchmarks` array."),
    ))
}

/// Build a reader for a concrete format.
pub fn reader_for(format: InputFormat, limit: usize) -> Result<Box<dyn BenchmarkReader>, AppError> {
    let reader: Box<dyn BenchmarkReader> = match format {
        InputFormat::Auto => {
            return Err(AppError::new(2, "Input format must be resolved before reading."));
        }
        InputFormat::Dataset => Box::new(DataSetReader::new()),
        InputFormat::GuidellmJson => Box::new(GuideLlmJsonReader::with_limit(limit)),
        InputFormat::GuidellmCsv => Box::new(GuideLlmCsvReader::with_limit(limit)),
        InputFormat::GuidellmHtml => Box::new(GuideLlmHtmlReader::with_limit(limit)),
    };
    Ok(reader)
}

/// Parse one input into a data set.
pub fn read_dataset(location: &str, bytes: &[u8], format: InputFormat, limit: usize) -> Result<DataSet, AppError> {
    let format = match format {
        InputFormat::Auto => detect_format(location, bytes)?,
        other => other,
    };
    debug!("reading '{location}' as {format:?}");

    let mut reader = reader_for(format, limit)?;
    reader
        .read_from(bytes)
        .map_err(|e| AppError::new(e.exit_code(), format!("{location}: {e}")))?;
    Ok(reader.create_dataset())
}
