//! GuideLLM CSV exports.
//!
//! Two header schemas exist in the wild:
//!
//! - v1: flat names such as `Successful Requests per second mean`
//! - v2: pipe-separated groups such as `Server Throughput | Successful Requests/Sec | Mean`
//!
//! The schema is chosen from the header row; unknown columns are ignored.
//!
//! The same records also arrive as a JSON array of objects keyed by the
//! column names; the schema then comes from the keys of the first object.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::{DataSet, DEFAULT_LIMIT_NUM_DATA_POINTS};
use crate::error::AppError;
use crate::io::readers::{rows_to_dataset, BenchmarkReader, BenchmarkRow};

/// Column that only the v2 schema carries.
const V2_MARKER: &str = "Benchmark | Strategy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvSchema {
    V1,
    V2,
}

impl CsvSchema {
    fn detect<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let v2 = headers
            .into_iter()
            .any(|h| h.trim_start_matches('\u{feff}').trim() == V2_MARKER || h.contains(" | "));
        if v2 { CsvSchema::V2 } else { CsvSchema::V1 }
    }

    fn dataset_name(self) -> &'static str {
        match self {
            CsvSchema::V1 => "GuideLLM CSV benchmark data",
            CsvSchema::V2 => "GuideLLM CSV v2 benchmark data",
        }
    }
}

#[derive(Debug, Deserialize)]
struct V1Record {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Successful Requests per second mean", default, deserialize_with = "csv::invalid_option")]
    rps: Option<f64>,
    #[serde(rename = "Successful Prompt token count mean", default, deserialize_with = "csv::invalid_option")]
    input_tokens: Option<f64>,
    #[serde(rename = "Successful Output token count mean", default, deserialize_with = "csv::invalid_option")]
    output_tokens: Option<f64>,
    #[serde(rename = "Successful Time to first token ms median", default, deserialize_with = "csv::invalid_option")]
    ttft: Option<f64>,
    #[serde(rename = "Successful Inter token latency ms mean", default, deserialize_with = "csv::invalid_option")]
    itl: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct V2Record {
    #[serde(rename = "Benchmark | Strategy", default)]
    name: String,
    #[serde(
        rename = "Server Throughput | Successful Requests/Sec | Mean",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    rps: Option<f64>,
    #[serde(
        rename = "Token Metrics | Successful Input Tokens | Mean",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    input_tokens: Option<f64>,
    #[serde(
        rename = "Token Metrics | Successful Output Tokens | Mean",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    output_tokens: Option<f64>,
    #[serde(
        rename = "Time to First Token | Successful ms | Median",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    ttft: Option<f64>,
    #[serde(
        rename = "Inter Token Latency | Successful ms | Mean",
        default,
        deserialize_with = "csv::invalid_option"
    )]
    itl: Option<f64>,
}

impl From<V1Record> for BenchmarkRow {
    fn from(r: V1Record) -> Self {
        BenchmarkRow {
            strategy: r.name,
            request_rate: r.rps.unwrap_or(0.0),
            input_tokens: r.input_tokens.unwrap_or(0.0),
            output_tokens: r.output_tokens.unwrap_or(0.0),
            ttft: r.ttft.unwrap_or(0.0),
            itl: r.itl.unwrap_or(0.0),
        }
    }
}

impl From<V2Record> for BenchmarkRow {
    fn from(r: V2Record) -> Self {
        BenchmarkRow {
            strategy: r.name,
            request_rate: r.rps.unwrap_or(0.0),
            input_tokens: r.input_tokens.unwrap_or(0.0),
            output_tokens: r.output_tokens.unwrap_or(0.0),
            ttft: r.ttft.unwrap_or(0.0),
            itl: r.itl.unwrap_or(0.0),
        }
    }
}

/// Reads either CSV schema; rows are keyed by the `Name`/`Strategy` column.
#[derive(Debug, Clone)]
pub struct GuideLlmCsvReader {
    limit: usize,
    schema: CsvSchema,
    rows: Vec<BenchmarkRow>,
}

impl GuideLlmCsvReader {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_LIMIT_NUM_DATA_POINTS)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            schema: CsvSchema::V1,
            rows: Vec::new(),
        }
    }

    /// Schema detected by the last successful `read_from`.
    pub fn schema(&self) -> CsvSchema {
        self.schema
    }
}

impl Default for GuideLlmCsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchmarkReader for GuideLlmCsvReader {
    fn read_from(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        let (schema, rows) = if is_json_array(bytes) {
            read_json_records(bytes)?
        } else {
            read_csv_records(bytes)?
        };
        self.schema = schema;
        self.rows = rows;
        Ok(())
    }

    fn create_dataset(&self) -> DataSet {
        rows_to_dataset(self.schema.dataset_name(), &self.rows, self.limit)
    }
}

/// First significant byte is `[`.
pub fn is_json_array(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    bytes.trim_ascii_start().starts_with(b"[")
}

fn read_csv_records(bytes: &[u8]) -> Result<(CsvSchema, Vec<BenchmarkRow>), AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let schema = CsvSchema::detect(headers.iter());

    let rows = match schema {
        CsvSchema::V1 => parse_records::<V1Record>(&mut reader)?,
        CsvSchema::V2 => parse_records::<V2Record>(&mut reader)?,
    };
    Ok((schema, rows))
}

fn parse_records<R>(reader: &mut csv::Reader<&[u8]>) -> Result<Vec<BenchmarkRow>, AppError>
where
    R: DeserializeOwned + Into<BenchmarkRow>,
{
    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize::<R>().enumerate() {
        // +2: records start after the header, lines are 1-based.
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error on line {}: {e}", idx + 2)))?;
        rows.push(record.into());
    }
    Ok(rows)
}

fn read_json_records(bytes: &[u8]) -> Result<(CsvSchema, Vec<BenchmarkRow>), AppError> {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    let records: Vec<Value> =
        serde_json::from_slice(bytes).map_err(|e| AppError::new(2, format!("Invalid GuideLLM CSV records JSON: {e}")))?;

    let schema = records
        .first()
        .and_then(Value::as_object)
        .map(|first| CsvSchema::detect(first.keys().map(String::as_str)))
        .unwrap_or(CsvSchema::V1);

    let rows = match schema {
        CsvSchema::V1 => decode_records::<V1Record>(records)?,
        CsvSchema::V2 => decode_records::<V2Record>(records)?,
    };
    Ok((schema, rows))
}

fn decode_records<R>(records: Vec<Value>) -> Result<Vec<BenchmarkRow>, AppError>
where
    R: DeserializeOwned + Into<BenchmarkRow>,
{
    records
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            serde_json::from_value::<R>(value)
                .map(Into::into)
                .map_err(|e| AppError::new(2, format!("Invalid record {} in GuideLLM CSV records JSON: {e}", idx + 1)))
        })
        .collect()
}
