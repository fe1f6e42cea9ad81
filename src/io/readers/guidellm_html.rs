//! GuideLLM HTML report.
//!
//! The report embeds its data as script assignments:
//!
//! ```text
//! window.benchmarks = [ {...}, ... ];
//! window.workloadDetails = { "prompts": {...}, "generations": {...}, ... };
//! ```
//!
//! Both literals are cut out by bracket counting (ignoring brackets inside
//! strings) and handed to serde_json.

use log::{debug, warn};
use serde::Deserialize;

use crate::domain::{DataSet, DEFAULT_LIMIT_NUM_DATA_POINTS};
use crate::error::AppError;
use crate::io::readers::{rows_to_dataset, BenchmarkReader, BenchmarkRow};

/// Token count assumed when the workload details are missing.
const DEFAULT_TOKENS: f64 = 64.0;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Statistics {
    mean: f64,
    median: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawBenchmark {
    itl: Statistics,
    ttft: Statistics,
    requests_per_second: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WorkloadDetails {
    prompts: Option<TokenSection>,
    generations: Option<TokenSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TokenSection {
    token_distributions: Option<TokenDistributions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TokenDistributions {
    statistics: Option<Statistics>,
}

impl TokenSection {
    fn mean(&self) -> Option<f64> {
        self.token_distributions
            .as_ref()
            .and_then(|d| d.statistics.as_ref())
            .map(|s| s.mean)
    }
}

/// Reads `window.benchmarks` and `window.workloadDetails`.
///
/// The report does not label strategies, so they follow the sweep order:
/// first synchronous, second throughput, the rest constant rate.
#[derive(Debug, Clone)]
pub struct GuideLlmHtmlReader {
    limit: usize,
    rows: Vec<BenchmarkRow>,
}

impl GuideLlmHtmlReader {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_LIMIT_NUM_DATA_POINTS)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            rows: Vec::new(),
        }
    }
}

impl Default for GuideLlmHtmlReader {
    fn default() -> Self {
        Self::new()
    }
}

fn strategy_for(index: usize) -> &'static str {
    match index {
        0 => "synchronous",
        1 => "throughput",
        _ => "constant",
    }
}

impl BenchmarkReader for GuideLlmHtmlReader {
    fn read_from(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        let html = String::from_utf8_lossy(bytes);

        let benchmarks_json = extract_literal(&html, "window.benchmarks", b'[')
            .map_err(|e| AppError::new(2, format!("Could not find window.benchmarks in HTML: {e}")))?;
        let raw: Vec<RawBenchmark> = serde_json::from_str(benchmarks_json)
            .map_err(|e| AppError::new(2, format!("Failed to parse benchmarks JSON: {e}")))?;

        let workload = match extract_literal(&html, "window.workloadDetails", b'{') {
            Ok(text) => serde_json::from_str::<WorkloadDetails>(text).unwrap_or_else(|e| {
                warn!("ignoring unparsable workload details: {e}");
                WorkloadDetails::default()
            }),
            Err(e) => {
                debug!("no workload details: {e}");
                WorkloadDetails::default()
            }
        };
        let input_tokens = workload.prompts.as_ref().and_then(TokenSection::mean).unwrap_or(DEFAULT_TOKENS);
        let output_tokens = workload
            .generations
            .as_ref()
            .and_then(TokenSection::mean)
            .unwrap_or(DEFAULT_TOKENS);

        self.rows = raw
            .into_iter()
            .enumerate()
            .map(|(i, b)| BenchmarkRow {
                strategy: strategy_for(i).to_string(),
                request_rate: b.requests_per_second,
                input_tokens,
                output_tokens,
                ttft: b.ttft.median,
                itl: b.itl.mean,
            })
            .collect();
        Ok(())
    }

    fn create_dataset(&self) -> DataSet {
        rows_to_dataset("GuideLLM HTML benchmark data", &self.rows, self.limit)
    }
}

/// Slice out the literal assigned to `var` (`var = [ ... ]` or `var = { ... }`).
///
/// `open` is the expected first byte (`[` or `{`). Both bracket kinds count
/// toward nesting; quotes toggle string mode and backslashes escape one byte.
fn extract_literal<'a>(content: &'a str, var: &str, open: u8) -> Result<&'a str, String> {
    let bytes = content.as_bytes();
    let close = if open == b'[' { b']' } else { b'}' };

    let start = content
        .match_indices(var)
        .find_map(|(pos, _)| {
            let mut i = pos + var.len();
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if bytes.get(i) != Some(&b'=') {
                return None;
            }
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            (bytes.get(i) == Some(&open)).then_some(i)
        })
        .ok_or_else(|| format!("variable {var} not found"))?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;
    for (offset, &c) in bytes[start..].iter().enumerate() {
        if escape {
            escape = false;
            continue;
        }
        match c {
            b'\\' => escape = true,
            b'"' => in_string = !in_string,
            b'[' | b'{' if !in_string => depth += 1,
            b']' | b'}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 && c == close {
                    return Ok(&content[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    Err("matching closing bracket not found".to_string())
}
