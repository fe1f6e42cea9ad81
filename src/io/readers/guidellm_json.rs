//! GuideLLM sweep JSON (`guidellm benchmark --output-path *.json`).

use serde::Deserialize;

use crate::domain::{DataSet, DEFAULT_LIMIT_NUM_DATA_POINTS};
use crate::error::AppError;
use crate::io::readers::{rows_to_dataset, BenchmarkReader, BenchmarkRow};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SweepReport {
    benchmarks: Vec<Benchmark>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Benchmark {
    #[serde(rename = "id_")]
    id: String,
    metrics: Metrics,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metrics {
    requests_per_second: Categories,
    prompt_token_count: Categories,
    output_token_count: Categories,
    time_to_first_token_ms: Categories,
    inter_token_latency_ms: Categories,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Categories {
    successful: Measures,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Measures {
    mean: f64,
    median: f64,
}

/// Reads the `benchmarks[].metrics.*.successful` statistics.
///
/// TTFT uses the median since its distribution has a long tail.
#[derive(Debug, Clone)]
pub struct GuideLlmJsonReader {
    limit: usize,
    rows: Vec<BenchmarkRow>,
}

impl GuideLlmJsonReader {
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

impl Default for GuideLlmJsonReader {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchmarkReader for GuideLlmJsonReader {
    fn read_from(&mut self, bytes: &[u8]) -> Result<(), AppError> {
        let report: SweepReport = serde_json::from_slice(bytes)
            .map_err(|e| AppError::new(2, format!("Invalid GuideLLM JSON: {e}")))?;

        self.rows = report
            .benchmarks
            .into_iter()
            .map(|b| {
                log::trace!("benchmark {}", b.id);
                let m = b.metrics;
                BenchmarkRow {
                    strategy: String::new(),
                    request_rate: m.requests_per_second.successful.mean,
                    input_tokens: m.prompt_token_count.successful.mean,
                    output_tokens: m.output_token_count.successful.mean,
                    ttft: m.time_to_first_token_ms.successful.median,
                    itl: m.inter_token_latency_ms.successful.mean,
                }
            })
            .collect();
        Ok(())
    }

    fn create_dataset(&self) -> DataSet {
        rows_to_dataset("GuideLLM benchmark data", &self.rows, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SWEEP: &str = r#"{
      "benchmarks": [
        {
          "id_": "b1",
          "metrics": {
            "requests_per_second": {"successful": {"mean": 2.5, "median": 2.4, "std_dev": 0.1}},
            "prompt_token_count": {"successful": {"mean": 512.0, "median": 510.0}},
            "output_token_count": {"successful": {"mean": 128.0, "median": 128.0}},
            "time_to_first_token_ms": {"successful": {"mean": 90.0, "median": 75.0}},
            "inter_token_latency_ms": {"successful": {"mean": 12.5, "median": 12.0}},
            "request_latency": {"successful": {"mean": 1.7}}
          }
        },
        {"id_": "b2", "metrics": {"requests_per_second": {"successful": {"mean": 5.0}}}}
      ]
    }"#;

    #[test]
    fn reads_successful_statistics() {
        let mut reader = GuideLlmJsonReader::new();
        reader.read_from(SWEEP.as_bytes()).unwrap();
        let ds = reader.create_dataset();

        assert_eq!(ds.len(), 2);
        let p = &ds.data[0];
        assert_eq!(p.request_rate, 2.5);
        assert_eq!(p.input_tokens, 512.0);
        assert_eq!(p.output_tokens, 128.0);
        assert_eq!(p.avg_ttft, 75.0);
        assert_eq!(p.avg_itl, 12.5);
        assert_eq!(ds.data[1].request_rate, 5.0);
        assert_eq!(ds.data[1].avg_itl, 0.0);
    }

    #[test]
    fn limit_applies() {
        let mut reader = GuideLlmJsonReader::with_limit(1);
        reader.read_from(SWEEP.as_bytes()).unwrap();
        assert_eq!(reader.create_dataset().len(), 1);
    }

    #[test]
    fn malformed_json_is_an_input_error() {
        let err = GuideLlmJsonReader::new().read_from(b"[1, 2").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
