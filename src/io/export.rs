//! Export fit results and data sets.
//!
//! - summary JSON: the training response document plus run metadata
//! - points CSV: measured vs predicted per point, for spreadsheets
//! - data set JSON: the native `{name, data}` format (synthetic runs, normalized inputs)

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{DataSet, FitSummary, ModelParams};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDocument<'a> {
    generated_at: DateTime<Utc>,
    dataset: &'a str,
    initial_parms: &'a ModelParams,
    #[serde(flatten)]
    summary: &'a FitSummary,
}

/// Write the fit summary as pretty JSON.
pub fn write_summary_json(
    path: &Path,
    summary: &FitSummary,
    dataset_name: &str,
    initial: &ModelParams,
) -> Result<(), AppError> {
    let doc = SummaryDocument {
        generated_at: Utc::now(),
        dataset: dataset_name,
        initial_parms: initial,
        summary,
    };
    let json = serde_json::to_string_pretty(&doc)
        .map_err(|e| AppError::new(2, format!("Failed to serialize summary JSON: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON '{}': {e}", path.display())))
}

/// Write the per-point trace to CSV.
pub fn write_points_csv(path: &Path, summary: &FitSummary) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writeln!(
        file,
        "request_rate,input_tokens,output_tokens,ttft_measured,ttft_predicted,itl_measured,itl_predicted,rho"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for p in &summary.points {
        writeln!(
            file,
            "{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{:.4},{}",
            p.request_rate,
            p.input_tokens,
            p.output_tokens,
            p.ttft_measured,
            p.ttft_predicted,
            p.itl_measured,
            p.itl_predicted,
            p.rho.map(|v| format!("{v:.6}")).unwrap_or_default(),
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

/// Serialize a data set in the native JSON format.
pub fn dataset_to_json(dataset: &DataSet) -> Result<String, AppError> {
    serde_json::to_string_pretty(dataset).map_err(|e| AppError::new(2, format!("Failed to serialize data set: {e}")))
}

pub fn write_dataset_json(path: &Path, dataset: &DataSet) -> Result<(), AppError> {
    let json = dataset_to_json(dataset)?;
    std::fs::write(path, json)
        .map_err(|e| AppError::new(2, format!("Failed to write data set JSON '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataPoint, ErrorReport, PointTrace};

    fn temp(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("latfit-{}-{name}", std::process::id()))
    }

    fn summary() -> FitSummary {
        FitSummary {
            optimized_parms: ModelParams::new(6.0, 0.012, 4e-5),
            analysis_results: ErrorReport {
                avg_err_ttft: 1.0,
                avg_err_itl: 0.5,
                avg_err_weighted: 2.0 / 3.0,
            },
            objective: 2.0 / 3.0,
            iterations: 120,
            num_points: 1,
            points: vec![PointTrace {
                request_rate: 2.0,
                input_tokens: 256.0,
                output_tokens: 128.0,
                ttft_measured: 40.0,
                ttft_predicted: 41.0,
                itl_measured: 8.0,
                itl_predicted: 8.5,
                rho: Some(0.25),
            }],
        }
    }

    #[test]
    fn summary_json_keeps_response_keys_and_metadata() {
        let path = temp("summary.json");
        write_summary_json(&path, &summary(), "bench", &ModelParams::new(1.0, 0.05, 1e-5)).unwrap();

        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["dataset"], "bench");
        assert!(v["generatedAt"].is_string());
        assert_eq!(v["optimizedParms"]["alpha"], 6.0);
        assert_eq!(v["analysisResults"]["avgErrITL"], 0.5);
        assert_eq!(v["initialParms"]["beta"], 0.05);
        assert_eq!(v["iterations"], 120);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn points_csv_has_one_row_per_point() {
        let path = temp("points.csv");
        write_points_csv(&path, &summary()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("request_rate,"));
        assert!(lines[1].ends_with(",0.250000"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn dataset_json_reads_back() {
        let mut ds = DataSet::new("synthetic");
        ds.append(DataPoint { request_rate: 3.0, avg_itl: 9.0, ..DataPoint::default() });
        let path = temp("dataset.json");
        write_dataset_json(&path, &ds).unwrap();
        let back: DataSet = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, ds);
        std::fs::remove_file(&path).ok();
    }
}
