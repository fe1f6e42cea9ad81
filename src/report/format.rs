//! Formatted terminal output.
//!
//! Formatting lives here so the estimation code stays free of presentation
//! and output changes stay localized.

use crate::domain::{DataSet, ErrorReport, FitSummary, ModelParams, PointTrace};

/// Data set header plus one row per point.
pub fn format_dataset(dataset: &DataSet) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== latfit - data set '{}' ===\n", dataset.name));
    if dataset.is_empty() {
        out.push_str("Points: n=0\n");
        return out;
    }

    let (min_rate, max_rate) = dataset
        .data
        .iter()
        .map(|p| p.request_rate)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| (lo.min(r), hi.max(r)));
    out.push_str(&format!(
        "Points: n={} | rate=[{:.3}, {:.3}] req/s\n\n",
        dataset.len(),
        min_rate,
        max_rate
    ));

    out.push_str(&header_line(&[
        ("rps", 8),
        ("inToken", 10),
        ("outToken", 10),
        ("TTFT", 10),
        ("ITL", 10),
        ("batch", 7),
        ("maxTok", 7),
    ]));
    for p in &dataset.data {
        out.push_str(
            format!(
                "{:>8.3} {:>10.2} {:>10.2} {:>10.3} {:>10.3} {:>7} {:>7}\n",
                p.request_rate, p.input_tokens, p.output_tokens, p.avg_ttft, p.avg_itl, p.max_batch_size, p.max_num_tokens
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Fit diagnostics: starting point, estimate, objective and residuals.
pub fn format_fit_summary(dataset: &DataSet, initial: &ModelParams, summary: &FitSummary) -> String {
    let mut out = String::new();

    out.push_str("=== latfit - Latency Model Fit ===\n");
    out.push_str(&format!("Data set: {} ({} points)\n", dataset.name, summary.num_points));
    out.push_str(&format!("Initial  : {}\n", fmt_params(initial)));
    out.push_str(&format!("Estimated: {}\n", fmt_params(&summary.optimized_parms)));
    out.push_str(&format!(
        "Objective: {:.6} after {} iterations\n",
        summary.objective, summary.iterations
    ));
    out.push('\n');
    out.push_str(&format_error_report(&summary.analysis_results));

    out.push_str(&format!(
        "\nSummary: alpha: {:.6}, beta: {:.9}, gamma: {:.12}, errTTFT: {:.6}, errITL: {:.6}, errWeightedAvg: {:.6}\n",
        summary.optimized_parms.alpha,
        summary.optimized_parms.beta,
        summary.optimized_parms.gamma,
        summary.analysis_results.avg_err_ttft,
        summary.analysis_results.avg_err_itl,
        summary.analysis_results.avg_err_weighted,
    ));

    out
}

pub fn format_error_report(report: &ErrorReport) -> String {
    let mut out = String::new();
    out.push_str("Average absolute errors (ms):\n");
    out.push_str(&format!("- TTFT    : {:.6}\n", report.avg_err_ttft));
    out.push_str(&format!("- ITL     : {:.6}\n", report.avg_err_itl));
    out.push_str(&format!("- weighted: {:.6}\n", report.avg_err_weighted));
    out
}

/// Measured vs predicted table.
pub fn format_trace(points: &[PointTrace]) -> String {
    let mut out = String::new();

    out.push_str(&header_line(&[
        ("rps", 8),
        ("inToken", 10),
        ("outToken", 10),
        ("TTFTMeas", 10),
        ("TTFTPred", 10),
        ("ITLMeas", 10),
        ("ITLPred", 10),
        ("rho", 6),
    ]));
    for p in points {
        let rho = p.rho.map(|v| format!("{v:.3}")).unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:>8.3} {:>10.2} {:>10.2} {:>10.3} {:>10.3} {:>10.3} {:>10.3} {:>6}\n",
                p.request_rate,
                p.input_tokens,
                p.output_tokens,
                p.ttft_measured,
                p.ttft_predicted,
                p.itl_measured,
                p.itl_predicted,
                rho
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Title plus trace table for the worst-explained points.
pub fn format_worst_points(points: &[PointTrace]) -> String {
    let mut out = String::new();
    out.push_str("Largest residuals:\n");
    out.push_str(&format_trace(points));
    out
}

fn header_line(columns: &[(&str, usize)]) -> String {
    let names: Vec<String> = columns.iter().map(|&(name, w)| format!("{name:>w$}")).collect();
    let rules: Vec<String> = columns.iter().map(|&(_, w)| "-".repeat(w)).collect();
    format!("{}\n{}\n", names.join(" ").trim_end(), rules.join(" "))
}

fn fmt_params(p: &ModelParams) -> String {
    let mut s = format!("alpha={:.6}, beta={:.9}, gamma={:.12}", p.alpha, p.beta, p.gamma);
    if p.delta != 0.0 {
        s.push_str(&format!(", delta={:.9}", p.delta));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataPoint;

    #[test]
    fn dataset_table_lists_every_point() {
        let mut ds = DataSet::new("bench");
        ds.append(DataPoint { request_rate: 1.5, avg_ttft: 40.0, avg_itl: 8.0, ..DataPoint::default() });
        ds.append(DataPoint { request_rate: 4.0, avg_ttft: 55.0, avg_itl: 9.0, ..DataPoint::default() });

        let text = format_dataset(&ds);
        assert!(text.contains("data set 'bench'"));
        assert!(text.contains("rate=[1.500, 4.000]"));
        // title, stats, blank, header, rule, two rows
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn empty_dataset_has_no_table() {
        let text = format_dataset(&DataSet::new("empty"));
        assert!(text.contains("n=0"));
        assert!(!text.contains("rps"));
    }

    #[test]
    fn fit_summary_reports_parameters_and_errors() {
        let summary = FitSummary {
            optimized_parms: ModelParams::new(6.037069773706014, 0.012351457184339894, 0.00003754977789772998),
            analysis_results: ErrorReport {
                avg_err_ttft: 3.0,
                avg_err_itl: 1.5,
                avg_err_weighted: 2.0,
            },
            objective: 2.0,
            iterations: 211,
            num_points: 9,
            points: Vec::new(),
        };
        let text = format_fit_summary(&DataSet::new("qm"), &ModelParams::new(1.0, 0.05, 1e-5), &summary);
        assert!(text.contains("qm (9 points)"));
        assert!(text.contains("alpha=6.037070"));
        assert!(text.contains("after 211 iterations"));
        assert!(text.contains("errWeightedAvg: 2.000000"));
        assert!(!text.contains("delta"));
    }

    #[test]
    fn trace_marks_missing_utilization() {
        let p = PointTrace {
            request_rate: 2.0,
            input_tokens: 10.0,
            output_tokens: 5.0,
            ttft_measured: 1.0,
            ttft_predicted: 1.1,
            itl_measured: 0.5,
            itl_predicted: 0.6,
            rho: None,
        };
        let text = format_trace(&[p]);
        let row = text.lines().nth(2).unwrap();
        assert!(row.ends_with('-'));
    }
}
