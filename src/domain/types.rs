//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - read from benchmark exports and training requests
//! - used in-memory during fitting
//! - written back out as JSON/CSV

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::defaults::{DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_NUM_TOKENS, TTFT_TO_ITL_WEIGHT};

/// One benchmark observation.
///
/// Times are in milliseconds once the data set has been normalized. Readers that
/// produce seconds must call `to_msecs` exactly once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPoint {
    /// Request arrival rate (requests/sec).
    #[serde(rename = "requestRate")]
    pub request_rate: f64,
    /// Average input tokens per request.
    #[serde(rename = "inputTokens")]
    pub input_tokens: f64,
    /// Average output tokens per request.
    #[serde(rename = "outputTokens")]
    pub output_tokens: f64,
    /// Average inter-token latency.
    #[serde(rename = "avgITLTime")]
    pub avg_itl: f64,
    /// Average time to first token.
    #[serde(rename = "avgTTFTTime")]
    pub avg_ttft: f64,

    // Used to derive TTFT when it is missing.
    #[serde(rename = "avgWaitTime")]
    pub avg_wait_time: f64,
    #[serde(rename = "avgPrefillTime")]
    pub avg_prefill_time: f64,

    #[serde(rename = "maxBatchSize")]
    pub max_batch_size: i64,
    #[serde(rename = "maxNumTokens")]
    pub max_num_tokens: i64,
}

impl DataPoint {
    /// Fill missing or invalid fields. Idempotent.
    pub fn fix(&mut self) {
        if self.max_batch_size <= 0 {
            self.max_batch_size = DEFAULT_MAX_BATCH_SIZE;
        }
        if self.max_num_tokens <= 0 {
            self.max_num_tokens = DEFAULT_MAX_NUM_TOKENS;
        }
        if self.avg_ttft <= 0.0 {
            self.avg_ttft = self.avg_wait_time + self.avg_prefill_time;
        }
    }

    /// Convert every time field from seconds to milliseconds.
    ///
    /// Not idempotent: a second call scales by another 1000.
    pub fn to_msecs(&mut self) {
        self.avg_ttft *= 1000.0;
        self.avg_itl *= 1000.0;
        self.avg_wait_time *= 1000.0;
        self.avg_prefill_time *= 1000.0;
    }

    /// Project a normalized copy of this point into model inputs and observed outputs.
    pub fn in_out_vars(&self) -> (InputVars, OutputVars) {
        let mut p = self.clone();
        p.fix();
        let x = InputVars {
            request_rate: p.request_rate,
            input_tokens: p.input_tokens,
            output_tokens: p.output_tokens,
            max_batch_size: p.max_batch_size,
            max_num_tokens: p.max_num_tokens,
        };
        let y = OutputVars {
            avg_ttft: p.avg_ttft,
            avg_itl: p.avg_itl,
        };
        (x, y)
    }
}

/// A named, ordered collection of benchmark observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub data: Vec<DataPoint>,
}

impl DataSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
        }
    }

    pub fn append(&mut self, point: DataPoint) {
        self.data.push(point);
    }

    /// Append every point of `other`, preserving both orders.
    pub fn merge(&mut self, other: &DataSet) {
        self.data.extend(other.data.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn fix(&mut self) {
        for p in &mut self.data {
            p.fix();
        }
    }

    pub fn to_msecs(&mut self) {
        for p in &mut self.data {
            p.to_msecs();
        }
    }

    /// Keep at most `limit` points (the first ones).
    pub fn truncate_to(&mut self, limit: usize) {
        self.data.truncate(limit);
    }

    /// Parallel input/output arrays in data-set order. Does not mutate the set.
    pub fn in_out_vars(&self) -> (Vec<InputVars>, Vec<OutputVars>) {
        self.data.iter().map(DataPoint::in_out_vars).unzip()
    }
}

/// Position of each estimated parameter in the packed vector.
///
/// `ModelParams::to_vector` and `ModelParams::from_vector` are the only places
/// that translate between the struct and vector views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamIndex {
    Alpha = 0,
    Beta = 1,
    Gamma = 2,
}

impl ParamIndex {
    pub const ALL: [ParamIndex; 3] = [ParamIndex::Alpha, ParamIndex::Beta, ParamIndex::Gamma];

    pub fn name(self) -> &'static str {
        match self {
            ParamIndex::Alpha => "alpha",
            ParamIndex::Beta => "beta",
            ParamIndex::Gamma => "gamma",
        }
    }
}

/// Model parameters, the unknowns being estimated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Base per-iteration latency (ms).
    pub alpha: f64,
    /// Per-token decode slope (ms/token).
    pub beta: f64,
    /// Prefill slope (ms/token^2).
    pub gamma: f64,
    /// Prefill slope of the split-TTFT variant; not estimated by the queue model.
    #[serde(default)]
    pub delta: f64,
}

impl ModelParams {
    pub fn new(alpha: f64, beta: f64, gamma: f64) -> Self {
        Self {
            alpha,
            beta,
            gamma,
            delta: 0.0,
        }
    }

    pub fn get(&self, index: ParamIndex) -> f64 {
        match index {
            ParamIndex::Alpha => self.alpha,
            ParamIndex::Beta => self.beta,
            ParamIndex::Gamma => self.gamma,
        }
    }

    pub fn set(&mut self, index: ParamIndex, value: f64) {
        match index {
            ParamIndex::Alpha => self.alpha = value,
            ParamIndex::Beta => self.beta = value,
            ParamIndex::Gamma => self.gamma = value,
        }
    }

    /// Pack the estimated parameters in `ParamIndex` order.
    pub fn to_vector(&self) -> Vec<f64> {
        ParamIndex::ALL.iter().map(|&i| self.get(i)).collect()
    }

    /// Unpack a vector produced by `to_vector`; non-estimated fields come from `template`.
    ///
    /// Missing trailing entries keep the template's value.
    pub fn from_vector(values: &[f64], template: &ModelParams) -> ModelParams {
        let mut out = *template;
        for (&index, &value) in ParamIndex::ALL.iter().zip(values) {
            out.set(index, value);
        }
        out
    }

    /// True when every component is non-negative (NaN is rejected too).
    pub fn is_valid(&self) -> bool {
        [self.alpha, self.beta, self.gamma, self.delta]
            .iter()
            .all(|v| *v >= 0.0)
    }
}

/// What the performance model consumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputVars {
    pub request_rate: f64,
    pub input_tokens: f64,
    pub output_tokens: f64,
    pub max_batch_size: i64,
    pub max_num_tokens: i64,
}

/// What the performance model predicts, or what was observed (ms).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputVars {
    pub avg_ttft: f64,
    pub avg_itl: f64,
}

/// Running error totals for one loss evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorAccumulator {
    pub count: usize,
    pub cum_error_ttft: f64,
    pub cum_error_itl: f64,
    pub cum_error_weighted: f64,
}

impl ErrorAccumulator {
    /// Record one prediction against its observation and return the weighted error.
    pub fn record(&mut self, predicted: &OutputVars, observed: &OutputVars) -> f64 {
        let err_ttft = (predicted.avg_ttft - observed.avg_ttft).abs();
        let err_itl = (predicted.avg_itl - observed.avg_itl).abs();
        let err_weighted = (err_ttft * TTFT_TO_ITL_WEIGHT + err_itl) / (TTFT_TO_ITL_WEIGHT + 1.0);

        self.count += 1;
        self.cum_error_ttft += err_ttft;
        self.cum_error_itl += err_itl;
        self.cum_error_weighted += err_weighted;
        err_weighted
    }

    /// Mean errors; all zero when nothing was recorded.
    pub fn report(&self) -> ErrorReport {
        if self.count == 0 {
            return ErrorReport::default();
        }
        let n = self.count as f64;
        ErrorReport {
            avg_err_ttft: self.cum_error_ttft / n,
            avg_err_itl: self.cum_error_itl / n,
            avg_err_weighted: self.cum_error_weighted / n,
        }
    }
}

/// Mean absolute residuals (ms).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    #[serde(rename = "avgErrTTFT")]
    pub avg_err_ttft: f64,
    #[serde(rename = "avgErrITL")]
    pub avg_err_itl: f64,
    #[serde(rename = "avgErrWeighted")]
    pub avg_err_weighted: f64,
}

/// Measured vs predicted values for one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointTrace {
    pub request_rate: f64,
    pub input_tokens: f64,
    pub output_tokens: f64,
    pub ttft_measured: f64,
    pub ttft_predicted: f64,
    pub itl_measured: f64,
    pub itl_predicted: f64,
    /// Server utilization, when the model reports it.
    pub rho: Option<f64>,
}

/// Result of a parameter fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitSummary {
    pub optimized_parms: ModelParams,
    pub analysis_results: ErrorReport,
    /// Objective value reported by the minimizer.
    pub objective: f64,
    pub iterations: u64,
    pub num_points: usize,
    #[serde(default)]
    pub points: Vec<PointTrace>,
}

/// Benchmark file formats understood by the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InputFormat {
    /// Pick by extension, then by content.
    Auto,
    /// Native data set JSON (`{name, data}`).
    Dataset,
    /// GuideLLM sweep JSON.
    GuidellmJson,
    /// GuideLLM CSV export (either header schema).
    GuidellmCsv,
    /// GuideLLM HTML report.
    GuidellmHtml,
}

/// Where the optimizer starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InitMode {
    /// Use the parameters given on the command line.
    Fixed,
    /// Least-squares warm start, falling back to the given parameters.
    Auto,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub inputs: Vec<String>,
    pub format: InputFormat,
    /// Input times are in seconds and must be converted once.
    pub seconds: bool,
    pub limit: usize,

    pub initial_params: ModelParams,
    pub init_mode: InitMode,
    pub max_iterations: u64,
    pub tolerance: f64,

    /// Print the per-point measured/predicted table.
    pub trace: bool,
    /// Number of worst-explained points to list.
    pub top_n: usize,
    pub export_summary: Option<PathBuf>,
    pub export_points: Option<PathBuf>,
}

/// Settings for synthetic benchmark generation (`latfit simulate`).
#[derive(Debug, Clone)]
pub struct SampleConfig {
    /// Parameters the synthetic server follows.
    pub params: ModelParams,
    pub count: usize,
    pub seed: u64,
    /// Mean input tokens per request.
    pub input_tokens: f64,
    /// Mean output tokens per request.
    pub output_tokens: f64,
    /// Relative spread of token counts around their means, in `[0, 1)`.
    pub token_jitter: f64,
    /// Highest rate as a fraction of the saturation rate, in `(0, 1)`.
    pub max_load: f64,
    /// Relative (log-normal) noise on measured latencies.
    pub noise: f64,
    pub max_batch_size: i64,
    pub max_num_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::defaults::*;

    fn point(ttft: f64, wait: f64, prefill: f64, batch: i64, tokens: i64) -> DataPoint {
        DataPoint {
            request_rate: 10.0,
            avg_ttft: ttft,
            avg_wait_time: wait,
            avg_prefill_time: prefill,
            max_batch_size: batch,
            max_num_tokens: tokens,
            ..DataPoint::default()
        }
    }

    #[test]
    fn fix_fills_missing_limits() {
        let mut p = point(10.0, 0.0, 0.0, 0, -100);
        p.fix();
        assert_eq!(p.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
        assert_eq!(p.max_num_tokens, DEFAULT_MAX_NUM_TOKENS);
        assert_eq!(p.avg_ttft, 10.0);
    }

    #[test]
    fn fix_derives_ttft_from_wait_and_prefill() {
        let mut p = point(-1.0, 3.0, 4.0, 32, 2048);
        p.fix();
        assert_eq!(p.avg_ttft, 7.0);
        assert_eq!(p.max_batch_size, 32);
        assert_eq!(p.max_num_tokens, 2048);
    }

    #[test]
    fn fix_is_idempotent() {
        let mut once = point(0.0, 2.5, 3.5, 0, 0);
        once.fix();
        let mut twice = once.clone();
        twice.fix();
        assert_eq!(once, twice);
    }

    #[test]
    fn to_msecs_twice_scales_by_a_million() {
        let original = DataPoint {
            avg_ttft: 1.5,
            avg_itl: 0.5,
            avg_wait_time: 0.75,
            avg_prefill_time: 0.25,
            ..DataPoint::default()
        };
        let mut p = original.clone();
        p.to_msecs();
        assert_eq!(p.avg_ttft, 1500.0);
        p.to_msecs();
        assert_eq!(p.avg_ttft, original.avg_ttft * 1e6);
        assert_eq!(p.avg_itl, original.avg_itl * 1e6);
        assert_eq!(p.avg_wait_time, original.avg_wait_time * 1e6);
        assert_eq!(p.avg_prefill_time, original.avg_prefill_time * 1e6);
    }

    #[test]
    fn in_out_vars_does_not_mutate_the_set() {
        let mut ds = DataSet::new("raw");
        ds.append(point(0.0, 1.0, 2.0, 0, 0));
        let before = ds.clone();

        let (xs, ys) = ds.in_out_vars();
        assert_eq!(ds, before);
        assert_eq!(xs[0].max_batch_size, DEFAULT_MAX_BATCH_SIZE);
        assert_eq!(ys[0].avg_ttft, 3.0);
    }

    #[test]
    fn merge_concatenates_in_order() {
        let mut a = DataSet::new("a");
        a.append(DataPoint { request_rate: 1.0, ..DataPoint::default() });
        let mut b = DataSet::new("b");
        b.append(DataPoint { request_rate: 2.0, ..DataPoint::default() });
        b.append(DataPoint { request_rate: 3.0, ..DataPoint::default() });

        a.merge(&b);
        let rates: Vec<f64> = a.data.iter().map(|p| p.request_rate).collect();
        assert_eq!(rates, vec![1.0, 2.0, 3.0]);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn pack_and_unpack_follow_param_index() {
        let params = ModelParams { alpha: 1.0, beta: 2.0, gamma: 3.0, delta: 4.0 };
        let v = params.to_vector();
        assert_eq!(v[ParamIndex::Alpha as usize], 1.0);
        assert_eq!(v[ParamIndex::Beta as usize], 2.0);
        assert_eq!(v[ParamIndex::Gamma as usize], 3.0);

        let back = ModelParams::from_vector(&[5.0, 6.0, 7.0], &params);
        assert_eq!(back, ModelParams { alpha: 5.0, beta: 6.0, gamma: 7.0, delta: 4.0 });
    }

    #[test]
    fn negative_or_nan_components_are_invalid() {
        assert!(ModelParams::new(0.0, 0.0, 0.0).is_valid());
        assert!(!ModelParams::new(1.0, -0.1, 0.0).is_valid());
        assert!(!ModelParams { delta: -1.0, ..ModelParams::new(1.0, 1.0, 1.0) }.is_valid());
        assert!(!ModelParams::new(f64::NAN, 1.0, 1.0).is_valid());
    }

    #[test]
    fn accumulator_weights_ttft_half_as_much_as_itl() {
        let mut acc = ErrorAccumulator::default();
        let predicted = OutputVars { avg_ttft: 15.0, avg_itl: 10.0 };
        let observed = OutputVars { avg_ttft: 10.0, avg_itl: 5.0 };
        let w = acc.record(&predicted, &observed);
        assert_eq!(w, 5.0);

        let w2 = acc.record(&OutputVars { avg_ttft: 13.0, avg_itl: 5.0 }, &observed);
        assert_eq!(w2, 1.0);
        let r = acc.report();
        assert_eq!(acc.count, 2);
        assert_eq!(r.avg_err_ttft, 4.0);
        assert_eq!(r.avg_err_itl, 2.5);
        assert_eq!(r.avg_err_weighted, 3.0);
    }

    #[test]
    fn empty_accumulator_reports_zeros() {
        assert_eq!(ErrorAccumulator::default().report(), ErrorReport::default());
    }

    #[test]
    fn data_set_json_uses_wire_names() {
        let json = r#"{"name":"qm","data":[{"requestRate":2.0,"inputTokens":100,"outputTokens":50,
            "avgITLTime":5.0,"avgWaitTime":1.0,"avgPrefillTime":2.0,"maxBatchSize":16}]}"#;
        let ds: DataSet = serde_json::from_str(json).unwrap();
        assert_eq!(ds.name, "qm");
        assert_eq!(ds.data[0].request_rate, 2.0);
        assert_eq!(ds.data[0].max_num_tokens, 0);

        let (_, ys) = ds.in_out_vars();
        assert_eq!(ys[0].avg_ttft, 3.0);
    }

    #[test]
    fn fit_summary_serializes_response_keys() {
        let summary = FitSummary {
            optimized_parms: ModelParams::new(1.0, 2.0, 3.0),
            analysis_results: ErrorReport::default(),
            objective: 0.0,
            iterations: 3,
            num_points: 0,
            points: Vec::new(),
        };
        let v = serde_json::to_value(&summary).unwrap();
        assert!(v.get("optimizedParms").is_some());
        assert!(v["analysisResults"].get("avgErrTTFT").is_some());
    }
}
