//! Closed-form queueing approximation of a batching LLM server.
//!
//! Given the request rate `λ` (req/ms), token counts `in`/`out` and the
//! parameters `alpha` (base iteration time), `beta` (decode slope) and `gamma`
//! (prefill slope), the model computes:
//!
//! ```text
//! load          = beta·λ·(in+out) + gamma·λ·(in+out/2)·(out−1)
//! service       = alpha / (1 − load)            (requires load < 1)
//! itl           = beta + service
//! m             = ceil((in+out) / max_num_tokens)
//! ttft          = beta·in + (m+1)·service
//! total_service = ttft + (out−1)·itl
//! rho           = clamp(λ·total_service / max_batch_size, 0, 1)
//! ```
//!
//! It is an M/G/1-type approximation of the batching queue: the server slows
//! down as the token load it carries grows, and diverges as that load reaches 1.

use crate::domain::{InputVars, ModelParams, OutputVars};
use crate::error::EstimationError;

/// Maps experiment inputs and candidate parameters to predicted latencies.
///
/// Implementations must be pure: identical inputs give identical outputs.
pub trait PerformanceModel: Sync {
    fn predict(&self, x: &InputVars, params: &ModelParams) -> Result<OutputVars, EstimationError>;

    /// Server utilization at this operating point, when the model has a notion of it.
    fn utilization(&self, _x: &InputVars, _params: &ModelParams) -> Option<f64> {
        None
    }
}

impl<F> PerformanceModel for F
where
    F: Fn(&InputVars, &ModelParams) -> Result<OutputVars, EstimationError> + Sync,
{
    fn predict(&self, x: &InputVars, params: &ModelParams) -> Result<OutputVars, EstimationError> {
        self(x, params)
    }
}

/// Full set of quantities computed by the queue approximation (ms unless noted).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueMetrics {
    pub avg_ttft: f64,
    pub avg_itl: f64,
    /// Average duration of one batch iteration under load.
    pub avg_service_time: f64,
    /// Average time a request spends in service (prefill plus all decode steps).
    pub avg_total_service_time: f64,
    /// Average number of requests in service.
    pub avg_num_in_service: f64,
    /// Utilization in `[0, 1]`; diagnostic only.
    pub rho: f64,
}

/// The analytic queueing latency model.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueModel;

impl QueueModel {
    /// Evaluate the model, returning every intermediate metric.
    pub fn analyze(&self, x: &InputVars, params: &ModelParams) -> Result<QueueMetrics, EstimationError> {
        if !params.is_valid() {
            return Err(EstimationError::InvalidParameters { params: *params });
        }

        let lambda = x.request_rate / 1000.0;
        let load = lambda * load_per_request(x, params);
        let denom = 1.0 - load;
        if !(denom > 0.0) {
            return Err(EstimationError::QueueUnstable {
                request_rate: x.request_rate,
            });
        }

        let in_tokens = x.input_tokens;
        let out_tokens = x.output_tokens;

        let avg_service_time = params.alpha / denom;
        let avg_itl = params.beta + avg_service_time;
        let m = ((in_tokens + out_tokens) / x.max_num_tokens as f64).ceil();
        let avg_ttft = params.beta * in_tokens + (m + 1.0) * avg_service_time;

        let avg_total_service_time = avg_ttft + (out_tokens - 1.0) * avg_itl;
        let avg_num_in_service = lambda * avg_total_service_time;
        let rho = (avg_num_in_service / x.max_batch_size as f64).clamp(0.0, 1.0);

        Ok(QueueMetrics {
            avg_ttft,
            avg_itl,
            avg_service_time,
            avg_total_service_time,
            avg_num_in_service,
            rho,
        })
    }

    /// Request rate (req/s) at which the load reaches 1.
    ///
    /// `None` when the load does not grow with the rate (e.g. all slopes zero).
    pub fn max_stable_rate(&self, x: &InputVars, params: &ModelParams) -> Option<f64> {
        let per_request = load_per_request(x, params);
        if per_request > 0.0 && per_request.is_finite() {
            Some(1000.0 / per_request)
        } else {
            None
        }
    }
}

impl PerformanceModel for QueueModel {
    fn predict(&self, x: &InputVars, params: &ModelParams) -> Result<OutputVars, EstimationError> {
        let metrics = self.analyze(x, params)?;
        Ok(OutputVars {
            avg_ttft: metrics.avg_ttft,
            avg_itl: metrics.avg_itl,
        })
    }

    fn utilization(&self, x: &InputVars, params: &ModelParams) -> Option<f64> {
        self.analyze(x, params).ok().map(|m| m.rho)
    }
}

/// Load contributed by one request per millisecond of arrival rate.
fn load_per_request(x: &InputVars, params: &ModelParams) -> f64 {
    let tokens = x.input_tokens + x.output_tokens;
    let decode = params.beta * tokens;
    let prefill = params.gamma * (x.input_tokens + x.output_tokens / 2.0) * (x.output_tokens - 1.0);
    decode + prefill
}
