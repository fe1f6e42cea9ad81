//! Loss aggregation: score a parameter vector against observed data.
//!
//! The loss is the mean weighted absolute deviation between predicted and
//! observed latencies (see `ErrorAccumulator::record` for the weighting).
//!
//! Infeasible candidates (negative parameters, saturated queue, non-finite
//! predictions) are not errors here: the whole evaluation scores `+∞`, which a
//! derivative-free search treats as "worse than anything feasible".

use log::{debug, trace};
use rayon::prelude::*;

use crate::domain::{ErrorAccumulator, InputVars, ModelParams, OutputVars, PointTrace};
use crate::models::PerformanceModel;

/// Data sets at least this large predict their points in parallel.
const PARALLEL_MIN_POINTS: usize = 64;

/// Outcome of one loss evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub loss: f64,
    pub errors: ErrorAccumulator,
    /// Per-point rows; only filled by `loss_with_trace`.
    pub points: Vec<PointTrace>,
}

impl Evaluation {
    fn vacuous() -> Self {
        Self {
            loss: 0.0,
            errors: ErrorAccumulator::default(),
            points: Vec::new(),
        }
    }

    fn infeasible() -> Self {
        Self {
            loss: f64::INFINITY,
            errors: ErrorAccumulator::default(),
            points: Vec::new(),
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.loss.is_finite()
    }
}

/// Mean weighted error of `model` with `params` over the paired observations.
///
/// Mismatched lengths and empty inputs score `0.0` (nothing to fit).
pub fn loss<M>(params: &ModelParams, xs: &[InputVars], ys: &[OutputVars], model: &M) -> (f64, ErrorAccumulator)
where
    M: PerformanceModel + ?Sized,
{
    let eval = evaluate(params, xs, ys, model, false);
    (eval.loss, eval.errors)
}

/// Same as `loss`, also recording measured vs predicted values per point.
///
/// Rows are logged at `debug` level as they are produced.
pub fn loss_with_trace<M>(params: &ModelParams, xs: &[InputVars], ys: &[OutputVars], model: &M) -> Evaluation
where
    M: PerformanceModel + ?Sized,
{
    evaluate(params, xs, ys, model, true)
}

fn evaluate<M>(params: &ModelParams, xs: &[InputVars], ys: &[OutputVars], model: &M, with_trace: bool) -> Evaluation
where
    M: PerformanceModel + ?Sized,
{
    if xs.len() != ys.len() || xs.is_empty() {
        return Evaluation::vacuous();
    }

    let parallel = xs.len() >= PARALLEL_MIN_POINTS;
    let Some(predictions) = predict_all(params, xs, model, parallel) else {
        return Evaluation::infeasible();
    };

    // Reduction runs in input order so the result does not depend on scheduling.
    let mut errors = ErrorAccumulator::default();
    let mut points = Vec::new();
    if with_trace {
        debug!("     rps    inToken   outToken   TTFTMeas   TTFTPred    ITLMeas    ITLPred");
    }
    for ((x, observed), predicted) in xs.iter().zip(ys).zip(&predictions) {
        errors.record(predicted, observed);

        if with_trace {
            debug!(
                "{:>8.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                x.request_rate,
                x.input_tokens,
                x.output_tokens,
                observed.avg_ttft,
                predicted.avg_ttft,
                observed.avg_itl,
                predicted.avg_itl
            );
            points.push(PointTrace {
                request_rate: x.request_rate,
                input_tokens: x.input_tokens,
                output_tokens: x.output_tokens,
                ttft_measured: observed.avg_ttft,
                ttft_predicted: predicted.avg_ttft,
                itl_measured: observed.avg_itl,
                itl_predicted: predicted.avg_itl,
                rho: model.utilization(x, params),
            });
        }
    }

    let loss = errors.cum_error_weighted / errors.count as f64;
    if loss.is_nan() {
        return Evaluation::infeasible();
    }
    Evaluation { loss, errors, points }
}

/// Predict every point in input order; `None` if any point is infeasible.
fn predict_all<M>(params: &ModelParams, xs: &[InputVars], model: &M, parallel: bool) -> Option<Vec<OutputVars>>
where
    M: PerformanceModel + ?Sized,
{
    let predict_one = |x: &InputVars| -> Option<OutputVars> {
        match model.predict(x, params) {
            Ok(y) if y.avg_ttft.is_finite() && y.avg_itl.is_finite() => Some(y),
            Ok(_) => {
                trace!("non-finite prediction at rate={}", x.request_rate);
                None
            }
            Err(e) => {
                trace!("{e}");
                None
            }
        }
    };

    if parallel {
        xs.par_iter().map(predict_one).collect()
    } else {
        xs.iter().map(predict_one).collect()
    }
}
