//! Parameter estimation driver.
//!
//! Packs `ModelParams` into a vector, hands the loss to a `Minimizer`, then
//! re-evaluates the winning parameters once more with a fresh accumulator to
//! produce the residual report.

use log::info;

use crate::domain::{DataSet, FitSummary, ModelParams, DEFAULT_MAX_ITERATIONS};
use crate::error::EstimationError;
use crate::fit::loss::{loss, loss_with_trace};
use crate::fit::minimizer::Minimizer;
use crate::models::PerformanceModel;

/// Estimates model parameters from a data set.
#[derive(Debug, Clone, Copy)]
pub struct Optimizer {
    /// Starting point of the search.
    pub initial: ModelParams,
    pub max_iterations: u64,
}

impl Optimizer {
    pub fn new(initial: ModelParams) -> Self {
        Self {
            initial,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Fit `model` to `dataset`.
    ///
    /// The data set is only read. A minimizer failure fails the whole call; no
    /// best-effort parameters are returned. An infeasible starting point fails
    /// before the minimizer runs, since no simplex built around it can move.
    pub fn optimize<M, S>(&self, dataset: &DataSet, model: &M, minimizer: &S) -> Result<FitSummary, EstimationError>
    where
        M: PerformanceModel + ?Sized,
        S: Minimizer + ?Sized,
    {
        let (xs, ys) = dataset.in_out_vars();
        let template = self.initial;

        let objective = |v: &[f64]| {
            let params = ModelParams::from_vector(v, &template);
            loss(&params, &xs, &ys, model).0
        };

        info!(
            "fitting '{}' ({} points) from alpha={}, beta={}, gamma={}",
            dataset.name,
            dataset.len(),
            template.alpha,
            template.beta,
            template.gamma
        );
        let v0 = template.to_vector();
        if !objective(&v0).is_finite() {
            return Err(EstimationError::optimizer(format!(
                "initial parameters infeasible: alpha={}, beta={}, gamma={} (queue unstable or invalid at some point)",
                template.alpha, template.beta, template.gamma
            )));
        }
        let minimum = minimizer.minimize(&objective, &v0, self.max_iterations)?;
        let optimized = ModelParams::from_vector(&minimum.x, &template);
        info!(
            "optimization completed after {} iterations, objective={:.6}",
            minimum.iterations, minimum.value
        );

        let eval = loss_with_trace(&optimized, &xs, &ys, model);
        Ok(FitSummary {
            optimized_parms: optimized,
            analysis_results: eval.errors.report(),
            objective: minimum.value,
            iterations: minimum.iterations,
            num_points: xs.len(),
            points: eval.points,
        })
    }
}
