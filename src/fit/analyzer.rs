//! Residual analysis with fixed parameters.

use log::warn;

use crate::domain::{DataSet, ErrorReport, ModelParams};
use crate::fit::loss::{loss_with_trace, Evaluation};
use crate::models::PerformanceModel;

/// Scores known parameters against a data set without searching.
#[derive(Debug, Clone, Copy)]
pub struct Analyzer {
    pub params: ModelParams,
}

impl Analyzer {
    pub fn new(params: ModelParams) -> Self {
        Self { params }
    }

    /// Mean residuals of `model` over `dataset`.
    ///
    /// Infeasible parameters give an all-zero report and a warning; use
    /// `trace` to tell that apart from a perfect fit.
    pub fn analyze<M>(&self, dataset: &DataSet, model: &M) -> ErrorReport
    where
        M: PerformanceModel + ?Sized,
    {
        let eval = self.trace(dataset, model);
        if !eval.is_feasible() {
            warn!(
                "parameters alpha={}, beta={}, gamma={} are infeasible for '{}'; the report is empty",
                self.params.alpha, self.params.beta, self.params.gamma, dataset.name
            );
        }
        eval.errors.report()
    }

    /// Full evaluation including the per-point rows.
    pub fn trace<M>(&self, dataset: &DataSet, model: &M) -> Evaluation
    where
        M: PerformanceModel + ?Sized,
    {
        let (xs, ys) = dataset.in_out_vars();
        loss_with_trace(&self.params, &xs, &ys, model)
    }
}
