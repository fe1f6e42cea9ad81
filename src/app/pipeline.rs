//! Shared "load -> normalize -> estimate" workflow used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core steps:
//! read inputs -> merge -> unit conversion -> fix -> warm start -> optimize
//!
//! The subcommand handlers in `crate::app` can then focus on presentation.

use log::{info, warn};

use crate::domain::{DataSet, FitConfig, FitSummary, InitMode, InputFormat, ModelParams};
use crate::error::AppError;
use crate::fit::{initial_guess, loss, Analyzer, Evaluation, NelderMead, Optimizer};
use crate::io::{read_bytes, read_dataset};
use crate::models::QueueModel;

/// All computed outputs of a single `latfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub dataset: DataSet,
    /// Where the search actually started.
    pub initial: ModelParams,
    pub summary: FitSummary,
}

/// Read, merge and normalize every input.
///
/// `seconds` converts latencies to milliseconds exactly once, before `fix`.
pub fn load_dataset(inputs: &[String], format: InputFormat, seconds: bool, limit: usize) -> Result<DataSet, AppError> {
    let mut parts = Vec::with_capacity(inputs.len());
    for location in inputs {
        let bytes = read_bytes(location)?;
        let ds = read_dataset(location, &bytes, format, limit)?;
        info!("read {} points from {location}", ds.len());
        parts.push(ds);
    }

    let mut dataset = merge_all(parts);
    if seconds {
        dataset.to_msecs();
    }
    dataset.fix();
    Ok(dataset)
}

/// A single part keeps its name; several are merged under a combined one.
fn merge_all(parts: Vec<DataSet>) -> DataSet {
    if parts.len() == 1 {
        return parts.into_iter().next().unwrap_or_default();
    }
    let mut merged = DataSet::new(format!("merged benchmark data ({} inputs)", parts.len()));
    for part in &parts {
        merged.merge(part);
    }
    merged
}

/// Execute the full fitting pipeline.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let dataset = load_dataset(&config.inputs, config.format, config.seconds, config.limit)?;
    run_fit_on(config, dataset)
}

/// Fit an already loaded, normalized data set.
pub fn run_fit_on(config: &FitConfig, dataset: DataSet) -> Result<RunOutput, AppError> {
    if dataset.is_empty() {
        return Err(AppError::new(2, "No data points to fit."));
    }
    if !config.initial_params.is_valid() {
        return Err(AppError::new(2, "Initial parameters must be non-negative."));
    }

    let initial = choose_initial(config, &dataset);
    let minimizer = NelderMead::with_tolerance(config.tolerance);
    let summary = Optimizer::new(initial)
        .with_max_iterations(config.max_iterations)
        .optimize(&dataset, &QueueModel, &minimizer)?;

    Ok(RunOutput {
        dataset,
        initial,
        summary,
    })
}

/// Halvings of `beta`/`gamma` tried before giving up on a feasible start.
const MAX_SHRINK_STEPS: usize = 64;

/// Starting point per `config.init_mode`.
///
/// The warm start only replaces `alpha` and `beta`; it is used when its loss
/// is finite and no worse than the configured start. If the chosen start is
/// still infeasible, `beta` and `gamma` are shrunk until the queue is stable
/// at every measured rate.
pub fn choose_initial(config: &FitConfig, dataset: &DataSet) -> ModelParams {
    let (xs, ys) = dataset.in_out_vars();
    let score = |p: &ModelParams| loss(p, &xs, &ys, &QueueModel).0;

    let configured = config.initial_params;
    let start = match config.init_mode {
        InitMode::Fixed => configured,
        InitMode::Auto => warm_start_or(configured, dataset, &score),
    };
    if score(&start).is_finite() {
        return start;
    }

    match shrink_to_feasible(start, &score) {
        Some(feasible) => {
            warn!(
                "starting point infeasible, shrunk to beta={}, gamma={}",
                feasible.beta, feasible.gamma
            );
            feasible
        }
        None => {
            warn!("no feasible starting point found by shrinking beta and gamma");
            start
        }
    }
}

fn warm_start_or(configured: ModelParams, dataset: &DataSet, score: impl Fn(&ModelParams) -> f64) -> ModelParams {
    let Some(guess) = initial_guess(dataset) else {
        warn!("warm start unavailable, using configured parameters");
        return configured;
    };
    let candidate = ModelParams {
        alpha: guess.alpha,
        beta: guess.beta,
        ..configured
    };

    let candidate_loss = score(&candidate);
    if candidate_loss.is_finite() && candidate_loss <= score(&configured) {
        info!("warm start: alpha={}, beta={} (loss {candidate_loss:.6})", candidate.alpha, candidate.beta);
        candidate
    } else {
        warn!("warm start infeasible or worse (loss {candidate_loss}), using configured parameters");
        configured
    }
}

/// Halve `beta` and `gamma` together; the load term is linear in both.
fn shrink_to_feasible(start: ModelParams, score: impl Fn(&ModelParams) -> f64) -> Option<ModelParams> {
    let mut params = start;
    for _ in 0..MAX_SHRINK_STEPS {
        params.beta *= 0.5;
        params.gamma *= 0.5;
        if score(&params).is_finite() {
            return Some(params);
        }
    }
    None
}

/// Score fixed parameters against a data set.
pub fn run_analysis(dataset: &DataSet, params: &ModelParams) -> Result<Evaluation, AppError> {
    if !params.is_valid() {
        return Err(AppError::new(2, "Parameters must be non-negative."));
    }
    let eval = Analyzer::new(*params).trace(dataset, &QueueModel);
    if !eval.is_feasible() {
        return Err(AppError::new(
            4,
            "Parameters are infeasible for this data set (queue unstable at some request rate).",
        ));
    }
    Ok(eval)
}
