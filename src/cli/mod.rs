//! Command-line parsing for the latency model fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! estimation code. Flags are resolved into domain configs in `crate::app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    InitMode, InputFormat, ModelParams, DEFAULT_INITIAL_PARAMS, DEFAULT_LIMIT_NUM_DATA_POINTS, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_NUM_TOKENS, DEFAULT_TOLERANCE,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "latfit", version, about = "Queueing latency model parameter estimation for LLM inference servers")]
pub struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Estimate alpha/beta/gamma from benchmark data and report residuals.
    Fit(FitArgs),
    /// Score fixed parameters against benchmark data.
    Analyze(AnalyzeArgs),
    /// Generate a synthetic benchmark data set from known parameters.
    Simulate(SimulateArgs),
    /// Print the normalized data set.
    Show(InputArgs),
}

/// Where the benchmark data comes from and how to read it.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Benchmark files or http(s) URLs; several inputs are merged in order.
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<String>,

    /// Input format.
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    pub format: InputFormat,

    /// Latencies in the input are in seconds (converted to ms once).
    #[arg(long)]
    pub seconds: bool,

    /// Maximum number of points taken from each GuideLLM input.
    #[arg(long, env = "LATFIT_LIMIT", default_value_t = DEFAULT_LIMIT_NUM_DATA_POINTS)]
    pub limit: usize,
}

/// Model parameters given on the command line.
#[derive(Debug, Args, Clone)]
pub struct ParamArgs {
    /// Base iteration time (ms).
    #[arg(long, default_value_t = DEFAULT_INITIAL_PARAMS.alpha, allow_negative_numbers = true)]
    pub alpha: f64,

    /// Per-token decode slope (ms/token).
    #[arg(long, default_value_t = DEFAULT_INITIAL_PARAMS.beta, allow_negative_numbers = true)]
    pub beta: f64,

    /// Prefill slope (ms/token^2).
    #[arg(long, default_value_t = DEFAULT_INITIAL_PARAMS.gamma, allow_negative_numbers = true)]
    pub gamma: f64,

    /// Split-TTFT prefill slope; carried through, not estimated.
    #[arg(long, default_value_t = DEFAULT_INITIAL_PARAMS.delta, allow_negative_numbers = true)]
    pub delta: f64,
}

impl ParamArgs {
    pub fn to_params(&self) -> ModelParams {
        ModelParams {
            alpha: self.alpha,
            beta: self.beta,
            gamma: self.gamma,
            delta: self.delta,
        }
    }
}

/// Options for fitting.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Starting point of the search.
    #[command(flatten)]
    pub params: ParamArgs,

    /// `auto` starts from a least-squares guess when it is feasible.
    #[arg(long, value_enum, default_value_t = InitMode::Fixed)]
    pub init: InitMode,

    /// Iteration budget for the minimizer.
    #[arg(long, env = "LATFIT_MAX_ITERATIONS", default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: u64,

    /// Convergence tolerance on the spread of simplex costs.
    #[arg(long, env = "LATFIT_TOLERANCE", default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Print the measured vs predicted table.
    #[arg(long)]
    pub trace: bool,

    /// Show the N worst-explained points.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Write the fit summary (training response document) to JSON.
    #[arg(long)]
    pub export_summary: Option<PathBuf>,

    /// Write per-point measured vs predicted values to CSV.
    #[arg(long)]
    pub export_points: Option<PathBuf>,
}

/// Options for scoring fixed parameters.
#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub params: ParamArgs,

    /// Print the measured vs predicted table.
    #[arg(long)]
    pub trace: bool,
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Parameters the synthetic server follows.
    #[command(flatten)]
    pub params: ParamArgs,

    /// Number of points.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub count: usize,

    /// Random seed.
    ///
    /// The same seed and settings give the same data with a given build of
    /// latfit. Seeds are mixed through std's `DefaultHasher`, whose output may
    /// change between Rust releases, so data is not guaranteed identical
    /// across toolchains.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Mean input tokens per request.
    #[arg(long, default_value_t = 512.0)]
    pub input_tokens: f64,

    /// Mean output tokens per request.
    #[arg(long, default_value_t = 128.0)]
    pub output_tokens: f64,

    /// Relative spread of token counts around their means.
    #[arg(long, default_value_t = 0.25)]
    pub token_jitter: f64,

    /// Heaviest rate as a fraction of the saturation rate.
    #[arg(long, default_value_t = 0.9)]
    pub max_load: f64,

    /// Relative log-normal noise on latencies.
    #[arg(long, default_value_t = 0.02)]
    pub noise: f64,

    #[arg(long, default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: i64,

    #[arg(long, default_value_t = DEFAULT_MAX_NUM_TOKENS)]
    pub max_num_tokens: i64,

    /// Write the data set here instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
