//! Named defaults shared by normalization, loss weighting and the optimizer.

use crate::domain::ModelParams;

/// Maximum batch size assumed when a benchmark does not report one.
pub const DEFAULT_MAX_BATCH_SIZE: i64 = 256;

/// Maximum tokens (input + output) per iteration assumed when not reported.
pub const DEFAULT_MAX_NUM_TOKENS: i64 = 8192;

/// Relative weight of TTFT error against ITL error:
///
/// `err_weighted = (err_ttft * W + err_itl) / (W + 1)`
pub const TTFT_TO_ITL_WEIGHT: f64 = 0.5;

/// Iteration budget handed to the minimizer.
pub const DEFAULT_MAX_ITERATIONS: u64 = 1000;

/// Cap on the number of points a benchmark reader contributes.
pub const DEFAULT_LIMIT_NUM_DATA_POINTS: usize = 100;

/// Stopping tolerance on the spread of simplex costs.
pub const DEFAULT_TOLERANCE: f64 = 1e-8;

/// Starting point used when no better guess is available.
pub const DEFAULT_INITIAL_PARAMS: ModelParams = ModelParams {
    alpha: 1.0,
    beta: 0.05,
    gamma: 1e-5,
    delta: 0.0,
};
