//! Reporting utilities: residual rankings and formatted terminal output.

use crate::domain::{ErrorAccumulator, OutputVars, PointTrace};

pub mod format;

pub use format::*;

/// Weighted residual of one traced point (same weighting as the loss).
pub fn weighted_residual(p: &PointTrace) -> f64 {
    let predicted = OutputVars {
        avg_ttft: p.ttft_predicted,
        avg_itl: p.itl_predicted,
    };
    let observed = OutputVars {
        avg_ttft: p.ttft_measured,
        avg_itl: p.itl_measured,
    };
    ErrorAccumulator::default().record(&predicted, &observed)
}

/// The `top_n` points the model explains worst, largest weighted residual first.
pub fn rank_worst_points(points: &[PointTrace], top_n: usize) -> Vec<PointTrace> {
    let mut sorted: Vec<(f64, PointTrace)> = points.iter().map(|p| (weighted_residual(p), *p)).collect();
    sorted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    sorted.into_iter().take(top_n).map(|(_, p)| p).collect()
}
