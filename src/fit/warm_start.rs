//! Least-squares starting point for the optimizer.
//!
//! At low load the queue model is linear in `(alpha, beta)`:
//!
//! ```text
//! itl  ≈ alpha + beta
//! ttft ≈ (m + 1)·alpha + in·beta
//! ```
//!
//! Each point contributes both rows. `gamma` only matters under load and
//! starts at zero.

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::domain::{DataSet, ModelParams};
use crate::math::solve_least_squares;

/// Estimate `(alpha, beta)` from the unloaded linearization.
///
/// Returns `None` for an empty data set or an unsolvable system. Negative
/// estimates are clamped to zero.
pub fn initial_guess(dataset: &DataSet) -> Option<ModelParams> {
    let (xs, ys) = dataset.in_out_vars();
    if xs.is_empty() {
        return None;
    }

    let n = xs.len() * 2;
    let mut design = DMatrix::<f64>::zeros(n, 2);
    let mut target = DVector::<f64>::zeros(n);
    for (i, (x, y)) in xs.iter().zip(&ys).enumerate() {
        let m = ((x.input_tokens + x.output_tokens) / x.max_num_tokens as f64).ceil();

        let r = 2 * i;
        design[(r, 0)] = 1.0;
        design[(r, 1)] = 1.0;
        target[r] = y.avg_itl;

        design[(r + 1, 0)] = m + 1.0;
        design[(r + 1, 1)] = x.input_tokens;
        target[r + 1] = y.avg_ttft;
    }

    let solution = solve_least_squares(&design, &target)?;
    let guess = ModelParams::new(solution[0].max(0.0), solution[1].max(0.0), 0.0);
    debug!("warm start: alpha={}, beta={}", guess.alpha, guess.beta);
    Some(guess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DataPoint;
    use crate::models::{PerformanceModel, QueueModel};

    fn unloaded(truth: &ModelParams) -> DataSet {
        let mut ds = DataSet::new("unloaded");
        for &tokens in &[128.0, 256.0, 512.0, 1024.0] {
            let mut p = DataPoint {
                request_rate: 0.0,
                input_tokens: tokens,
                output_tokens: 64.0,
                max_batch_size: 64,
                max_num_tokens: 2048,
                ..DataPoint::default()
            };
            let (x, _) = p.in_out_vars();
            let y = QueueModel.predict(&x, truth).unwrap();
            p.avg_ttft = y.avg_ttft;
            p.avg_itl = y.avg_itl;
            ds.append(p);
        }
        ds
    }

    #[test]
    fn recovers_alpha_and_beta_without_load() {
        let truth = ModelParams::new(6.0, 0.012, 0.0);
        let guess = initial_guess(&unloaded(&truth)).unwrap();
        assert!((guess.alpha - 6.0).abs() < 1e-6, "{guess:?}");
        assert!((guess.beta - 0.012).abs() < 1e-6, "{guess:?}");
        assert_eq!(guess.gamma, 0.0);
    }

    #[test]
    fn empty_data_has_no_guess() {
        assert_eq!(initial_guess(&DataSet::new("empty")), None);
    }

    #[test]
    fn negative_estimates_are_clamped() {
        // ITL below TTFT/in slope pushes beta negative.
        let mut ds = DataSet::new("odd");
        for &tokens in &[100.0, 1000.0] {
            ds.append(DataPoint {
                input_tokens: tokens,
                output_tokens: 10.0,
                avg_ttft: 2000.0 - tokens,
                avg_itl: 1.0,
                ..DataPoint::default()
            });
        }
        let guess = initial_guess(&ds).unwrap();
        assert!(guess.is_valid());
    }
}
