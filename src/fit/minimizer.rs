//! Minimizer capability.
//!
//! The optimizer only needs "minimize this scalar function of a vector within an
//! iteration budget". `Minimizer` is that seam; `NelderMead` binds argmin's
//! derivative-free simplex solver to it.
//!
//! Nelder-Mead copes with the `+∞` penalty the loss returns for infeasible
//! candidates: such vertices simply rank last and get replaced.

use argmin::core::{CostFunction, Error as ArgminError, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead as ArgminNelderMead;
use log::debug;

use crate::domain::DEFAULT_TOLERANCE;
use crate::error::EstimationError;

/// Result of a successful minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: u64,
}

/// Minimizes an objective starting from `initial`.
///
/// Implementations must return `OptimizerFailure` when they terminate
/// abnormally or exhaust `max_iterations` without converging.
pub trait Minimizer {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        initial: &[f64],
        max_iterations: u64,
    ) -> Result<Minimum, EstimationError>;
}

/// Nelder-Mead simplex search (argmin).
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    /// Converged once the standard deviation of the simplex costs drops below this.
    pub tolerance: f64,
    /// Relative size of the initial simplex around the starting point.
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            initial_step: 0.05,
        }
    }
}

/// Offset used for zero components when building the initial simplex.
const ZERO_COMPONENT_STEP: f64 = 0.00025;

impl NelderMead {
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            tolerance,
            ..Self::default()
        }
    }

    /// `x0` plus one vertex per dimension with that component perturbed.
    fn initial_simplex(&self, x0: &[f64]) -> Vec<Vec<f64>> {
        let mut vertices = Vec::with_capacity(x0.len() + 1);
        vertices.push(x0.to_vec());
        for i in 0..x0.len() {
            let mut v = x0.to_vec();
            v[i] = if v[i] != 0.0 {
                v[i] * (1.0 + self.initial_step)
            } else {
                ZERO_COMPONENT_STEP
            };
            vertices.push(v);
        }
        vertices
    }
}

/// Adapts a borrowed objective closure to argmin's problem interface.
struct Objective<'a> {
    f: &'a dyn Fn(&[f64]) -> f64,
}

impl CostFunction for Objective<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, ArgminError> {
        Ok((self.f)(param))
    }
}

impl Minimizer for NelderMead {
    fn minimize(
        &self,
        objective: &dyn Fn(&[f64]) -> f64,
        initial: &[f64],
        max_iterations: u64,
    ) -> Result<Minimum, EstimationError> {
        if initial.is_empty() {
            return Err(EstimationError::optimizer("empty initial vector"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(EstimationError::optimizer(format!(
                "invalid tolerance {}",
                self.tolerance
            )));
        }

        let solver = ArgminNelderMead::new(self.initial_simplex(initial))
            .with_sd_tolerance(self.tolerance)
            .map_err(|e| EstimationError::optimizer(e.to_string()))?;

        let result = Executor::new(Objective { f: objective }, solver)
            .configure(|state| state.max_iters(max_iterations))
            .run()
            .map_err(|e| EstimationError::optimizer(e.to_string()))?;

        let state = result.state();
        let iterations = state.get_iter();
        match state.get_termination_status() {
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
            | TerminationStatus::Terminated(TerminationReason::TargetCostReached) => {}
            TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
                return Err(EstimationError::optimizer(format!(
                    "no convergence within {max_iterations} iterations"
                )));
            }
            other => {
                return Err(EstimationError::optimizer(format!("terminated: {other:?}")));
            }
        }

        let x = state
            .get_best_param()
            .cloned()
            .ok_or_else(|| EstimationError::optimizer("solver returned no parameters"))?;
        let value = state.get_best_cost();
        if !value.is_finite() {
            return Err(EstimationError::optimizer(format!(
                "no feasible point found (objective={value})"
            )));
        }

        debug!("nelder-mead converged after {iterations} iterations, objective={value}");
        Ok(Minimum { x, value, iterations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bowl(v: &[f64]) -> f64 {
        (v[0] - 3.0).powi(2) + 2.0 * (v[1] + 1.0).powi(2) + 1.0
    }

    #[test]
    fn finds_the_minimum_of_a_quadratic() {
        let nm = NelderMead::with_tolerance(1e-12);
        let min = nm.minimize(&bowl, &[0.5, 0.5], 1000).unwrap();
        assert!((min.x[0] - 3.0).abs() < 1e-3, "{:?}", min.x);
        assert!((min.x[1] + 1.0).abs() < 1e-3, "{:?}", min.x);
        assert!((min.value - 1.0).abs() < 1e-6);
        assert!(min.iterations > 0 && min.iterations <= 1000);
    }

    #[test]
    fn infinite_regions_are_avoided() {
        // Feasible only for x >= 0; the optimum sits on the boundary side.
        let walled = |v: &[f64]| {
            if v[0] < 0.0 {
                f64::INFINITY
            } else {
                (v[0] - 1.0).powi(2)
            }
        };
        let min = NelderMead::with_tolerance(1e-12).minimize(&walled, &[4.0], 1000).unwrap();
        assert!((min.x[0] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn exhausting_the_budget_is_a_failure() {
        let err = NelderMead::with_tolerance(1e-15)
            .minimize(&bowl, &[100.0, -50.0], 2)
            .unwrap_err();
        assert!(matches!(err, EstimationError::OptimizerFailure { .. }));
    }

    #[test]
    fn initial_simplex_perturbs_each_component() {
        let nm = NelderMead::default();
        let simplex = nm.initial_simplex(&[2.0, 0.0]);
        assert_eq!(simplex.len(), 3);
        assert_eq!(simplex[0], vec![2.0, 0.0]);
        assert_eq!(simplex[1], vec![2.1, 0.0]);
        assert_eq!(simplex[2], vec![2.0, ZERO_COMPONENT_STEP]);
    }

    #[test]
    fn empty_start_is_rejected() {
        assert!(NelderMead::default().minimize(&bowl, &[], 10).is_err());
    }
}
