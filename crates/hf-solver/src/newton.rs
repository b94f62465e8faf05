//! Damped Newton iteration with backtracking.

use crate::error::SolverResult;
use crate::jacobian::{Linearization, linearize};
use crate::linear::LinearSolver;
use crate::problem::TrimProblem;
use nalgebra::DVector;
use tracing::{debug, warn};

/// Trim solver configuration.
#[derive(Clone, Debug)]
pub struct TrimConfig {
    /// Maximum Newton iterations
    pub max_iterations: usize,
    /// Converged once the squared residual drops below this
    pub tolerance: f64,
    /// Maximum step halvings per iteration
    pub max_backtracks: usize,
    /// Step scale factor applied per backtrack
    pub backtrack_factor: f64,
    /// Finite-difference step in normalized units
    pub perturbation: f64,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-12,
            max_backtracks: 10,
            backtrack_factor: 0.5,
            perturbation: 1e-6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrimStatus {
    Converged,
    /// The state left the valid region.
    Diverged,
    /// The linear solve failed.
    SingularJacobian,
    /// The Newton step contained NaN or infinity.
    NonFiniteStep,
    MaxIterations,
}

/// Outcome of a trim solve.
#[derive(Clone, Debug)]
pub struct TrimReport {
    pub status: TrimStatus,
    pub iterations: usize,
    /// Final squared residual norm
    pub cost: f64,
    /// Accepted `[state; action]` point
    pub x: DVector<f64>,
    /// Linearization from the last completed iteration
    pub linearization: Option<Linearization>,
}

impl TrimReport {
    pub fn converged(&self) -> bool {
        self.status == TrimStatus::Converged
    }
}

/// Drive `problem` toward a zero residual starting at `x0`.
///
/// Each iteration solves `J * step = r` and tries `x - alpha * step` with
/// `alpha` shrinking by `backtrack_factor` until the cost falls. The best
/// finite trial is accepted even when none improves on the current point.
pub fn damped_newton<P, S>(
    problem: &mut P,
    x0: DVector<f64>,
    solver: &S,
    config: &TrimConfig,
) -> SolverResult<TrimReport>
where
    P: TrimProblem + ?Sized,
    S: LinearSolver + ?Sized,
{
    let mut x = x0;
    let mut residual = problem.evaluate(&x)?.residual;
    let mut cost = residual.norm_squared();
    let mut linearization = None;
    let mut status = TrimStatus::MaxIterations;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        if cost < config.tolerance {
            status = TrimStatus::Converged;
            break;
        }
        if problem.is_diverged(&x) || !cost.is_finite() {
            status = TrimStatus::Diverged;
            break;
        }

        let lin = linearize(problem, &x, config.perturbation)?;
        let step = match solver.solve(&lin.jacobian, &residual) {
            Ok(step) => step,
            Err(e) => {
                debug!(iteration = iterations, error = %e, "linear solve failed");
                linearization = Some(lin);
                status = TrimStatus::SingularJacobian;
                break;
            }
        };
        linearization = Some(lin);
        if !step.iter().all(|v| v.is_finite()) {
            status = TrimStatus::NonFiniteStep;
            break;
        }

        let mut alpha = 1.0;
        let mut best: Option<(f64, DVector<f64>, DVector<f64>)> = None;
        for _ in 0..config.max_backtracks.max(1) {
            let trial = &x - alpha * &step;
            let r = problem.evaluate(&trial)?.residual;
            let c = r.norm_squared();
            if c.is_finite() && best.as_ref().is_none_or(|(bc, _, _)| c < *bc) {
                best = Some((c, trial, r));
            }
            if c < cost {
                break;
            }
            alpha *= config.backtrack_factor;
        }

        iterations += 1;
        match best {
            Some((c, trial, r)) => {
                debug!(iteration = iterations, cost = c, alpha, "trim step");
                x = trial;
                residual = r;
                cost = c;
            }
            None => {
                status = TrimStatus::NonFiniteStep;
                break;
            }
        }
    }

    if status == TrimStatus::MaxIterations && cost < config.tolerance {
        status = TrimStatus::Converged;
    }
    if status != TrimStatus::Converged {
        warn!(?status, iterations, cost, "trim did not converge");
    }

    Ok(TrimReport {
        status,
        iterations,
        cost,
        x,
        linearization,
    })
}
