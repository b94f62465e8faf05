//! Trim problem abstraction.

use crate::error::SolverResult;
use nalgebra::DVector;

/// Outputs of one model evaluation at a stacked `[state; action]` point.
#[derive(Clone, Debug)]
pub struct Evaluation {
    pub residual: DVector<f64>,
    pub state_dot: DVector<f64>,
    pub observation: DVector<f64>,
}

impl Evaluation {
    pub fn cost(&self) -> f64 {
        self.residual.norm_squared()
    }
}

/// A model whose equilibrium is sought.
///
/// The residual length must equal `state_len() + action_len()` so the
/// Jacobian is square.
pub trait TrimProblem {
    fn state_len(&self) -> usize;

    fn action_len(&self) -> usize;

    /// Raw size of a unit step along each unknown (the normalizer).
    fn scales(&self) -> DVector<f64>;

    /// Evaluate residual, state derivative and observation at `x`.
    fn evaluate(&mut self, x: &DVector<f64>) -> SolverResult<Evaluation>;

    /// Whether the state part of `x` has left the valid region.
    fn is_diverged(&self, x: &DVector<f64>) -> bool;
}
