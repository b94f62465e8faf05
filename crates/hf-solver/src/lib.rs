//! Equilibrium (trim) solver for dynamic models.
//!
//! The unknowns are a model's stacked state and action vectors. The solver
//! linearizes the model's trim residual by central differences, takes damped
//! Newton steps through a pluggable dense linear solve and backtracks until
//! the squared residual drops.

pub mod error;
pub mod jacobian;
pub mod linear;
pub mod newton;
pub mod problem;

pub use error::{SolverError, SolverResult};
pub use jacobian::{Linearization, linearize};
pub use linear::{LinearSolver, LuSolver};
pub use newton::{TrimConfig, TrimReport, TrimStatus, damped_newton};
pub use problem::{Evaluation, TrimProblem};
