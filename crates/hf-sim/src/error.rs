//! Error types for simulation operations.

use hf_core::CoreError;
use hf_solver::SolverError;
use thiserror::Error;

/// Errors encountered while building or driving a dynamic system.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Parameter not found: {node}.{field}")]
    NotFound { node: String, field: String },

    #[error("Model error: {what}")]
    Model { what: String },

    #[error("Space error: {0}")]
    Core(#[from] CoreError),

    #[error("Trim error: {0}")]
    Solver(#[from] SolverError),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn not_found(node: &str, field: &str) -> Self {
        SimError::NotFound {
            node: node.to_string(),
            field: field.to_string(),
        }
    }
}
