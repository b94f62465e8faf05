//! Error types for solver operations.

use hf_core::CoreError;
use thiserror::Error;

/// Errors that can occur while setting up or driving a trim solve.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Model error: {what}")]
    Model { what: String },

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

pub type SolverResult<T> = Result<T, SolverError>;
