//! Error types for the helicopter model.

use hf_core::CoreError;
use hf_project::ProjectError;
use hf_sim::SimError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HeliError {
    #[error("Configuration error: {0}")]
    Project(#[from] ProjectError),

    #[error("Terrain raster {path}: {what}")]
    Terrain { path: PathBuf, what: String },

    #[error("Invalid parameter {node}.{field}: {reason}")]
    InvalidParam {
        node: &'static str,
        field: &'static str,
        reason: &'static str,
    },

    #[error("Space error: {0}")]
    Core(#[from] CoreError),

    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),
}

pub type HeliResult<T> = Result<T, HeliError>;

impl HeliError {
    pub(crate) fn terrain(path: impl Into<PathBuf>, what: impl ToString) -> Self {
        HeliError::Terrain {
            path: path.into(),
            what: what.to_string(),
        }
    }
}

impl From<HeliError> for SimError {
    fn from(e: HeliError) -> Self {
        match e {
            HeliError::Sim(inner) => inner,
            HeliError::Core(inner) => SimError::Core(inner),
            HeliError::Project(ProjectError::NotFound { node, field }) => {
                SimError::NotFound { node, field }
            }
            other => SimError::Model {
                what: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_keeps_its_address() {
        let err = HeliError::Project(ProjectError::NotFound {
            node: "MR".into(),
            field: "RPM".into(),
        });
        let sim: SimError = err.into();
        assert!(matches!(sim, SimError::NotFound { ref node, ref field } if node == "MR" && field == "RPM"));
    }

    #[test]
    fn other_errors_become_model_errors() {
        let err = HeliError::InvalidParam {
            node: "HELI",
            field: "WT",
            reason: "must be positive",
        };
        let sim: SimError = err.into();
        match sim {
            SimError::Model { what } => assert!(what.contains("HELI.WT")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
