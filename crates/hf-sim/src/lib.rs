//! Fixed-timestep simulation engine for vehicle models.
//!
//! Provides:
//! - `DynamicModel`, the capability trait a vehicle model implements
//! - RK4 stage arithmetic over named-vector spaces
//! - `DynamicSystem`, which owns the spaces, steps, resets and trims a model

pub mod error;
pub mod integrator;
pub mod model;
pub mod system;

pub use error::{SimError, SimResult};
pub use integrator::Rk4;
pub use model::{DynamicModel, EvalMode, Registrar};
pub use system::{DynamicSystem, EngineConfig};
