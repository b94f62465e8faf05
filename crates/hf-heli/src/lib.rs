//! hf-heli: nonlinear single-main-rotor helicopter model.
//!
//! Provides:
//! - Atmosphere, mean wind and Dryden turbulence
//! - Raster terrain with bilinear height and normal sampling
//! - Main and tail rotors with dynamic inflow and tip-path-plane flapping
//! - Fuselage, empennage, wing and landing-gear loads
//! - `Helicopter`, which implements `hf_sim::DynamicModel`
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! let mut sim = hf_heli::simulator(Path::new("vehicle.yaml"), 0.01).unwrap();
//! sim.trim().unwrap();
//! let action = sim.action().values().as_slice().to_vec();
//! for _ in 0..100 {
//!     sim.step(&action).unwrap();
//! }
//! ```

pub mod atmosphere;
pub mod controls;
pub mod error;
pub mod gear;
pub mod loads;
pub mod model;
pub mod params;
pub mod rotor;
pub mod surfaces;
pub mod terrain;
pub mod wind;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{HeliError, HeliResult};
pub use model::{ACTION, HeliState, Helicopter, LoadBreakdown, OBSERVATION_LABELS, Observations};
pub use params::{HeliParams, REQUIRED, engine_config};
pub use terrain::Terrain;

use hf_core::Real;
use hf_sim::DynamicSystem;
use std::path::Path;

/// Wrap a built helicopter in an engine tuned by its `SIM` node.
pub fn build_system(heli: Helicopter, dt: Real) -> HeliResult<DynamicSystem<Helicopter>> {
    let config = engine_config(heli.tree())?;
    Ok(DynamicSystem::with_config(heli, dt, config)?)
}

/// Load a vehicle file with its terrain and build a simulator.
pub fn simulator(config: &Path, dt: Real) -> HeliResult<DynamicSystem<Helicopter>> {
    build_system(Helicopter::from_file(config)?, dt)
}
