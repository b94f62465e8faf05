//! hf-core: stable foundation for heliflow.
//!
//! Contains:
//! - units (uom conversions at the configuration boundary)
//! - numeric (Real + angle wrapping + engine constants)
//! - kinematics (Euler/DCM/quaternion conversions)
//! - lookup (cached 1D/2D interpolation table)
//! - space (named-vector spaces)
//! - error (shared error types)

pub mod error;
pub mod kinematics;
pub mod lookup;
pub mod numeric;
pub mod space;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use lookup::Table;
pub use numeric::*;
pub use space::{Slot, Space};
