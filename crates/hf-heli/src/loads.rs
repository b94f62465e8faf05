//! Body-axis force and moment contributions.

use hf_core::Real;
use hf_core::units::station_ft;
use nalgebra::Vector3;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Force [lbf] and moment [ft lbf] about the CG, in body axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Loads {
    pub force: Vector3<Real>,
    pub moment: Vector3<Real>,
}

impl Loads {
    pub fn new(force: Vector3<Real>, moment: Vector3<Real>) -> Self {
        Self { force, moment }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Loads of a force applied at `position` (body axes, relative to the CG).
    pub fn at(position: &Vector3<Real>, force: Vector3<Real>) -> Self {
        Self {
            force,
            moment: position.cross(&force),
        }
    }
}

impl Add for Loads {
    type Output = Loads;

    fn add(self, rhs: Loads) -> Loads {
        Loads {
            force: self.force + rhs.force,
            moment: self.moment + rhs.moment,
        }
    }
}

impl AddAssign for Loads {
    fn add_assign(&mut self, rhs: Loads) {
        self.force += rhs.force;
        self.moment += rhs.moment;
    }
}

impl Sum for Loads {
    fn sum<I: Iterator<Item = Loads>>(iter: I) -> Loads {
        iter.fold(Loads::zero(), |acc, l| acc + l)
    }
}

/// Component location relative to the CG [ft]: `h` above, `d` aft.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Station {
    pub h: Real,
    pub d: Real,
}

impl Station {
    /// From fuselage station and waterline in inches.
    pub fn from_inches(fs: Real, wl: Real, fs_cg: Real, wl_cg: Real) -> Self {
        Self {
            h: station_ft(wl, wl_cg),
            d: station_ft(fs, fs_cg),
        }
    }

    /// Body-axis position with the given lateral offset [ft].
    pub fn body(&self, lateral: Real) -> Vector3<Real> {
        Vector3::new(-self.d, lateral, -self.h)
    }
}
