//! Landing gear ground contact.
//!
//! Each leg is a spring-damper acting along the local terrain normal with
//! Coulomb-like friction along the sliding direction. A leg only loads the
//! airframe while its contact point is below the terrain surface.

use crate::loads::Loads;
use crate::terrain::Terrain;
use hf_core::Real;
use nalgebra::{Matrix3, Vector3};

#[derive(Clone, Debug, PartialEq)]
pub struct GearLeg {
    /// Contact point in body axes relative to the CG [ft]
    pub position: Vector3<Real>,
    /// Damping [lbf s/ft]
    pub damping: Real,
    /// Stiffness [lbf/ft]
    pub stiffness: Real,
    /// Friction coefficient
    pub friction: Real,
}

impl GearLeg {
    /// Earth-axis contact force for the vehicle at `xyz` moving at `ned_vel`.
    pub fn earth_force(
        &self,
        xyz: &Vector3<Real>,
        body_to_earth: &Matrix3<Real>,
        ned_vel: &Vector3<Real>,
        terrain: &Terrain,
    ) -> Vector3<Real> {
        let contact = xyz + body_to_earth * self.position;
        let ground = terrain.sample(contact[0], contact[1]);
        let penetration = contact[2] + ground.height;
        if !(penetration > 0.0) {
            return Vector3::zeros();
        }
        let n = ground.normal;
        let normal_speed = ned_vel.dot(&n);
        let tangent = (ned_vel - normal_speed * n)
            .try_normalize(Real::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        let compression = penetration * n[2];
        let magnitude = -self.damping * normal_speed - self.stiffness * compression;
        magnitude * (n + self.friction * tangent)
    }
}

/// Right main, left main and nose legs.
#[derive(Clone, Debug, PartialEq)]
pub struct LandingGear {
    pub legs: [GearLeg; 3],
}

impl LandingGear {
    /// Total body-axis gear loads. Contact is ignored while `active` is off.
    pub fn loads(
        &self,
        xyz: &Vector3<Real>,
        earth_to_body: &Matrix3<Real>,
        ned_vel: &Vector3<Real>,
        terrain: &Terrain,
        active: bool,
    ) -> Loads {
        if !active {
            return Loads::zero();
        }
        let body_to_earth = earth_to_body.transpose();
        self.legs
            .iter()
            .map(|leg| {
                let earth = leg.earth_force(xyz, &body_to_earth, ned_vel, terrain);
                Loads::at(&leg.position, earth_to_body * earth)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gear() -> LandingGear {
        let leg = |x: Real, y: Real| GearLeg {
            position: Vector3::new(x, y, 5.0),
            damping: 500.0,
            stiffness: 5000.0,
            friction: 0.3,
        };
        LandingGear {
            legs: [leg(-1.0, 4.0), leg(-1.0, -4.0), leg(7.0, 0.0)],
        }
    }

    #[test]
    fn airborne_gear_is_unloaded() {
        let t = Terrain::flat(1000.0, 1000.0, 0.0);
        let l = gear().loads(&Vector3::new(0.0, 0.0, -100.0), &Matrix3::identity(), &Vector3::zeros(), &t, true);
        assert_eq!(l, Loads::zero());
    }

    #[test]
    fn compressed_gear_pushes_up() {
        let t = Terrain::flat(1000.0, 1000.0, 0.0);
        // legs 5 ft below the CG, CG 4.9 ft above ground: 0.1 ft compression
        let l = gear().loads(&Vector3::new(0.0, 0.0, -4.9), &Matrix3::identity(), &Vector3::zeros(), &t, true);
        assert!((l.force[2] + 3.0 * 5000.0 * 0.1).abs() < 1e-6);
        assert!(l.force[0].abs() < 1e-9);
    }

    #[test]
    fn contact_off_while_trimming() {
        let t = Terrain::flat(1000.0, 1000.0, 0.0);
        let l = gear().loads(&Vector3::new(0.0, 0.0, -4.0), &Matrix3::identity(), &Vector3::zeros(), &t, false);
        assert_eq!(l, Loads::zero());
    }

    #[test]
    fn sliding_produces_friction_against_motion() {
        let t = Terrain::flat(1000.0, 1000.0, 0.0);
        let v = Vector3::new(10.0, 0.0, 0.0);
        let l = gear().loads(&Vector3::new(0.0, 0.0, -4.9), &Matrix3::identity(), &v, &t, true);
        assert!(l.force[0] < 0.0);
    }
}
