// hf-core/src/units.rs
//
// The flight model works in slugs, feet, seconds and radians. Configuration
// files carry stations in inches, angles in degrees and rotor speed in RPM;
// these helpers convert at that boundary.

use uom::si::f64::{Angle as UomAngle, AngularVelocity as UomAngularVelocity, Length as UomLength};

pub type Angle = UomAngle;
pub type AngularVelocity = UomAngularVelocity;
pub type Length = UomLength;

#[inline]
pub fn inches(v: f64) -> Length {
    use uom::si::length::inch;
    Length::new::<inch>(v)
}

#[inline]
pub fn degrees(v: f64) -> Angle {
    use uom::si::angle::degree;
    Angle::new::<degree>(v)
}

#[inline]
pub fn rpm(v: f64) -> AngularVelocity {
    use uom::si::angular_velocity::revolution_per_minute;
    AngularVelocity::new::<revolution_per_minute>(v)
}

#[inline]
pub fn in_feet(l: Length) -> f64 {
    use uom::si::length::foot;
    l.get::<foot>()
}

#[inline]
pub fn in_radians(a: Angle) -> f64 {
    use uom::si::angle::radian;
    a.get::<radian>()
}

#[inline]
pub fn in_rad_per_s(w: AngularVelocity) -> f64 {
    use uom::si::angular_velocity::radian_per_second;
    w.get::<radian_per_second>()
}

/// Station (inches) relative to the CG station, in feet.
#[inline]
pub fn station_ft(station_in: f64, cg_in: f64) -> f64 {
    in_feet(inches(station_in - cg_in))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_smoke() {
        assert!((in_feet(inches(12.0)) - 1.0).abs() < 1e-12);
        assert!((in_radians(degrees(180.0)) - std::f64::consts::PI).abs() < 1e-12);
        assert!((in_rad_per_s(rpm(60.0)) - 2.0 * std::f64::consts::PI).abs() < 1e-12);
        assert!((station_ft(150.0, 126.0) - 2.0).abs() < 1e-12);
    }
}
