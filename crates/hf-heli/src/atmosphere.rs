//! Standard-atmosphere troposphere: linear temperature lapse, polytropic density.

use hf_core::Real;

#[derive(Clone, Debug, PartialEq)]
pub struct Atmosphere {
    /// Gas constant of air [ft lbf / (slug R)]
    pub gas_constant: Real,
    /// Sea-level temperature [R]
    pub t0: Real,
    /// Temperature lapse rate [R/ft]
    pub lapse: Real,
    /// Sea-level density [slug/ft^3]
    pub rho_sea: Real,
    /// Gravitational acceleration [ft/s^2]
    pub gravity: Real,
}

/// Air properties at one altitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AirState {
    pub temperature: Real,
    pub density: Real,
}

impl Atmosphere {
    pub fn at(&self, altitude: Real) -> AirState {
        let temperature = self.t0 - self.lapse * altitude;
        let exponent = self.gravity / (self.lapse * self.gas_constant) - 1.0;
        AirState {
            temperature,
            density: self.rho_sea * (temperature / self.t0).powf(exponent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> Atmosphere {
        Atmosphere {
            gas_constant: 1716.0,
            t0: 518.7,
            lapse: 0.00357,
            rho_sea: 0.002378,
            gravity: 32.174,
        }
    }

    #[test]
    fn sea_level_matches_reference() {
        let air = standard().at(0.0);
        assert_eq!(air.temperature, 518.7);
        assert_eq!(air.density, 0.002378);
    }

    #[test]
    fn density_at_ten_thousand_feet() {
        // ISA table: about 0.001756 slug/ft^3 at 10 000 ft
        let air = standard().at(10_000.0);
        assert!((air.density - 0.001756).abs() < 2e-5, "{}", air.density);
        assert!(air.temperature < 518.7);
    }
}
