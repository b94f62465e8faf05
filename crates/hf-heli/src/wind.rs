//! Mean wind and Dryden turbulence.
//!
//! Turbulence follows the MIL-HDBK-1797 Dryden forms. Below 1000 ft the
//! low-altitude scales apply, above 2000 ft the high-altitude scales with
//! intensities read from the exceedance table, and in between the two are
//! blended linearly. White noise enters through `eta`, drawn once per step.
//!
//! Filter states: `u` is first order, `v` and `w` second order with the
//! derivative as the second component.

use hf_core::{CoreResult, EPS, PI, Real, TWO_OVER_PI, Table};
use hf_core::units::{degrees, in_radians};
use nalgebra::{Vector2, Vector3};
use rand::RngCore;
use rand::distributions::{Distribution, Uniform};
use rand_distr::StandardNormal;

/// Altitudes [ft] heading the exceedance table.
const SIGMA_ALTITUDES: [Real; 12] = [
    500.0, 1750.0, 3750.0, 7500.0, 15000.0, 25000.0, 35000.0, 45000.0, 55000.0, 65000.0,
    75000.0, 80000.0,
];

/// Turbulence intensity [ft/s] per level (rows, 1..=7) and altitude (columns).
const SIGMA_BY_LEVEL: [[Real; 12]; 7] = [
    [3.2, 2.2, 1.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [4.2, 3.6, 3.3, 1.6, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [6.6, 6.9, 7.4, 6.7, 4.6, 2.7, 0.4, 0.0, 0.0, 0.0, 0.0, 0.0],
    [8.6, 9.6, 10.6, 10.1, 8.0, 6.6, 5.0, 4.2, 2.7, 0.0, 0.0, 0.0],
    [11.8, 13.0, 16.0, 15.1, 11.6, 9.7, 8.1, 8.2, 7.9, 4.9, 3.2, 2.1],
    [15.6, 17.6, 23.0, 23.6, 22.1, 20.0, 16.0, 15.1, 12.1, 7.9, 6.2, 5.1],
    [18.7, 21.5, 28.4, 30.2, 30.7, 31.0, 25.2, 23.1, 17.5, 10.7, 8.4, 7.2],
];

const LOW_ALTITUDE: Real = 1000.0;
const HIGH_ALTITUDE: Real = 2000.0;

/// Mean wind speed at 20 ft for the strongest turbulence level [ft/s].
const W20_AT_LEVEL_7: Real = 88.61;

/// Exceedance-probability table of turbulence intensity.
pub fn sigma_table() -> CoreResult<Table> {
    let mut table = Table::new(SIGMA_BY_LEVEL.len(), SIGMA_ALTITUDES.len())?;
    for alt in SIGMA_ALTITUDES {
        table.push(alt)?;
    }
    for (level, row) in SIGMA_BY_LEVEL.iter().enumerate() {
        table.push((level + 1) as Real)?;
        for &sigma in row {
            table.push(sigma)?;
        }
    }
    Ok(table)
}

/// Filter states of the three turbulence components.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrydenStates {
    pub u: Real,
    pub v: Vector2<Real>,
    pub w: Vector2<Real>,
}

/// Length scales [ft], intensities [ft/s] and azimuth [rad] at one altitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurbulenceScales {
    pub length: Vector3<Real>,
    pub sigma: Vector3<Real>,
    pub azimuth: Real,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindOutput {
    pub derivatives: DrydenStates,
    /// Turbulence velocity, north-east-down [ft/s]
    pub turbulence: Vector3<Real>,
    /// Total wind acting on the vehicle, north-east-down [ft/s]
    pub wind: Vector3<Real>,
}

#[derive(Clone, Debug)]
pub struct WindModel {
    /// Mean wind speed [ft/s]
    pub speed: Real,
    /// Direction the mean wind blows towards, from north [rad]
    pub direction: Real,
    /// Draw a new direction on every reset
    pub randomize: bool,
    /// Turbulence level, 0 (calm) to 7 (severe)
    pub level: Real,
    sigma_table: Table,
}

impl WindModel {
    pub fn new(speed: Real, direction_deg: Real, randomize: bool, level: Real) -> CoreResult<Self> {
        Ok(Self {
            speed,
            direction: in_radians(degrees(direction_deg)),
            randomize,
            level,
            sigma_table: sigma_table()?,
        })
    }

    /// Mean wind at 20 ft implied by the turbulence level [ft/s].
    pub fn w20(&self) -> Real {
        self.level / 7.0 * W20_AT_LEVEL_7
    }

    pub fn mean_ned(&self) -> Vector3<Real> {
        let (s, c) = self.direction.sin_cos();
        Vector3::new(self.speed * c, self.speed * s, 0.0)
    }

    /// Draw a uniform direction in [-pi, pi) when randomization is on.
    pub fn randomize_direction(&mut self, rng: &mut dyn RngCore) {
        if self.randomize {
            self.direction = Uniform::new(-PI, PI).sample(rng);
        }
    }

    fn table_sigma(&self, altitude: Real) -> Real {
        if self.level <= 0.0 {
            0.0
        } else {
            self.sigma_table.value_2d(self.level, altitude)
        }
    }

    /// Scales at `altitude` above ground for an airspeed vector `v_inf` (NED).
    pub fn scales(&self, altitude: Real, v_inf: &Vector3<Real>) -> TurbulenceScales {
        let w20 = self.w20();
        if altitude <= LOW_ALTITUDE {
            let h = altitude.max(10.0);
            let k = 0.177 + 0.000823 * h;
            let lu = h / k.powf(1.2);
            let sigma_w = 0.1 * w20;
            let sigma_u = sigma_w / k.powf(0.4);
            TurbulenceScales {
                length: Vector3::new(lu, 0.5 * lu, 0.5 * h),
                sigma: Vector3::new(sigma_u, sigma_u, sigma_w),
                azimuth: self.direction,
            }
        } else if altitude >= HIGH_ALTITUDE {
            let lu = 1750.0;
            let sigma = self.table_sigma(altitude);
            TurbulenceScales {
                length: Vector3::new(lu, 0.5 * lu, 0.5 * lu),
                sigma: Vector3::repeat(sigma),
                azimuth: v_inf[1].atan2(v_inf[0]),
            }
        } else {
            let r = (altitude - LOW_ALTITUDE) / (HIGH_ALTITUDE - LOW_ALTITUDE);
            let lu = 1000.0 + r * 750.0;
            let sigma = if self.level <= 0.0 {
                0.0
            } else {
                0.1 * w20 + r * (self.table_sigma(altitude) - 0.1 * w20)
            };
            let mean = self.mean_ned();
            let blend = v_inf * r + mean * (1.0 - r);
            TurbulenceScales {
                length: Vector3::new(lu, 0.5 * lu, lu),
                sigma: Vector3::repeat(sigma),
                azimuth: blend[1].atan2(blend[0]),
            }
        }
    }

    /// Filter derivatives and wind velocity.
    ///
    /// `eta` is unit white noise already scaled by `1 / sqrt(dt)`. With
    /// `include_turbulence` off only the mean wind reaches the vehicle; the
    /// filter still evolves.
    pub fn evaluate(
        &self,
        altitude: Real,
        ned_vel: &Vector3<Real>,
        states: &DrydenStates,
        eta: &Vector3<Real>,
        include_turbulence: bool,
    ) -> WindOutput {
        let mean = self.mean_ned();
        let v_inf = ned_vel + mean;
        let scales = self.scales(altitude, &v_inf);

        let speed = v_inf.norm() + EPS;
        let t = scales.length / speed;
        let gain = Vector3::from_fn(|i, _| scales.sigma[i] * (TWO_OVER_PI * t[i]).sqrt());

        let derivatives = DrydenStates {
            u: (gain[0] * eta[0] - states.u) / t[0],
            v: Vector2::new(
                states.v[1],
                (gain[1] * eta[1] - states.v[0]) / (4.0 * t[1] * t[1]) - states.v[1] / t[1],
            ),
            w: Vector2::new(
                states.w[1],
                (gain[2] * eta[2] - states.w[0]) / (4.0 * t[2] * t[2]) - states.w[1] / t[2],
            ),
        };

        let (s, c) = scales.azimuth.sin_cos();
        let turbulence = Vector3::new(
            c * states.u - s * states.v[0],
            s * states.u + c * states.v[0],
            states.w[0],
        );
        let wind = if include_turbulence {
            mean + turbulence
        } else {
            mean
        };

        WindOutput {
            derivatives,
            turbulence,
            wind,
        }
    }
}

/// Unit white noise for the three filters, scaled for a step of `dt`.
pub fn draw_noise(rng: &mut dyn RngCore, dt: Real) -> Vector3<Real> {
    let scale = 1.0 / dt.sqrt();
    Vector3::from_fn(|_, _| {
        let n: Real = StandardNormal.sample(&mut *rng);
        n * scale
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn calm() -> WindModel {
        WindModel::new(0.0, 0.0, false, 0.0).unwrap()
    }

    #[test]
    fn table_grid_points_are_exact() {
        let t = sigma_table().unwrap();
        assert_eq!(t.value_2d(3.0, 3750.0), 7.4);
        assert_eq!(t.value_2d(7.0, 80000.0), 7.2);
        // clamped beyond the last altitude
        assert_eq!(t.value_2d(7.0, 1e6), 7.2);
    }

    #[test]
    fn mean_wind_points_along_direction() {
        let w = WindModel::new(20.0, 90.0, false, 0.0).unwrap();
        let m = w.mean_ned();
        assert!(m[0].abs() < 1e-12);
        assert!((m[1] - 20.0).abs() < 1e-12);
        assert_eq!(m[2], 0.0);
    }

    #[test]
    fn calm_air_has_no_turbulence_drive() {
        let w = calm();
        let states = DrydenStates::default();
        let out = w.evaluate(300.0, &Vector3::zeros(), &states, &Vector3::new(1.0, -2.0, 3.0), true);
        assert_eq!(out.derivatives, DrydenStates::default());
        assert_eq!(out.wind, Vector3::zeros());
    }

    #[test]
    fn low_altitude_scales_follow_height() {
        let w = WindModel::new(0.0, 30.0, false, 3.0).unwrap();
        let s = w.scales(200.0, &Vector3::new(50.0, 0.0, 0.0));
        let k: Real = 0.177 + 0.000823 * 200.0;
        assert!((s.length[0] - 200.0 / k.powf(1.2)).abs() < 1e-9);
        assert_eq!(s.length[2], 100.0);
        assert!((s.sigma[2] - 0.1 * 3.0 / 7.0 * 88.61).abs() < 1e-12);
        assert_eq!(s.azimuth, w.direction);
    }

    #[test]
    fn medium_band_joins_both_ends() {
        let w = WindModel::new(10.0, 0.0, false, 4.0).unwrap();
        let v = Vector3::new(60.0, 0.0, 0.0);
        let at_low = w.scales(1000.0 + 1e-9, &v);
        assert!((at_low.length[0] - 1000.0).abs() < 1e-6);
        assert!((at_low.sigma[0] - 0.1 * w.w20()).abs() < 1e-6);
        let at_high = w.scales(2000.0 - 1e-9, &v);
        assert!((at_high.length[0] - 1750.0).abs() < 1e-6);
        let high = w.scales(2000.0, &v);
        assert!((at_high.sigma[0] - high.sigma[0]).abs() < 1e-6);
    }

    #[test]
    fn trim_evaluation_sees_only_mean_wind() {
        let w = WindModel::new(15.0, 0.0, false, 5.0).unwrap();
        let states = DrydenStates {
            u: 2.0,
            v: Vector2::new(1.0, 0.0),
            w: Vector2::new(-1.0, 0.0),
        };
        let out = w.evaluate(500.0, &Vector3::zeros(), &states, &Vector3::zeros(), false);
        assert_eq!(out.wind, w.mean_ned());
        assert!(out.turbulence.norm() > 0.0);
        assert!(out.derivatives.u < 0.0);
    }

    #[test]
    fn random_direction_stays_in_range() {
        let mut w = WindModel::new(10.0, 45.0, true, 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            w.randomize_direction(&mut rng);
            assert!(w.direction >= -PI && w.direction < PI);
        }
        let mut fixed = WindModel::new(10.0, 45.0, false, 0.0).unwrap();
        fixed.randomize_direction(&mut rng);
        assert!((fixed.direction - 45.0_f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn noise_is_reproducible_and_scaled() {
        let a = draw_noise(&mut StdRng::seed_from_u64(9), 0.01);
        let b = draw_noise(&mut StdRng::seed_from_u64(9), 0.01);
        assert_eq!(a, b);
        let unscaled = draw_noise(&mut StdRng::seed_from_u64(9), 1.0);
        assert!((a - unscaled * 10.0).norm() < 1e-9);
    }
}
