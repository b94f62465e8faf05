//! Pilot inputs to swashplate deflections.
//!
//! Each normalized input in [-1, 1] maps linearly onto a deflection range
//! given in degrees. The deflection state lags the commanded angle with a
//! first-order time constant `1 / cof`.

use hf_core::Real;
use hf_core::units::{degrees, in_radians};
use nalgebra::Vector4;

#[derive(Clone, Debug, PartialEq)]
pub struct ControlChannel {
    /// Offset added to the mapped angle [deg]
    pub offset: Real,
    /// Angle at input -1 before the offset [deg]
    pub low: Real,
    /// Angle at input +1 before the offset [deg]
    pub high: Real,
    /// Inverse lag time constant [1/s]
    pub cof: Real,
}

impl ControlChannel {
    /// Commanded deflection [rad] for a normalized input.
    pub fn target(&self, input: Real) -> Real {
        let deg = self.offset + 0.5 * input * (self.high - self.low) + 0.5 * (self.high + self.low);
        in_radians(degrees(deg))
    }
}

/// Collective, longitudinal cyclic, lateral cyclic and pedal channels.
#[derive(Clone, Debug, PartialEq)]
pub struct Swashplate {
    pub channels: [ControlChannel; 4],
}

impl Swashplate {
    pub fn targets(&self, inputs: &Vector4<Real>) -> Vector4<Real> {
        Vector4::from_fn(|i, _| self.channels[i].target(inputs[i]))
    }

    /// Deflection rates lagging each channel toward its commanded angle.
    pub fn rates(&self, inputs: &Vector4<Real>, deflection: &Vector4<Real>) -> Vector4<Real> {
        let targets = self.targets(inputs);
        Vector4::from_fn(|i, _| (targets[i] - deflection[i]) * self.channels[i].cof)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collective() -> ControlChannel {
        ControlChannel {
            offset: 1.0,
            low: 2.0,
            high: 22.0,
            cof: 20.0,
        }
    }

    #[test]
    fn input_range_maps_to_angle_range() {
        let c = collective();
        assert!((c.target(-1.0) - 3.0_f64.to_radians()).abs() < 1e-12);
        assert!((c.target(1.0) - 23.0_f64.to_radians()).abs() < 1e-12);
        assert!((c.target(0.0) - 13.0_f64.to_radians()).abs() < 1e-12);
    }

    fn swashplate() -> Swashplate {
        let cyclic = ControlChannel {
            offset: 0.0,
            low: -10.0,
            high: 10.0,
            cof: 20.0,
        };
        let pedal = ControlChannel {
            offset: 0.0,
            low: -9.0,
            high: 25.0,
            cof: 20.0,
        };
        Swashplate {
            channels: [collective(), cyclic.clone(), cyclic, pedal],
        }
    }

    #[test]
    fn centred_inputs_target_channel_midpoints() {
        let targets = swashplate().targets(&Vector4::zeros());
        let mids = [13.0_f64, 0.0, 0.0, 8.0];
        for (t, deg) in targets.iter().zip(mids) {
            assert!((t - deg.to_radians()).abs() < 1e-12);
        }
    }

    #[test]
    fn rates_vanish_at_commanded_angles() {
        let swash = swashplate();
        let u = Vector4::new(0.3, -0.5, 0.1, 1.0);
        let targets = swash.targets(&u);
        assert!(swash.rates(&u, &targets).norm() < 1e-12);
        let rates = swash.rates(&u, &Vector4::zeros());
        assert!(rates[0] > 0.0);
        assert!((rates[0] - 20.0 * targets[0]).abs() < 1e-12);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn target_is_linear_in_input(
            offset in -5.0_f64..5.0,
            low in -20.0_f64..0.0,
            span in 1.0_f64..40.0,
            input in -1.0_f64..1.0,
        ) {
            let c = ControlChannel { offset, low, high: low + span, cof: 10.0 };
            let lerp = c.target(-1.0) + 0.5 * (input + 1.0) * (c.target(1.0) - c.target(-1.0));
            prop_assert!((c.target(input) - lerp).abs() < 1e-9);
            prop_assert!(c.target(input) <= c.target(1.0) + 1e-12);
        }
    }
}
