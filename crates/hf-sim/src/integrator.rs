//! Classical RK4 stage arithmetic over named-vector spaces.

use crate::error::SimResult;
use hf_core::{Real, Space};

/// Fraction of the step at which stages 1..3 are evaluated.
pub const STAGE_FRACTIONS: [Real; 3] = [0.5, 0.5, 1.0];

#[derive(Clone, Copy, Debug, Default)]
pub struct Rk4;

impl Rk4 {
    /// `base + slope * h`
    pub fn advance(base: &Space, slope: &Space, h: Real) -> SimResult<Space> {
        Ok(base.try_add(&slope.scaled(h))?)
    }

    /// Weighted slope `(k0 + 2 k1 + 2 k2 + k3) / 6`.
    pub fn slope(k: &[Space; 4]) -> SimResult<Space> {
        let sum = k[0]
            .try_add(&k[1].scaled(2.0))?
            .try_add(&k[2].scaled(2.0))?
            .try_add(&k[3])?;
        Ok(sum.scaled(1.0 / 6.0))
    }

    /// Reported state derivative `(-2 k0 + 2 k1 + 2 k2 + k3) / 3`.
    ///
    /// Uses the first stage, not the combined slope. For stage slopes linear
    /// in time this is the derivative at the end of the step.
    pub fn rate(k: &[Space; 4]) -> SimResult<Space> {
        let sum = k[0]
            .scaled(-2.0)
            .try_add(&k[1].scaled(2.0))?
            .try_add(&k[2].scaled(2.0))?
            .try_add(&k[3])?;
        Ok(sum.scaled(1.0 / 3.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(v: Real) -> Space {
        let mut s = Space::new("S");
        s.register("x", &[v], 1.0).unwrap();
        s
    }

    #[test]
    fn weights() {
        let k = [scalar(1.0), scalar(2.0), scalar(3.0), scalar(4.0)];
        let slope = Rk4::slope(&k).unwrap();
        assert!((slope.values()[0] - 15.0 / 6.0).abs() < 1e-12);
        let rate = Rk4::rate(&k).unwrap();
        assert!((rate.values()[0] - 12.0 / 3.0).abs() < 1e-12);
        let next = Rk4::advance(&scalar(1.0), &scalar(2.0), 0.25).unwrap();
        assert!((next.values()[0] - 1.5).abs() < 1e-15);
    }

    #[test]
    fn rate_extrapolates_to_end_of_step() {
        // k(t) = a + b t over a unit step
        let (a, b) = (3.0, -2.0);
        let k = [scalar(a), scalar(a + 0.5 * b), scalar(a + 0.5 * b), scalar(a + b)];
        let rate = Rk4::rate(&k).unwrap();
        assert!((rate.values()[0] - (a + b)).abs() < 1e-12);
        // the combined slope in place of k0 would give a + 2b/3
        assert!((rate.values()[0] - (a + 2.0 * b / 3.0)).abs() > 0.5);
    }
}
