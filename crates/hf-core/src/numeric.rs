/// Floating point type used throughout system
pub type Real = f64;

/// Small offset used by normalization and as a divide-by-zero guard.
pub const EPS: Real = 1e-6;

/// Default magnitude a normalized state may reach before it counts as diverged.
pub const NORM_LIMIT: Real = 20.0;

pub const PI: Real = std::f64::consts::PI;
pub const TWO_PI: Real = 2.0 * PI;
/// 2/pi, used by the Dryden turbulence gain.
pub const TWO_OVER_PI: Real = 2.0 / PI;

/// Wrap an angle into [-pi, pi).
#[inline]
pub fn wrap_pi(x: Real) -> Real {
    x - ((x + PI) / TWO_PI).floor() * TWO_PI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_pi_range() {
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(PI) + PI).abs() < 1e-12);
        assert!((wrap_pi(0.25) - 0.25).abs() < 1e-15);
    }
}
