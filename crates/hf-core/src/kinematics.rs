//! Attitude kinematics.
//!
//! Euler angles are `[phi, theta, psi]` (roll, pitch, yaw). Quaternions are
//! stored `[x, y, z, w]`. Direction-cosine matrices rotate the reference frame
//! from earth to body axes (they are the transpose of the point rotation).

use crate::Real;
use nalgebra::{Matrix3, Vector3, Vector4};

/// Guard added to cos(theta) in the Euler-rate matrix.
const COS_THETA_GUARD: Real = 1e-7;

/// Earth-to-body DCM for a yaw-pitch-roll sequence.
pub fn euler_to_dcm(euler: &Vector3<Real>) -> Matrix3<Real> {
    let (sphi, cphi) = euler[0].sin_cos();
    let (stht, ctht) = euler[1].sin_cos();
    let (spsi, cpsi) = euler[2].sin_cos();

    let psi = Matrix3::new(cpsi, spsi, 0.0, -spsi, cpsi, 0.0, 0.0, 0.0, 1.0);
    let tht = Matrix3::new(ctht, 0.0, -stht, 0.0, 1.0, 0.0, stht, 0.0, ctht);
    let phi = Matrix3::new(1.0, 0.0, 0.0, 0.0, cphi, sphi, 0.0, -sphi, cphi);

    phi * tht * psi
}

/// Euler angles from an earth-to-body DCM. Gimbal lock is not handled.
pub fn dcm_to_euler(dcm: &Matrix3<Real>) -> Vector3<Real> {
    Vector3::new(
        dcm[(1, 2)].atan2(dcm[(2, 2)]),
        (-dcm[(0, 2)]).clamp(-1.0, 1.0).asin(),
        dcm[(0, 1)].atan2(dcm[(0, 0)]),
    )
}

/// Matrix mapping body rates `[p, q, r]` to Euler-angle rates.
pub fn euler_rate_matrix(euler: &Vector3<Real>) -> Matrix3<Real> {
    let (sphi, cphi) = euler[0].sin_cos();
    let (stht, ctht) = euler[1].sin_cos();
    let c = ctht + COS_THETA_GUARD;

    Matrix3::new(
        1.0,
        sphi * stht / c,
        cphi * stht / c,
        0.0,
        cphi,
        -sphi,
        0.0,
        sphi / c,
        cphi / c,
    )
}

/// Quaternion for a yaw-pitch-roll sequence.
pub fn euler_to_quaternion(euler: &Vector3<Real>) -> Vector4<Real> {
    let (sr, cr) = (0.5 * euler[0]).sin_cos();
    let (sp, cp) = (0.5 * euler[1]).sin_cos();
    let (sy, cy) = (0.5 * euler[2]).sin_cos();

    Vector4::new(
        sr * cp * cy - cr * sp * sy,
        cr * sp * cy + sr * cp * sy,
        cr * cp * sy - sr * sp * cy,
        cr * cp * cy + sr * sp * sy,
    )
}

/// Quaternion derivative `0.5 * q (x) [omega, 0]`.
pub fn quaternion_dot(quat: &Vector4<Real>, pqr: &Vector3<Real>) -> Vector4<Real> {
    let v = Vector3::new(quat[0], quat[1], quat[2]);
    let w = quat[3];
    let vec = w * pqr + v.cross(pqr);
    0.5 * Vector4::new(vec[0], vec[1], vec[2], -v.dot(pqr))
}

fn normalized(quat: &Vector4<Real>) -> Vector4<Real> {
    let n = quat.norm();
    if n > 0.0 {
        quat / n
    } else {
        Vector4::new(0.0, 0.0, 0.0, 1.0)
    }
}

/// Earth-to-body DCM from a (not necessarily unit) quaternion.
pub fn quaternion_to_dcm(quat: &Vector4<Real>) -> Matrix3<Real> {
    let q = normalized(quat);
    let (x, y, z, w) = (q[0], q[1], q[2], q[3]);

    Matrix3::new(
        w * w + x * x - y * y - z * z,
        2.0 * (x * y + w * z),
        2.0 * (x * z - w * y),
        2.0 * (x * y - w * z),
        w * w - x * x + y * y - z * z,
        2.0 * (y * z + w * x),
        2.0 * (x * z + w * y),
        2.0 * (y * z - w * x),
        w * w - x * x - y * y + z * z,
    )
}

/// Quaternion (scalar part non-negative) from an earth-to-body DCM.
pub fn dcm_to_quaternion(dcm: &Matrix3<Real>) -> Vector4<Real> {
    let c = |i: usize, j: usize| dcm[(i, j)];
    let trace = c(0, 0) + c(1, 1) + c(2, 2);

    let q = if trace >= c(0, 0) && trace >= c(1, 1) && trace >= c(2, 2) {
        let w = 0.5 * (1.0 + trace).max(0.0).sqrt();
        let k = 0.25 / w;
        Vector4::new(
            (c(1, 2) - c(2, 1)) * k,
            (c(2, 0) - c(0, 2)) * k,
            (c(0, 1) - c(1, 0)) * k,
            w,
        )
    } else if c(0, 0) >= c(1, 1) && c(0, 0) >= c(2, 2) {
        let x = 0.5 * (1.0 + c(0, 0) - c(1, 1) - c(2, 2)).max(0.0).sqrt();
        let k = 0.25 / x;
        Vector4::new(
            x,
            (c(0, 1) + c(1, 0)) * k,
            (c(0, 2) + c(2, 0)) * k,
            (c(1, 2) - c(2, 1)) * k,
        )
    } else if c(1, 1) >= c(2, 2) {
        let y = 0.5 * (1.0 - c(0, 0) + c(1, 1) - c(2, 2)).max(0.0).sqrt();
        let k = 0.25 / y;
        Vector4::new(
            (c(0, 1) + c(1, 0)) * k,
            y,
            (c(1, 2) + c(2, 1)) * k,
            (c(2, 0) - c(0, 2)) * k,
        )
    } else {
        let z = 0.5 * (1.0 - c(0, 0) - c(1, 1) + c(2, 2)).max(0.0).sqrt();
        let k = 0.25 / z;
        Vector4::new(
            (c(0, 2) + c(2, 0)) * k,
            (c(1, 2) + c(2, 1)) * k,
            z,
            (c(0, 1) - c(1, 0)) * k,
        )
    };

    if q[3] < 0.0 { -q } else { q }
}

pub fn quaternion_to_euler(quat: &Vector4<Real>) -> Vector3<Real> {
    dcm_to_euler(&quaternion_to_dcm(quat))
}

/// Closed-form Euler angles from a quaternion, normalizing it first.
pub fn unit_quaternion_to_euler(quat: &Vector4<Real>) -> Vector3<Real> {
    let q = normalized(quat);
    let (x, y, z, w) = (q[0], q[1], q[2], q[3]);
    let (sqx, sqy, sqz, sqw) = (x * x, y * y, z * z, w * w);

    Vector3::new(
        (2.0 * (y * z + w * x)).atan2(sqw + sqz - sqx - sqy),
        -(2.0 * (x * z - w * y)).clamp(-1.0, 1.0).asin(),
        (2.0 * (x * y + w * z)).atan2(sqw + sqx - sqy - sqz),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn identity_attitude() {
        let e = Vector3::zeros();
        assert!((euler_to_dcm(&e) - Matrix3::identity()).norm() < 1e-15);
        let q = euler_to_quaternion(&e);
        assert_eq!(q, Vector4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn pure_yaw_rotates_frame() {
        let dcm = euler_to_dcm(&Vector3::new(0.0, 0.0, FRAC_PI_2));
        // North in earth axes lies along -y in body axes after a 90 deg right turn.
        let north_body = dcm * Vector3::new(1.0, 0.0, 0.0);
        assert!((north_body - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn euler_rates_level_flight() {
        let m = euler_rate_matrix(&Vector3::zeros());
        let rates = m * Vector3::new(0.1, 0.2, 0.3);
        assert!((rates - Vector3::new(0.1, 0.2, 0.3)).norm() < 1e-6);
    }

    #[test]
    fn quaternion_dot_pure_yaw_rate() {
        let q = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let qd = quaternion_dot(&q, &Vector3::new(0.0, 0.0, 2.0));
        assert!((qd - Vector4::new(0.0, 0.0, 1.0, 0.0)).norm() < 1e-15);
    }

    #[test]
    fn quaternion_to_dcm_normalizes() {
        let e = Vector3::new(0.1, -0.2, 0.3);
        let q = euler_to_quaternion(&e) * 3.0;
        assert!((quaternion_to_dcm(&q) - euler_to_dcm(&e)).norm() < 1e-12);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn angles() -> impl Strategy<Value = Vector3<Real>> {
        (-3.1_f64..3.1, -1.5_f64..1.5, -3.1_f64..3.1).prop_map(|(a, b, c)| Vector3::new(a, b, c))
    }

    proptest! {
        #[test]
        fn dcm_round_trip(e in angles()) {
            let back = dcm_to_euler(&euler_to_dcm(&e));
            prop_assert!((back - e).norm() < 1e-9);
        }

        #[test]
        fn dcm_is_orthonormal(e in angles()) {
            let dcm = euler_to_dcm(&e);
            prop_assert!((dcm * dcm.transpose() - Matrix3::identity()).norm() < 1e-12);
        }

        #[test]
        fn quaternion_paths_agree(e in angles()) {
            let q = euler_to_quaternion(&e);
            let via_dcm = quaternion_to_euler(&q);
            let direct = unit_quaternion_to_euler(&q);
            prop_assert!((via_dcm - direct).norm() < 1e-9);
            prop_assert!((direct - e).norm() < 1e-9);
        }

        #[test]
        fn quaternion_matches_dcm(e in angles()) {
            let q = euler_to_quaternion(&e);
            prop_assert!((quaternion_to_dcm(&q) - euler_to_dcm(&e)).norm() < 1e-12);
        }

        #[test]
        fn dcm_to_quaternion_inverts(e in angles()) {
            let dcm = euler_to_dcm(&e);
            let q = dcm_to_quaternion(&dcm);
            prop_assert!((q.norm() - 1.0).abs() < 1e-12);
            prop_assert!((quaternion_to_dcm(&q) - dcm).norm() < 1e-12);
        }
    }
}
