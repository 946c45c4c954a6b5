// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Lie algebra/group functions for 3D rigid body motion.
//!
//! Motions are manipulated as a `(rotation matrix, translation vector)` pair
//! since the warp needs both parts separately anyway.
//!
//! Interesting reads:
//! - Sophus c++ library: <https://github.com/strasdat/Sophus>
//! - Ethan Eade course on Lie Groups for 2D and 3D transformations:
//!     - details: <http://ethaneade.com/lie.pdf>
//!     - summary: <http://ethaneade.com/lie_groups.pdf>

use nalgebra::{Rotation3, Translation3, UnitQuaternion};

use crate::math::so3;
use crate::misc::type_aliases::{Float, Iso3, Mat3, Mat4, Vec3, Vec6};

const EPSILON_TAYLOR_SERIES: Float = 1e-2;
const EPSILON_TAYLOR_SERIES_2: Float = EPSILON_TAYLOR_SERIES * EPSILON_TAYLOR_SERIES;
const _1_6: Float = 1.0 / 6.0;
const _1_12: Float = 1.0 / 12.0;
const _1_24: Float = 1.0 / 24.0;
const _1_120: Float = 1.0 / 120.0;
const _1_720: Float = 1.0 / 720.0;

/// Parameterization of a twist (element of se3).
pub type Twist = Vec6;

/// Rigid body motion (element of SE3) as a rotation matrix and a translation.
pub type RigidMotion = (Mat3, Vec3);

/// Retrieve the linear velocity part of the twist parameterization.
pub fn linear_velocity(xi: Twist) -> Vec3 {
    Vec3::new(xi[0], xi[1], xi[2])
}

/// Retrieve the angular velocity part of the twist parameterization.
pub fn angular_velocity(xi: Twist) -> Vec3 {
    Vec3::new(xi[3], xi[4], xi[5])
}

/// Hat operator.
/// Goes from se3 parameters to se3 element (4x4 matrix).
#[rustfmt::skip]
pub fn hat(xi: Twist) -> Mat4 {
    let w1 = xi[3];
    let w2 = xi[4];
    let w3 = xi[5];
    Mat4::new(
         0.0,  -w3,    w2,   xi[0],
         w3,    0.0,  -w1,   xi[1],
        -w2,    w1,    0.0,  xi[2],
         0.0,   0.0,   0.0,  0.0,
    )
}

/// Vee operator. Inverse of the hat operator.
/// Warning! does not check that the given top left 3x3 sub-matrix is skew-symmetric.
pub fn vee(mat: Mat4) -> Twist {
    Vec6::new(mat.m14, mat.m24, mat.m34, mat.m32, mat.m13, mat.m21)
}

/// Compute the exponential map from Lie algebra se3 to Lie group SE3.
/// Goes from se3 parameterization to SE3 element (rigid body motion).
pub fn exp(xi: Twist) -> RigidMotion {
    let xi_v = linear_velocity(xi);
    let xi_w = angular_velocity(xi);
    let theta_2 = xi_w.norm_squared();
    let (omega, omega_2) = (so3::hat(xi_w), so3::hat_2(xi_w));
    let (coef_omega, coef_omega_2) = if theta_2 < EPSILON_TAYLOR_SERIES_2 {
        // (1-cos(t))/t^2 and (t-sin(t))/t^3
        (0.5 - _1_24 * theta_2, _1_6 - _1_120 * theta_2) // TAYLOR
    } else {
        let theta = theta_2.sqrt();
        (
            (1.0 - theta.cos()) / theta_2,
            (theta - theta.sin()) / (theta * theta_2),
        )
    };
    let v = Mat3::identity() + coef_omega * omega + coef_omega_2 * omega_2;
    (so3::exp(xi_w), v * xi_v)
}

/// Compute the logarithm map from the Lie group SE3 to the Lie algebra se3.
/// Inverse of the exponential map.
pub fn log(motion: &RigidMotion) -> Twist {
    let (rotation, translation) = motion;
    let w = so3::log(rotation);
    let theta_2 = w.norm_squared();
    let (omega, omega_2) = (so3::hat(w), so3::hat_2(w));
    let coef_omega_2 = if theta_2 < EPSILON_TAYLOR_SERIES_2 {
        _1_12 + _1_720 * theta_2 // TAYLOR
    } else {
        let theta = theta_2.sqrt();
        (1.0 - 0.5 * theta * theta.sin() / (1.0 - theta.cos())) / theta_2
    };
    let v_inv = Mat3::identity() - 0.5 * omega + coef_omega_2 * omega_2;
    let xi_v = v_inv * translation;
    Vec6::new(xi_v[0], xi_v[1], xi_v[2], w[0], w[1], w[2])
}

/// Compose two rigid body motions, `a` applied after `b`.
pub fn compose(a: &RigidMotion, b: &RigidMotion) -> RigidMotion {
    (a.0 * b.0, a.0 * b.1 + a.1)
}

/// Inverse of a rigid body motion.
pub fn inverse(motion: &RigidMotion) -> RigidMotion {
    let rotation_inv = motion.0.transpose();
    (rotation_inv, -(rotation_inv * motion.1))
}

/// Convert a twist into an isometry, e.g. for trajectory output.
pub fn isometry(xi: Twist) -> Iso3 {
    let (rotation, translation) = exp(xi);
    Iso3::from_parts(
        Translation3::from(translation),
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation)),
    )
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;
    use quickcheck::TestResult;
    use quickcheck_macros;

    // The best precision I get for round trips
    // with exact trigonometric computations ("else" branches) is around 1e-4.
    const EPSILON_ROUNDTRIP_APPROX: Float = 1e-4;

    #[test]
    fn exp_log_round_trip() {
        let xi = Vec6::zeros();
        assert_eq!(xi, log(&exp(xi)));
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn hat_vee_roundtrip(v1: Float, v2: Float, v3: Float, w1: Float, w2: Float, w3: Float) -> TestResult {
        if ![v1, v2, v3, w1, w2, w3].iter().all(|v| v.is_finite()) {
            return TestResult::discard();
        }
        let xi = Vec6::new(v1, v2, v3, w1, w2, w3);
        TestResult::from_bool(xi == vee(hat(xi)))
    }

    #[quickcheck_macros::quickcheck]
    fn log_exp_round_trip(t1: i8, t2: i8, t3: i8, a1: i8, a2: i8, a3: i8) -> bool {
        let xi = gen_bounded_twist(t1, t2, t3, a1, a2, a3);
        approx::relative_eq!(xi, log(&exp(xi)), epsilon = EPSILON_ROUNDTRIP_APPROX)
    }

    #[quickcheck_macros::quickcheck]
    fn compose_with_inverse_is_identity(t1: i8, t2: i8, t3: i8, a1: i8, a2: i8, a3: i8) -> bool {
        let motion = exp(gen_bounded_twist(t1, t2, t3, a1, a2, a3));
        let (rotation, translation) = compose(&motion, &inverse(&motion));
        approx::relative_eq!(Mat3::identity(), rotation, epsilon = EPSILON_ROUNDTRIP_APPROX)
            && approx::abs_diff_eq!(Vec3::zeros(), translation, epsilon = EPSILON_ROUNDTRIP_APPROX)
    }

    #[quickcheck_macros::quickcheck]
    fn pure_translations_compose_additively(t1: i8, t2: i8, t3: i8, s1: i8, s2: i8, s3: i8) -> bool {
        let a = gen_bounded_twist(t1, t2, t3, 0, 0, 0);
        let b = gen_bounded_twist(s1, s2, s3, 0, 0, 0);
        let composed = log(&compose(&exp(a), &exp(b)));
        approx::abs_diff_eq!(composed, a + b, epsilon = EPSILON_ROUNDTRIP_APPROX)
    }

    // GENERATORS ####################################################

    /// Twist with each coordinate in [-0.64, 0.64].
    fn gen_bounded_twist(t1: i8, t2: i8, t3: i8, a1: i8, a2: i8, a3: i8) -> Twist {
        Vec6::new(
            Float::from(t1) / 200.0,
            Float::from(t2) / 200.0,
            Float::from(t3) / 200.0,
            Float::from(a1) / 200.0,
            Float::from(a2) / 200.0,
            Float::from(a3) / 200.0,
        )
    }
}
