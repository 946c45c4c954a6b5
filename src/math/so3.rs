// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Lie algebra/group functions for 3D rotations, on rotation matrices.
//!
//! Interesting reads:
//! - Sophus c++ library: <https://github.com/strasdat/Sophus>
//! - Ethan Eade course on Lie Groups for 2D and 3D transformations:
//!     - details: <http://ethaneade.com/lie.pdf>
//!     - summary: <http://ethaneade.com/lie_groups.pdf>

use crate::misc::type_aliases::{Float, Mat3, Vec3};

/// Threshold for using Taylor series in computations.
const EPSILON_TAYLOR_SERIES: Float = 1e-2;
const EPSILON_TAYLOR_SERIES_2: Float = EPSILON_TAYLOR_SERIES * EPSILON_TAYLOR_SERIES;
const _1_6: Float = 1.0 / 6.0;
const _1_24: Float = 1.0 / 24.0;

/// Hat operator.
/// Goes from so3 parameterization to so3 element (skew-symmetric matrix).
#[rustfmt::skip]
pub fn hat(w: Vec3) -> Mat3 {
    Mat3::new(
         0.0,  -w.z,   w.y,
         w.z,   0.0,  -w.x,
        -w.y,   w.x,   0.0,
    )
}

/// Squared hat operator (`hat_2(w) == hat(w) * hat(w)`).
/// Result is a symmetric matrix.
#[rustfmt::skip]
pub fn hat_2(w: Vec3) -> Mat3 {
    let w11 = w.x * w.x;
    let w12 = w.x * w.y;
    let w13 = w.x * w.z;
    let w22 = w.y * w.y;
    let w23 = w.y * w.z;
    let w33 = w.z * w.z;
    Mat3::new(
        -w22 - w33,     w12,           w13,
         w12,          -w11 - w33,     w23,
         w13,           w23,          -w11 - w22,
    )
}

/// Vee operator. Inverse of the hat operator.
/// Warning! does not check that the given matrix is skew-symmetric.
pub fn vee(mat: Mat3) -> Vec3 {
    Vec3::new(mat.m32, mat.m13, mat.m21)
}

/// Compute the exponential map from Lie algebra so3 to Lie group SO3.
/// Rodrigues formula, with a Taylor path for small angles.
pub fn exp(w: Vec3) -> Mat3 {
    let theta_2 = w.norm_squared();
    let (omega, omega_2) = (hat(w), hat_2(w));
    let (coef_omega, coef_omega_2) = if theta_2 < EPSILON_TAYLOR_SERIES_2 {
        // sin(t)/t and (1-cos(t))/t^2
        (1.0 - _1_6 * theta_2, 0.5 - _1_24 * theta_2) // TAYLOR
    } else {
        let theta = theta_2.sqrt();
        (theta.sin() / theta, (1.0 - theta.cos()) / theta_2)
    };
    Mat3::identity() + coef_omega * omega + coef_omega_2 * omega_2
}

/// Compute the logarithm map from the Lie group SO3 to the Lie algebra so3.
/// Inverse of the exponential map.
///
/// Valid for rotation angles strictly below pi,
/// which covers every inter-frame motion the tracker manipulates.
pub fn log(rotation: &Mat3) -> Vec3 {
    let cos_theta = 0.5 * (rotation.trace() - 1.0);
    let cos_theta = cos_theta.max(-1.0).min(1.0);
    let theta = cos_theta.acos();
    // vee of the skew-symmetric part, equals sin(theta) * axis.
    let sin_axis = 0.5 * vee(rotation - rotation.transpose());
    if theta < EPSILON_TAYLOR_SERIES {
        // t/sin(t)
        sin_axis * (1.0 + _1_6 * theta * theta) // TAYLOR
    } else {
        sin_axis * (theta / theta.sin())
    }
}

// TESTS #############################################################
