// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Photometric residuals and their twist Jacobian rows.
//!
//! Pixels marked invalid by the warp (and any non-finite value coming out of
//! the arithmetic) produce exact zeros, so the downstream reductions need no
//! validity branching.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::core::camera::Intrinsics;
use crate::core::track::sample;
use crate::core::track::warp::WarpBuffers;
use crate::misc::type_aliases::{Float, Vec6};

/// Photometric residual of every previous-frame pixel:
/// current intensity sampled at the warped position, minus previous intensity.
pub fn compute_residuals(
    residuals: &mut [Float],
    previous_gray: &DMatrix<Float>,
    current_gray: &DMatrix<Float>,
    warp: &WarpBuffers,
) {
    let nb_pixels = residuals.len();
    debug_assert_eq!(nb_pixels, previous_gray.len());
    (
        residuals,
        previous_gray.as_slice(),
        &warp.u_warped[..nb_pixels],
        &warp.v_warped[..nb_pixels],
    )
        .into_par_iter()
        .for_each(|(residual, &previous, &u, &v)| {
            *residual = if u < 0.0 {
                0.0
            } else {
                let r = sample::bilinear(current_gray, u, v) - previous;
                if r.is_finite() {
                    r
                } else {
                    0.0
                }
            };
        });
}

/// Jacobian row of every residual with respect to the twist,
/// evaluated at the current motion estimate (left-perturbation convention).
///
/// With sampled gradients (gx, gy) and transformed point P = (X, Y, Z),
/// the image gradient contracted with the projection derivative is
/// `q = (a, b, c) = (gx*fx/Z, gy*fy/Z, -(a*X + b*Y)/Z)`
/// and the row is `[q | P x q]`.
pub fn compute_jacobians(
    jacobians: &mut [Vec6],
    gradient_x: &DMatrix<Float>,
    gradient_y: &DMatrix<Float>,
    intrinsics: &Intrinsics,
    warp: &WarpBuffers,
) {
    let nb_pixels = jacobians.len();
    let fx = intrinsics.fx;
    let fy = intrinsics.fy;
    (
        jacobians,
        &warp.x_prime[..nb_pixels],
        &warp.y_prime[..nb_pixels],
        &warp.z_prime[..nb_pixels],
        &warp.u_warped[..nb_pixels],
        &warp.v_warped[..nb_pixels],
    )
        .into_par_iter()
        .for_each(|(jacobian, &x, &y, &z, &u, &v)| {
            if u < 0.0 {
                *jacobian = Vec6::zeros();
                return;
            }
            let gx = sample::bilinear(gradient_x, u, v);
            let gy = sample::bilinear(gradient_y, u, v);
            let z_inv = 1.0 / z;
            let a = gx * fx * z_inv;
            let b = gy * fy * z_inv;
            let c = -(a * x + b * y) * z_inv;
            let row = Vec6::new(a, b, c, c * y - b * z, a * z - c * x, b * x - a * y);
            *jacobian = if row.iter().all(|j| j.is_finite()) {
                row
            } else {
                Vec6::zeros()
            };
        });
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::track::warp::{self, INVALID};
    use crate::misc::type_aliases::Vec3;
    use approx::assert_relative_eq;

    fn identity_buffers(depth: &DMatrix<Float>, intrinsics: &Intrinsics) -> WarpBuffers {
        let mut buffers = WarpBuffers::allocate(depth.len());
        warp::transform_points(
            &mut buffers,
            depth,
            &intrinsics.inverse_matrix(),
            &Vec3::zeros(),
            intrinsics,
        );
        buffers
    }

    #[test]
    fn residuals_vanish_on_identical_frames() {
        let k = Intrinsics::new(50.0, 50.0, 2.0, 2.0);
        let gray = DMatrix::from_fn(4, 4, |i, j| (i + j) as Float / 8.0);
        let depth = DMatrix::from_element(4, 4, 1.0);
        let buffers = identity_buffers(&depth, &k);
        let mut residuals = vec![1.0; 16];
        compute_residuals(&mut residuals, &gray, &gray, &buffers);
        for &r in residuals.iter() {
            assert_relative_eq!(r, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn invalid_pixels_produce_zero_rows() {
        let k = Intrinsics::new(50.0, 50.0, 2.0, 2.0);
        let gray = DMatrix::from_fn(4, 4, |i, j| (2 * i + j) as Float / 16.0);
        let mut depth = DMatrix::from_element(4, 4, 1.0);
        depth[(0, 0)] = 0.0;
        depth[(3, 2)] = 0.0;
        let buffers = identity_buffers(&depth, &k);
        let mut residuals = vec![1.0; 16];
        let mut jacobians = vec![Vec6::repeat(1.0); 16];
        compute_residuals(&mut residuals, &gray, &gray, &buffers);
        compute_jacobians(&mut jacobians, &gray, &gray, &k, &buffers);
        for index in 0..16 {
            if buffers.u_warped[index] == INVALID {
                assert_eq!(residuals[index], 0.0);
                assert_eq!(jacobians[index], Vec6::zeros());
            }
        }
        assert!(buffers.u_warped.iter().filter(|&&u| u == INVALID).count() == 2);
    }

    #[test]
    fn translation_jacobian_matches_finite_differences() {
        // One pixel at the image center with unit depth:
        // d(residual)/d(nu_x) should be gx * fx / Z.
        let k = Intrinsics::new(50.0, 50.0, 2.0, 2.0);
        let gradient_x = DMatrix::from_element(5, 5, 0.01);
        let gradient_y = DMatrix::from_element(5, 5, -0.02);
        let depth = DMatrix::from_element(5, 5, 1.0);
        let buffers = identity_buffers(&depth, &k);
        let mut jacobians = vec![Vec6::zeros(); 25];
        compute_jacobians(&mut jacobians, &gradient_x, &gradient_y, &k, &buffers);
        // pixel (x, y) = (2, 2) is on the optical axis: X = Y = 0, Z = 1
        let index = 2 * 5 + 2;
        let row = jacobians[index];
        assert_relative_eq!(row[0], 0.01 * 50.0, epsilon = 1e-4);
        assert_relative_eq!(row[1], -0.02 * 50.0, epsilon = 1e-4);
        assert_relative_eq!(row[2], 0.0, epsilon = 1e-4);
        // rotation part: P x q with P = (0, 0, 1)
        assert_relative_eq!(row[3], -row[1], epsilon = 1e-4);
        assert_relative_eq!(row[4], row[0], epsilon = 1e-4);
        assert_relative_eq!(row[5], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn non_finite_gradients_are_sanitised() {
        let k = Intrinsics::new(50.0, 50.0, 1.0, 1.0);
        let gradient_x = DMatrix::from_element(3, 3, Float::NAN);
        let gradient_y = DMatrix::from_element(3, 3, 0.0);
        let depth = DMatrix::from_element(3, 3, 1.0);
        let buffers = identity_buffers(&depth, &k);
        let mut jacobians = vec![Vec6::repeat(1.0); 9];
        compute_jacobians(&mut jacobians, &gradient_x, &gradient_y, &k, &buffers);
        assert!(jacobians.iter().all(|row| *row == Vec6::zeros()));
    }
}
