// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Warp of previous-frame pixels into the current frame.
//!
//! For each pixel of the previous frame with a valid depth, the 3D point is
//! back-projected, moved by the current motion estimate and re-projected
//! into the current frame. The rotation is pre-multiplied with the inverse
//! intrinsics on the host so the per-pixel kernel is a single 3x3
//! multiply-add followed by one projection.

use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::core::camera::Intrinsics;
use crate::misc::type_aliases::{Float, Mat3, Vec3};

/// Sentinel stored in `u_warped`/`v_warped` for pixels without depth,
/// behind the camera, or warped outside the current frame.
pub const INVALID: Float = -1.0;

/// Image-sized scratch arrays of the warp:
/// the transformed 3D point and its pixel coordinates in the current frame.
///
/// Allocated once at full resolution; coarser levels use a prefix.
pub struct WarpBuffers {
    pub x_prime: Vec<Float>,
    pub y_prime: Vec<Float>,
    pub z_prime: Vec<Float>,
    pub u_warped: Vec<Float>,
    pub v_warped: Vec<Float>,
}

impl WarpBuffers {
    pub fn allocate(nb_pixels: usize) -> WarpBuffers {
        WarpBuffers {
            x_prime: vec![0.0; nb_pixels],
            y_prime: vec![0.0; nb_pixels],
            z_prime: vec![0.0; nb_pixels],
            u_warped: vec![INVALID; nb_pixels],
            v_warped: vec![INVALID; nb_pixels],
        }
    }
}

/// Transform every pixel of the previous depth map into the current frame.
///
/// `rot_k_inv` is `R * K^-1` of the current level and motion estimate,
/// computed once per iteration by the caller.
pub fn transform_points(
    buffers: &mut WarpBuffers,
    depth: &DMatrix<Float>,
    rot_k_inv: &Mat3,
    translation: &Vec3,
    intrinsics: &Intrinsics,
) {
    let (nb_rows, nb_cols) = depth.shape();
    let nb_pixels = nb_rows * nb_cols;
    let u_max = (nb_cols - 1) as Float;
    let v_max = (nb_rows - 1) as Float;
    (
        &mut buffers.x_prime[..nb_pixels],
        &mut buffers.y_prime[..nb_pixels],
        &mut buffers.z_prime[..nb_pixels],
        &mut buffers.u_warped[..nb_pixels],
        &mut buffers.v_warped[..nb_pixels],
        depth.as_slice(),
    )
        .into_par_iter()
        .enumerate()
        .for_each(|(index, (x_prime, y_prime, z_prime, u_warped, v_warped, &d))| {
            // column-major buffers
            let x = (index / nb_rows) as Float;
            let y = (index % nb_rows) as Float;
            if d == 0.0 {
                *x_prime = 0.0;
                *y_prime = 0.0;
                *z_prime = 0.0;
                *u_warped = INVALID;
                *v_warped = INVALID;
                return;
            }
            let point = rot_k_inv * Vec3::new(x * d, y * d, d) + translation;
            *x_prime = point.x;
            *y_prime = point.y;
            *z_prime = point.z;
            if point.z <= 0.0 {
                *u_warped = INVALID;
                *v_warped = INVALID;
                return;
            }
            let projected = intrinsics.project(point);
            let u = projected.x / projected.z;
            let v = projected.y / projected.z;
            if 0.0 <= u && u <= u_max && 0.0 <= v && v <= v_max {
                *u_warped = u;
                *v_warped = v;
            } else {
                *u_warped = INVALID;
                *v_warped = INVALID;
            }
        });
}

// TESTS #############################################################
