// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pinhole camera intrinsics and their multi-resolution pyramid.

use crate::misc::type_aliases::{Float, Mat3, Vec3};

/// Intrinsic parameters of a zero-skew pinhole camera.
#[derive(PartialEq, Debug, Clone)]
pub struct Intrinsics {
    pub fx: Float,
    pub fy: Float,
    pub cx: Float,
    pub cy: Float,
}

impl Intrinsics {
    pub fn new(fx: Float, fy: Float, cx: Float, cy: Float) -> Intrinsics {
        Intrinsics { fx, fy, cx, cy }
    }

    /// Extract intrinsics from a 3x3 projection matrix.
    ///
    /// Returns `None` if the matrix is not upper triangular with zero skew,
    /// a unit homogeneous coefficient and non-zero focal lengths.
    pub fn from_matrix(k: &Mat3) -> Option<Intrinsics> {
        let zero_skew = k[(0, 1)] == 0.0;
        let upper_triangular = k[(1, 0)] == 0.0 && k[(2, 0)] == 0.0 && k[(2, 1)] == 0.0;
        let unit_homogeneous = (k[(2, 2)] - 1.0).abs() <= Float::EPSILON;
        let non_zero_focals = k[(0, 0)] != 0.0 && k[(1, 1)] != 0.0;
        if zero_skew && upper_triangular && unit_homogeneous && non_zero_focals {
            Some(Intrinsics::new(k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)]))
        } else {
            None
        }
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Mat3 {
        Mat3::new(
            self.fx,  0.0,      self.cx,
            0.0,      self.fy,  self.cy,
            0.0,      0.0,      1.0,
        )
    }

    /// Closed-form inverse of `matrix()`.
    #[rustfmt::skip]
    pub fn inverse_matrix(&self) -> Mat3 {
        Mat3::new(
            1.0 / self.fx,  0.0,            -self.cx / self.fx,
            0.0,            1.0 / self.fy,  -self.cy / self.fy,
            0.0,            0.0,            1.0,
        )
    }

    /// Intrinsics of the image downsampled by a factor 2,
    /// i.e. the matrix scaled by diag(0.5, 0.5, 1).
    pub fn half_res(&self) -> Intrinsics {
        Intrinsics {
            fx: 0.5 * self.fx,
            fy: 0.5 * self.fy,
            cx: 0.5 * self.cx,
            cy: 0.5 * self.cy,
        }
    }

    /// Intrinsics of all pyramid levels, full resolution first.
    pub fn multi_res(self, nb_levels: usize) -> Vec<Intrinsics> {
        let mut intrinsics = Vec::new();
        if nb_levels > 0 {
            intrinsics.push(self);
            for _ in 1..nb_levels {
                let new = intrinsics.last().unwrap().half_res();
                intrinsics.push(new);
            }
        }
        intrinsics
    }

    /// Project a camera-frame point into homogeneous pixel coordinates.
    pub fn project(&self, point: Vec3) -> Vec3 {
        Vec3::new(
            self.fx * point.x + self.cx * point.z,
            self.fy * point.y + self.cy * point.z,
            point.z,
        )
    }

    /// Back-project pixel coordinates and a depth into a camera-frame point.
    pub fn back_project(&self, u: Float, v: Float, depth: Float) -> Vec3 {
        Vec3::new(
            (u - self.cx) * depth / self.fx,
            (v - self.cy) * depth / self.fy,
            depth,
        )
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    fn intrinsics() -> Intrinsics {
        Intrinsics::new(481.2, -480.0, 319.5, 239.5)
    }

    #[test]
    fn inverse_matrix_is_matrix_inverse() {
        let k = intrinsics();
        assert_relative_eq!(
            k.matrix() * k.inverse_matrix(),
            Mat3::identity(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn half_res_is_diag_scaling() {
        let k = intrinsics();
        let scaling = Mat3::new(0.5, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(k.half_res().matrix(), scaling * k.matrix(), epsilon = 1e-6);
    }

    #[test]
    fn multi_res_halves_each_level() {
        let pyramid = intrinsics().multi_res(5);
        assert_eq!(5, pyramid.len());
        for level in 1..5 {
            let scale = (0.5 as Float).powi(level as i32);
            assert_relative_eq!(pyramid[level].fx, scale * pyramid[0].fx);
            assert_relative_eq!(pyramid[level].cy, scale * pyramid[0].cy);
        }
    }

    #[test]
    fn project_back_project_round_trip() {
        let k = intrinsics();
        let point = Vec3::new(0.3, -0.2, 2.5);
        let projected = k.project(point);
        let back = k.back_project(
            projected.x / projected.z,
            projected.y / projected.z,
            projected.z,
        );
        assert_relative_eq!(point, back, epsilon = 1e-5);
    }

    #[test]
    fn from_matrix_requires_upper_triangular() {
        let mut k = intrinsics().matrix();
        assert_eq!(Some(intrinsics()), Intrinsics::from_matrix(&k));
        k[(1, 0)] = 0.1;
        assert_eq!(None, Intrinsics::from_matrix(&k));
    }

    #[test]
    fn from_matrix_requires_non_zero_focals() {
        let mut k = intrinsics().matrix();
        k[(0, 0)] = 0.0;
        assert_eq!(None, Intrinsics::from_matrix(&k));
    }
}
