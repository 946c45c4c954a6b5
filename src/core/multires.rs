// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Multi-resolution pyramids of gray and depth frames.
//!
//! Each level halves the resolution of the previous one with a 2x2 block
//! operation: plain averaging for intensities, and an average restricted to
//! valid (non-zero) measurements for depth. Level buffers are allocated once
//! and refilled in place for every new frame.

use nalgebra::DMatrix;

use crate::core::gradient;
use crate::misc::type_aliases::Float;

/// Image buffers of one pyramid level: intensities, depth and
/// the intensity derivatives.
pub struct PyramidLevel {
    pub gray: DMatrix<Float>,
    pub depth: DMatrix<Float>,
    pub gray_dx: DMatrix<Float>,
    pub gray_dy: DMatrix<Float>,
}

/// Pyramid of one RGB-D frame, full resolution first.
pub struct FramePyramid {
    levels: Vec<PyramidLevel>,
}

impl FramePyramid {
    /// Allocate zeroed buffers for all levels of a `width` x `height` frame.
    ///
    /// Both dimensions must be divisible by `2^(nb_levels - 1)`
    /// so that every level halves exactly.
    pub fn allocate(width: usize, height: usize, nb_levels: usize) -> FramePyramid {
        let levels = (0..nb_levels)
            .map(|level| {
                let level_width = width >> level;
                let level_height = height >> level;
                PyramidLevel {
                    gray: DMatrix::zeros(level_height, level_width),
                    depth: DMatrix::zeros(level_height, level_width),
                    gray_dx: DMatrix::zeros(level_height, level_width),
                    gray_dy: DMatrix::zeros(level_height, level_width),
                }
            })
            .collect();
        FramePyramid { levels }
    }

    pub fn nb_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn level(&self, level: usize) -> &PyramidLevel {
        &self.levels[level]
    }

    /// Refill every level from a new full resolution frame, without allocating.
    pub fn fill(&mut self, gray: &DMatrix<Float>, depth: &DMatrix<Float>) {
        debug_assert_eq!(gray.shape(), self.levels[0].gray.shape());
        debug_assert_eq!(depth.shape(), self.levels[0].depth.shape());
        self.levels[0].gray.copy_from(gray);
        self.levels[0].depth.copy_from(depth);
        for level in 1..self.levels.len() {
            let (coarser, finer) = self.levels.split_at_mut(level);
            let src = &coarser[level - 1];
            let dst = &mut finer[0];
            halve_gray_into(&src.gray, &mut dst.gray);
            halve_depth_into(&src.depth, &mut dst.depth);
        }
        for level in self.levels.iter_mut() {
            let PyramidLevel {
                gray,
                gray_dx,
                gray_dy,
                ..
            } = level;
            gradient::centered_into(gray, gray_dx, gray_dy);
        }
    }
}

/// Halve the resolution of an intensity image by averaging each 2x2 block.
fn halve_gray_into(src: &DMatrix<Float>, dst: &mut DMatrix<Float>) {
    let (half_rows, half_cols) = dst.shape();
    for x in 0..half_cols {
        for y in 0..half_rows {
            let a = src[(2 * y, 2 * x)];
            let b = src[(2 * y + 1, 2 * x)];
            let c = src[(2 * y, 2 * x + 1)];
            let d = src[(2 * y + 1, 2 * x + 1)];
            dst[(y, x)] = 0.25 * (a + b + c + d);
        }
    }
}

/// Halve the resolution of a depth image.
///
/// Unlike intensities, a zero depth is not a measurement:
/// each 2x2 block averages its non-zero values only,
/// and a block with no valid value stays invalid (zero).
fn halve_depth_into(src: &DMatrix<Float>, dst: &mut DMatrix<Float>) {
    let (half_rows, half_cols) = dst.shape();
    for x in 0..half_cols {
        for y in 0..half_rows {
            let block = [
                src[(2 * y, 2 * x)],
                src[(2 * y + 1, 2 * x)],
                src[(2 * y, 2 * x + 1)],
                src[(2 * y + 1, 2 * x + 1)],
            ];
            let mut sum = 0.0;
            let mut nb_valid = 0;
            for &d in block.iter() {
                if d > 0.0 {
                    sum += d;
                    nb_valid += 1;
                }
            }
            dst[(y, x)] = if nb_valid == 0 {
                0.0
            } else {
                sum / nb_valid as Float
            };
        }
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn level_sizes_halve() {
        let pyramid = FramePyramid::allocate(64, 32, 4);
        for level in 0..4 {
            assert_eq!((32 >> level, 64 >> level), pyramid.level(level).gray.shape());
        }
    }

    #[test]
    fn first_level_is_a_copy() {
        let gray = DMatrix::from_fn(4, 4, |i, j| (i + 2 * j) as Float / 10.0);
        let depth = DMatrix::from_element(4, 4, 1.5);
        let mut pyramid = FramePyramid::allocate(4, 4, 2);
        pyramid.fill(&gray, &depth);
        assert_eq!(&gray, &pyramid.level(0).gray);
        assert_eq!(&depth, &pyramid.level(0).depth);
    }

    #[test]
    fn gray_halving_is_block_average() {
        let gray = DMatrix::from_row_slice(2, 2, &[0.1, 0.2, 0.3, 0.4]);
        let depth = DMatrix::from_element(2, 2, 1.0);
        let mut pyramid = FramePyramid::allocate(2, 2, 2);
        pyramid.fill(&gray, &depth);
        assert_relative_eq!(pyramid.level(1).gray[(0, 0)], 0.25);
    }

    #[test]
    fn depth_halving_skips_invalid_pixels() {
        let gray = DMatrix::from_element(2, 2, 0.5);
        let depth = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let mut pyramid = FramePyramid::allocate(2, 2, 2);
        pyramid.fill(&gray, &depth);
        // average of the two valid measurements only
        assert_relative_eq!(pyramid.level(1).depth[(0, 0)], 3.0);
    }

    #[test]
    fn depth_halving_keeps_fully_invalid_blocks_invalid() {
        let gray = DMatrix::from_element(2, 2, 0.5);
        let depth = DMatrix::zeros(2, 2);
        let mut pyramid = FramePyramid::allocate(2, 2, 2);
        pyramid.fill(&gray, &depth);
        assert_eq!(pyramid.level(1).depth[(0, 0)], 0.0);
    }

    #[test]
    fn derivatives_are_computed_per_level() {
        let gray = DMatrix::from_fn(4, 4, |_, j| j as Float / 4.0);
        let depth = DMatrix::from_element(4, 4, 1.0);
        let mut pyramid = FramePyramid::allocate(4, 4, 2);
        pyramid.fill(&gray, &depth);
        // constant horizontal slope at both levels
        assert_relative_eq!(pyramid.level(0).gray_dx[(1, 1)], 0.25);
        assert_relative_eq!(pyramid.level(1).gray_dx[(0, 0)], 0.5);
        assert_relative_eq!(pyramid.level(0).gray_dy[(1, 1)], 0.0);
    }
}
