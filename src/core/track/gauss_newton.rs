// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Gauss-Newton tracker aligning consecutive RGB-D frames by dense
//! photometric error minimisation over an image pyramid.
//!
//! A [`Tracker`] is built from the first gray+depth frame by [`Config::init`].
//! Every subsequent call to [`Tracker::align`] estimates the motion towards
//! the new frame, coarse to fine, and returns the accumulated pose as a
//! twist. After each call the freshly processed frame becomes the reference
//! for the next one; only the two pyramid handles are swapped, no buffer is
//! reallocated or copied.

use log::{debug, warn};
use nalgebra::DMatrix;
use thiserror::Error;

use crate::core::camera::Intrinsics;
use crate::core::multires::FramePyramid;
use crate::core::track::warp::{self, WarpBuffers};
use crate::core::track::weights::{self, WeightKind};
use crate::core::track::{jacobian, reduction};
use crate::math::se3::{self, Twist};
use crate::misc::type_aliases::{Float, Mat3, Vec6};

/// Strategies for the normal-equation step.
///
/// Only Gauss-Newton is implemented; the other tags are reserved and
/// rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvingMethod {
    GaussNewton,
    LevenbergMarquardt,
    GradientDescent,
}

/// Outcome flag of a [`Tracker::align`] call.
///
/// Numerical problems never unwind through the alignment loop; a level that
/// produces non-finite normal equations is abandoned and the call reports
/// `Degenerate` alongside the (still finite) accumulated pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignStatus {
    Ok,
    Degenerate,
}

/// Construction-time precondition violations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("image dimensions {width}x{height} do not support {nb_levels} pyramid levels")]
    InvalidDimensions {
        width: usize,
        height: usize,
        nb_levels: usize,
    },
    #[error("invalid pyramid level range: min {min_level} > max {max_level}")]
    InvalidLevelRange { min_level: usize, max_level: usize },
    #[error("camera projection must be upper triangular with non-zero focal lengths")]
    InvalidIntrinsics,
    #[error("at least one iteration per level is required")]
    InvalidIterationCount,
    #[error("solving method {0:?} is reserved and not implemented")]
    UnsupportedSolver(SolvingMethod),
    #[error("first frame is {got_width}x{got_height}, configured {width}x{height}")]
    FrameSizeMismatch {
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },
}

/// Configuration of the tracker.
pub struct Config {
    /// Width of all frames, must be divisible by `2^max_level`.
    pub width: usize,
    /// Height of all frames, must be divisible by `2^max_level`.
    pub height: usize,
    /// Camera intrinsic parameters at full resolution.
    pub intrinsics: Intrinsics,
    /// Lowest (finest) pyramid level used for alignment.
    pub min_level: usize,
    /// Highest (coarsest) pyramid level.
    pub max_level: usize,
    /// Iteration budget of each level.
    pub max_iterations_per_level: usize,
    /// Residual weighting.
    pub weights: WeightKind,
    pub solving_method: SolvingMethod,
    /// A level stops iterating once `error / error_prev` exceeds this ratio.
    pub convergence_ratio: Float,
}

impl Config {
    /// Default configuration for frames of the given geometry.
    pub fn new(width: usize, height: usize, intrinsics: Intrinsics) -> Config {
        Config {
            width,
            height,
            intrinsics,
            min_level: 0,
            max_level: 4,
            max_iterations_per_level: 20,
            weights: WeightKind::default(),
            solving_method: SolvingMethod::GaussNewton,
            convergence_ratio: 0.995,
        }
    }

    /// Default configuration from a raw 3x3 projection matrix.
    ///
    /// The matrix must be upper triangular with zero skew, a unit
    /// homogeneous coefficient and non-zero focal lengths
    /// (`k[(0, 0)] = fx`, `k[(1, 1)] = fy`, `k[(0, 2)] = cx`, `k[(1, 2)] = cy`).
    pub fn from_k_matrix(width: usize, height: usize, k: &Mat3) -> Result<Config, TrackerError> {
        let intrinsics = Intrinsics::from_matrix(k).ok_or(TrackerError::InvalidIntrinsics)?;
        Ok(Config::new(width, height, intrinsics))
    }

    /// Check the preconditions and initialize a tracker with the first frame.
    ///
    /// This is the only error surface: once constructed, the tracker never
    /// fails, it only reports degenerate alignments through [`AlignStatus`].
    pub fn init(
        self,
        gray: &DMatrix<Float>,
        depth: &DMatrix<Float>,
    ) -> Result<Tracker, TrackerError> {
        if self.min_level > self.max_level {
            return Err(TrackerError::InvalidLevelRange {
                min_level: self.min_level,
                max_level: self.max_level,
            });
        }
        let nb_levels = self.max_level + 1;
        let cell = 1 << self.max_level;
        let divisible =
            self.width >= cell && self.height >= cell && self.width % cell == 0 && self.height % cell == 0;
        if !divisible {
            return Err(TrackerError::InvalidDimensions {
                width: self.width,
                height: self.height,
                nb_levels,
            });
        }
        if self.intrinsics.fx == 0.0 || self.intrinsics.fy == 0.0 {
            return Err(TrackerError::InvalidIntrinsics);
        }
        if self.max_iterations_per_level == 0 {
            return Err(TrackerError::InvalidIterationCount);
        }
        if self.solving_method != SolvingMethod::GaussNewton {
            return Err(TrackerError::UnsupportedSolver(self.solving_method));
        }
        let (got_height, got_width) = gray.shape();
        if (got_height, got_width) != (self.height, self.width) || depth.shape() != gray.shape() {
            return Err(TrackerError::FrameSizeMismatch {
                width: self.width,
                height: self.height,
                got_width,
                got_height,
            });
        }

        let intrinsics_multires = self.intrinsics.clone().multi_res(nb_levels);
        let mut previous = FramePyramid::allocate(self.width, self.height, nb_levels);
        previous.fill(gray, depth);
        let current = FramePyramid::allocate(self.width, self.height, nb_levels);
        let nb_pixels = self.width * self.height;
        Ok(Tracker {
            intrinsics_multires,
            previous,
            current,
            buffers: IterationBuffers::allocate(nb_pixels),
            motion: Twist::zeros(),
            motion_total: Twist::zeros(),
            config: self,
        })
    }
}

/// Scratch buffers reused by every Gauss-Newton iteration,
/// allocated once at full resolution.
struct IterationBuffers {
    warp: WarpBuffers,
    jacobians: Vec<Vec6>,
    residuals: Vec<Float>,
    weights: Vec<Float>,
}

impl IterationBuffers {
    fn allocate(nb_pixels: usize) -> IterationBuffers {
        IterationBuffers {
            warp: WarpBuffers::allocate(nb_pixels),
            jacobians: vec![Vec6::zeros(); nb_pixels],
            residuals: vec![0.0; nb_pixels],
            weights: vec![0.0; nb_pixels],
        }
    }
}

/// Diagonal loading of the normal matrix, guarding the factorization
/// against rank deficiency when a level degenerates.
const DIAGONAL_LOADING: Float = 1e-12;

/// Struct used for tracking the camera at each frame.
/// Can only be constructed through a [`Config`].
pub struct Tracker {
    config: Config,
    intrinsics_multires: Vec<Intrinsics>,
    previous: FramePyramid,
    current: FramePyramid,
    buffers: IterationBuffers,
    /// Inter-frame motion estimate, kept as initial guess for the next frame.
    motion: Twist,
    /// Accumulated pose of the previous frame in the first frame coordinates.
    motion_total: Twist,
}

impl Tracker {
    /// Align a new frame against the previous one.
    ///
    /// The frames must have the shape the tracker was configured with.
    /// Returns the accumulated pose `log(exp(xi_total) * exp(xi)^-1)` and a
    /// status flag; afterwards the given frame has become the new reference.
    pub fn align(
        &mut self,
        gray: &DMatrix<Float>,
        depth: &DMatrix<Float>,
    ) -> (Twist, AlignStatus) {
        debug_assert_eq!(gray.shape(), (self.config.height, self.config.width));
        debug_assert_eq!(depth.shape(), gray.shape());
        self.current.fill(gray, depth);

        let mut status = AlignStatus::Ok;
        for level in (self.config.min_level..=self.config.max_level).rev() {
            if let AlignStatus::Degenerate = self.align_level(level) {
                status = AlignStatus::Degenerate;
            }
        }

        if !self.motion.iter().all(|x| x.is_finite()) {
            warn!("non-finite motion estimate, resetting to identity");
            self.motion = Twist::zeros();
            status = AlignStatus::Degenerate;
        }

        // The freshly processed frame becomes the reference for the next call.
        std::mem::swap(&mut self.previous, &mut self.current);
        self.motion_total = se3::log(&se3::compose(
            &se3::exp(self.motion_total),
            &se3::inverse(&se3::exp(self.motion)),
        ));
        (self.motion_total, status)
    }

    /// Accumulated pose, as returned by the last `align` call.
    pub fn pose(&self) -> Twist {
        self.motion_total
    }

    /// Run the Gauss-Newton iterations of one pyramid level.
    fn align_level(&mut self, level: usize) -> AlignStatus {
        let previous = self.previous.level(level);
        let current = self.current.level(level);
        let intrinsics = &self.intrinsics_multires[level];
        let buffers = &mut self.buffers;
        let (nb_rows, nb_cols) = previous.gray.shape();
        let nb_pixels = nb_rows * nb_cols;

        let mut error_prev = Float::INFINITY;
        let mut variance = self.config.weights.initial_scale();
        for iteration in 0..self.config.max_iterations_per_level {
            let (rotation, translation) = se3::exp(self.motion);
            let rot_k_inv = rotation * intrinsics.inverse_matrix();
            warp::transform_points(
                &mut buffers.warp,
                &previous.depth,
                &rot_k_inv,
                &translation,
                intrinsics,
            );
            jacobian::compute_residuals(
                &mut buffers.residuals[..nb_pixels],
                &previous.gray,
                &current.gray,
                &buffers.warp,
            );
            jacobian::compute_jacobians(
                &mut buffers.jacobians[..nb_pixels],
                &current.gray_dx,
                &current.gray_dy,
                intrinsics,
                &buffers.warp,
            );
            let error =
                reduction::reduce_squared_sum(&buffers.residuals[..nb_pixels]) / nb_pixels as Float;
            weights::compute(
                &mut buffers.weights[..nb_pixels],
                &buffers.residuals[..nb_pixels],
                &buffers.warp.u_warped[..nb_pixels],
                self.config.weights,
                &mut variance,
            );
            let (a_mat, b_vec) = reduction::reduce_outer(
                &buffers.jacobians[..nb_pixels],
                &buffers.weights[..nb_pixels],
                &buffers.residuals[..nb_pixels],
            );

            if !(a_mat.iter().all(|x| x.is_finite()) && b_vec.iter().all(|x| x.is_finite())) {
                warn!("level {}: non-finite normal equations, level abandoned", level);
                return AlignStatus::Degenerate;
            }

            let mut loaded = a_mat;
            for i in 0..6 {
                loaded[(i, i)] += DIAGONAL_LOADING;
            }
            match loaded.cholesky() {
                Some(factorization) => {
                    let delta: Vec6 = -factorization.solve(&b_vec);
                    if delta.iter().all(|x| x.is_finite()) {
                        self.motion =
                            se3::log(&se3::compose(&se3::exp(delta), &se3::exp(self.motion)));
                    } else {
                        debug!("level {} iteration {}: non-finite step ignored", level, iteration);
                        continue;
                    }
                }
                None => {
                    // Rank-deficient level: keep the estimate, spend the iteration.
                    debug!("level {} iteration {}: singular normal equations", level, iteration);
                    continue;
                }
            }

            if error / error_prev > self.config.convergence_ratio || error == 0.0 {
                debug!(
                    "level {} converged after {} iterations, error {:.3e}",
                    level,
                    iteration + 1,
                    error
                );
                break;
            }
            error_prev = error;
        }
        AlignStatus::Ok
    }
}

// TESTS #############################################################
