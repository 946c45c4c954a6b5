// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Residual weighting for the normal equations.
//!
//! Either uniform weights, or a Student-t M-estimator whose scale is
//! re-estimated by a short fixed-point iteration at every Gauss-Newton step.

use rayon::prelude::*;

use crate::core::track::reduction;
use crate::misc::type_aliases::Float;

/// Weighting of the photometric residuals, chosen at tracker construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeightKind {
    Uniform,
    StudentT { dof: Float, scale_initial: Float },
}

impl Default for WeightKind {
    fn default() -> Self {
        WeightKind::StudentT {
            dof: 5.0,
            scale_initial: 6.25e-4,
        }
    }
}

impl WeightKind {
    /// Scale seed of the variance iteration, re-used at the start of every level.
    pub fn initial_scale(&self) -> Float {
        match *self {
            WeightKind::Uniform => 0.0,
            WeightKind::StudentT { scale_initial, .. } => scale_initial,
        }
    }
}

const MAX_SCALE_ITERATIONS: usize = 5;
/// Convergence threshold of the scale iteration, on the precision 1/variance.
const SCALE_PRECISION_EPSILON: Float = 1e-3;

/// Fill `weights` from the residuals, zeroing invalid pixels.
///
/// In Student-t mode, `variance` carries the scale estimate across the
/// Gauss-Newton iterations of one level and is updated in place.
pub fn compute(
    weights: &mut [Float],
    residuals: &[Float],
    u_warped: &[Float],
    kind: WeightKind,
    variance: &mut Float,
) {
    debug_assert_eq!(weights.len(), residuals.len());
    match kind {
        WeightKind::Uniform => {
            (weights, u_warped)
                .into_par_iter()
                .for_each(|(weight, &u)| *weight = if u < 0.0 { 0.0 } else { 1.0 });
        }
        WeightKind::StudentT { dof, .. } => {
            estimate_scale(weights, residuals, dof, variance);
            let scale = *variance;
            (weights, residuals, u_warped).into_par_iter().for_each(
                |(weight, &residual, &u)| {
                    *weight = if u < 0.0 {
                        0.0
                    } else {
                        (dof + 1.0) / (dof + residual * residual / scale)
                    };
                },
            );
        }
    }
}

/// Fixed-point iteration of the Student-t scale:
/// `variance <- mean(r^2 * (dof + 1) / (dof + r^2 / variance))`,
/// stopped when the precision 1/variance settles or after a few rounds.
///
/// The weight buffer doubles as scratch for the per-pixel summands.
/// A vanishing estimate (perfect fit) keeps the previous scale so the final
/// weights stay finite.
fn estimate_scale(scratch: &mut [Float], residuals: &[Float], dof: Float, variance: &mut Float) {
    let nb_pixels = residuals.len() as Float;
    for _ in 0..MAX_SCALE_ITERATIONS {
        let variance_prev = *variance;
        (&mut scratch[..], residuals)
            .into_par_iter()
            .for_each(|(summand, &residual)| {
                let squared = residual * residual;
                *summand = squared * (dof + 1.0) / (dof + squared / variance_prev);
            });
        let variance_new = reduction::reduce_sum(scratch) / nb_pixels;
        if variance_new <= Float::MIN_POSITIVE {
            break;
        }
        *variance = variance_new;
        if (1.0 / variance_new - 1.0 / variance_prev).abs() <= SCALE_PRECISION_EPSILON {
            break;
        }
    }
}

// TESTS #############################################################
