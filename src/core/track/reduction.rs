// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parallel tree reductions over image-sized arrays.
//!
//! Sums are computed blockwise: every block of `BLOCK_SIZE` elements reduces
//! to one partial sum in parallel, and the partial sums are reduced again
//! until a single value remains. The normal equations reuse the same scheme
//! with 27 sums carried per block: the 21 unique entries of the symmetric
//! 6x6 matrix `A = J^T W J` and the 6 entries of `b = J^T W r`.

use itertools::izip;
use rayon::prelude::*;

use crate::misc::type_aliases::{Float, Mat6, Vec6};

/// Elements reduced per block.
pub const BLOCK_SIZE: usize = 1024;

/// Unique sums of the normal equations: upper triangle of A, then b.
const NB_SUMS: usize = 27;

/// Sum of all values.
pub fn reduce_sum(values: &[Float]) -> Float {
    reduce_partials(
        values
            .par_chunks(BLOCK_SIZE)
            .map(|block| block.iter().sum())
            .collect(),
    )
}

/// Sum of all squared values, squaring during the first pass.
pub fn reduce_squared_sum(values: &[Float]) -> Float {
    reduce_partials(
        values
            .par_chunks(BLOCK_SIZE)
            .map(|block| block.iter().map(|v| v * v).sum())
            .collect(),
    )
}

fn reduce_partials(mut partials: Vec<Float>) -> Float {
    while partials.len() > 1 {
        partials = partials
            .par_chunks(BLOCK_SIZE)
            .map(|block| block.iter().sum())
            .collect();
    }
    partials.first().copied().unwrap_or(0.0)
}

/// Assemble the normal equations `A = sum_i w_i J_i^T J_i` and
/// `b = sum_i w_i J_i^T r_i` in one fused reduction.
///
/// Invalid pixels carry zero rows, weights and residuals,
/// so they contribute nothing without any branching here.
pub fn reduce_outer(jacobians: &[Vec6], weights: &[Float], residuals: &[Float]) -> (Mat6, Vec6) {
    debug_assert_eq!(jacobians.len(), weights.len());
    debug_assert_eq!(jacobians.len(), residuals.len());
    let mut partials: Vec<[Float; NB_SUMS]> = jacobians
        .par_chunks(BLOCK_SIZE)
        .zip_eq(weights.par_chunks(BLOCK_SIZE))
        .zip_eq(residuals.par_chunks(BLOCK_SIZE))
        .map(|((jacobian_block, weight_block), residual_block)| {
            let mut sums = [0.0; NB_SUMS];
            for (jacobian, &weight, &residual) in
                izip!(jacobian_block, weight_block, residual_block)
            {
                let mut index = 0;
                for j in 0..6 {
                    let weighted_j = weight * jacobian[j];
                    for i in j..6 {
                        sums[index] += weighted_j * jacobian[i];
                        index += 1;
                    }
                    sums[21 + j] += weighted_j * residual;
                }
            }
            sums
        })
        .collect();
    while partials.len() > 1 {
        partials = partials
            .par_chunks(BLOCK_SIZE)
            .map(|blocks| {
                let mut sums = [0.0; NB_SUMS];
                for block in blocks {
                    for (sum, value) in sums.iter_mut().zip(block.iter()) {
                        *sum += value;
                    }
                }
                sums
            })
            .collect();
    }
    let sums = partials.first().copied().unwrap_or([0.0; NB_SUMS]);

    // Unpack the triangle into a symmetric matrix.
    let mut a_mat = Mat6::zeros();
    let mut index = 0;
    for j in 0..6 {
        for i in j..6 {
            a_mat[(i, j)] = sums[index];
            a_mat[(j, i)] = sums[index];
            index += 1;
        }
    }
    let b_vec = Vec6::from_row_slice(&sums[21..]);
    (a_mat, b_vec)
}

// TESTS #############################################################
