//! Centered image derivatives, one-sided on the borders.

use nalgebra::DMatrix;

use crate::misc::type_aliases::Float;

/// Compute horizontal and vertical intensity derivatives into `grad_x` and `grad_y`.
///
/// Interior pixels get centered differences `(I[x+1] - I[x-1]) / 2`,
/// border pixels one-sided differences.
/// All three matrices must have the same shape.
pub fn centered_into(gray: &DMatrix<Float>, grad_x: &mut DMatrix<Float>, grad_y: &mut DMatrix<Float>) {
    debug_assert_eq!(gray.shape(), grad_x.shape());
    debug_assert_eq!(gray.shape(), grad_y.shape());
    let (nb_rows, nb_cols) = gray.shape();
    for x in 0..nb_cols {
        let left = if x == 0 { 0 } else { x - 1 };
        let right = if x + 1 == nb_cols { x } else { x + 1 };
        let x_scale = if right == left + 2 { 0.5 } else { 1.0 };
        for y in 0..nb_rows {
            let top = if y == 0 { 0 } else { y - 1 };
            let bottom = if y + 1 == nb_rows { y } else { y + 1 };
            let y_scale = if bottom == top + 2 { 0.5 } else { 1.0 };
            grad_x[(y, x)] = x_scale * (gray[(y, right)] - gray[(y, left)]);
            grad_y[(y, x)] = y_scale * (gray[(bottom, x)] - gray[(top, x)]);
        }
    }
}

// TESTS #############################################################
