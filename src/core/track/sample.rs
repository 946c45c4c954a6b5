//! Bilinear sampling of image buffers at fractional pixel coordinates.

use nalgebra::DMatrix;

use crate::misc::type_aliases::Float;

/// Bilinear interpolation of `image` at `(u, v)`.
///
/// Coordinates must lie inside `[0, W-1] x [0, H-1]`;
/// the neighbour lookups clamp to the border, like a clamped texture fetch,
/// so coordinates exactly on the last row or column stay well defined.
pub fn bilinear(image: &DMatrix<Float>, u: Float, v: Float) -> Float {
    let (nb_rows, nb_cols) = image.shape();
    let u_0 = (u.floor() as usize).min(nb_cols.saturating_sub(2));
    let v_0 = (v.floor() as usize).min(nb_rows.saturating_sub(2));
    let u_1 = (u_0 + 1).min(nb_cols - 1);
    let v_1 = (v_0 + 1).min(nb_rows - 1);
    let a = u - u_0 as Float;
    let b = v - v_0 as Float;
    let vu_00 = image[(v_0, u_0)];
    let vu_10 = image[(v_1, u_0)];
    let vu_01 = image[(v_0, u_1)];
    let vu_11 = image[(v_1, u_1)];
    (1.0 - b) * (1.0 - a) * vu_00 + b * (1.0 - a) * vu_10 + (1.0 - b) * a * vu_01 + b * a * vu_11
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_relative_eq;

    fn image() -> DMatrix<Float> {
        DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 3.0])
    }

    #[test]
    fn exact_pixel_coordinates() {
        let img = image();
        assert_relative_eq!(bilinear(&img, 0.0, 0.0), 0.0);
        assert_relative_eq!(bilinear(&img, 1.0, 0.0), 1.0);
        assert_relative_eq!(bilinear(&img, 0.0, 1.0), 2.0);
        assert_relative_eq!(bilinear(&img, 1.0, 1.0), 3.0);
    }

    #[test]
    fn fractional_coordinates_interpolate() {
        let img = image();
        assert_relative_eq!(bilinear(&img, 0.5, 0.0), 0.5);
        assert_relative_eq!(bilinear(&img, 0.0, 0.5), 1.0);
        assert_relative_eq!(bilinear(&img, 0.5, 0.5), 1.5);
    }

    #[test]
    fn last_row_and_column_are_reachable() {
        let img = DMatrix::from_row_slice(3, 3, &[0.0; 9]);
        assert_relative_eq!(bilinear(&img, 2.0, 2.0), 0.0);
    }

    #[test]
    fn single_pixel_image() {
        let img = DMatrix::from_element(1, 1, 0.4);
        assert_relative_eq!(bilinear(&img, 0.0, 0.0), 0.4);
    }
}
