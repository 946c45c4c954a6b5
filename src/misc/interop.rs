// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between the image and matrix types.

use image::GrayImage;
use nalgebra::DMatrix;

use crate::misc::type_aliases::Float;

/// Convert a `GrayImage` into an `u8` matrix.
///
/// Performs a transposition to accomodate for the
/// row major image into the column major matrix.
pub fn matrix_from_image(img: GrayImage) -> DMatrix<u8> {
    let (width, height) = img.dimensions();
    DMatrix::from_row_slice(height as usize, width as usize, &img.into_raw())
}

/// Convert a `GrayImage` into a matrix of intensities in [0, 1].
pub fn intensity_matrix_from_image(img: GrayImage) -> DMatrix<Float> {
    matrix_from_image(img).map(|intensity| Float::from(intensity) / 255.0)
}

// TESTS #############################################################
