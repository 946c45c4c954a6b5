// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions for reading dataset images.

use byteorder::{BigEndian, ReadBytesExt};
use nalgebra::DMatrix;
use std::{fs::File, io::Cursor, path::Path};

use crate::misc::type_aliases::Float;

/// Read a 16 bits PNG depth image into its dimensions and raw `u16` buffer.
pub fn read_png_16bits<P: AsRef<Path>>(
    file_path: P,
) -> Result<(usize, usize, Vec<u16>), png::DecodingError> {
    let mut decoder = png::Decoder::new(File::open(file_path)?);
    // Use the IDENTITY transformation because by default
    // it will use STRIP_16 which only keeps 8 bits.
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer)?;

    // Transform the buffer into a 16 bits slice (PNG stores big endian).
    let mut buffer_u16 = vec![0; (info.width * info.height) as usize];
    let mut buffer_cursor = Cursor::new(buffer);
    buffer_cursor.read_u16_into::<BigEndian>(&mut buffer_u16)?;

    Ok((info.width as usize, info.height as usize, buffer_u16))
}

/// Convert a raw `u16` depth buffer into a matrix of meters,
/// with the given scale (e.g. 5000 for TUM RGB-D). Zero stays invalid.
pub fn depth_meters_from_u16(
    width: usize,
    height: usize,
    buffer: &[u16],
    depth_scale: Float,
) -> DMatrix<Float> {
    DMatrix::from_row_slice(height, width, buffer).map(|d| Float::from(d) / depth_scale)
}

// TESTS #############################################################
