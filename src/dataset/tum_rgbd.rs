//! Helper functions to handle datasets compatible with TUM RGB-D.

use std::fmt;
use std::path::PathBuf;

use crate::core::camera::Intrinsics;
use crate::misc::type_aliases::{Float, Iso3};

/// U16 depth values are scaled for better precision.
/// So 5000 in the 16 bits gray png corresponds to 1 meter.
pub const DEPTH_SCALE: Float = 5000.0;

/// Intrinsics parameters of the ICL-NUIM dataset.
pub const INTRINSICS_ICL_NUIM: Intrinsics = Intrinsics {
    fx: 481.20,
    fy: -480.00,
    cx: 319.5,
    cy: 239.5,
};

/// Intrinsics parameters of freiburg 1 (fr1) scenes in the TUM RGB-D dataset.
pub const INTRINSICS_FR1: Intrinsics = Intrinsics {
    fx: 517.306408,
    fy: 516.469215,
    cx: 318.643040,
    cy: 255.313989,
};

/// Intrinsics parameters of freiburg 2 (fr2) scenes in the TUM RGB-D dataset.
pub const INTRINSICS_FR2: Intrinsics = Intrinsics {
    fx: 520.908620,
    fy: 521.007327,
    cx: 325.141442,
    cy: 249.701764,
};

/// Intrinsics parameters of freiburg 3 (fr3) scenes in the TUM RGB-D dataset.
pub const INTRINSICS_FR3: Intrinsics = Intrinsics {
    fx: 535.433105,
    fy: 539.212524,
    cx: 320.106653,
    cy: 247.632132,
};

/// Timestamp and 3D camera pose of a frame.
#[derive(Debug)]
pub struct Frame {
    pub timestamp: f64,
    pub pose: Iso3,
}

/// Association of two related depth and color timestamps and images file paths.
#[derive(Debug, PartialEq, Clone)]
pub struct Association {
    pub depth_timestamp: f64,
    pub depth_file_path: PathBuf,
    pub color_timestamp: f64,
    pub color_file_path: PathBuf,
}

/// Write Frame data in the TUM RGB-D format for trajectories:
/// `timestamp tx ty tz qx qy qz qw`.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let t = self.pose.translation.vector;
        let q = self.pose.rotation.into_inner().coords;
        write!(
            f,
            "{} {} {} {} {} {} {} {}",
            self.timestamp, t.x, t.y, t.z, q.x, q.y, q.z, q.w
        )
    }
}

/// Parse useful files (associations, ...) in a dataset using the TUM RGB-D format.
pub mod parse {
    use super::Association;
    use nom::{
        branch::alt,
        bytes::complete::{is_not, tag},
        character::complete::space1,
        combinator::{map, rest, value},
        number::complete::double,
        sequence::{preceded, tuple},
        IResult,
    };
    use std::path::PathBuf;

    /// Parse an association file into a vector of `Association`.
    pub fn associations(file_content: &str) -> Result<Vec<Association>, String> {
        let mut vec_data = Vec::new();
        for line in file_content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match association_line(line) {
                Ok((_, Some(data))) => vec_data.push(data),
                Ok(_) => (),
                Err(_) => return Err(format!("Failed to parse association line: {}", line)),
            }
        }
        Ok(vec_data)
    }

    // nom parsers #############################################################

    // Association line is either a comment or two timestamps and file paths.
    fn association_line(input: &str) -> IResult<&str, Option<Association>> {
        alt((value(None, comment), map(association, Some)))(input)
    }

    // Parse an association of depth and color timestamps and file paths.
    fn association(input: &str) -> IResult<&str, Association> {
        map(
            tuple((double, space1, path, space1, double, space1, path)),
            |(depth_timestamp, _, depth_file_path, _, color_timestamp, _, color_file_path)| {
                Association {
                    depth_timestamp,
                    depth_file_path,
                    color_timestamp,
                    color_file_path,
                }
            },
        )(input)
    }

    fn path(input: &str) -> IResult<&str, PathBuf> {
        map(is_not(" \t\r\n"), PathBuf::from)(input)
    }

    // Parse a comment.
    fn comment(input: &str) -> IResult<&str, &str> {
        preceded(tag("#"), rest)(input)
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use nalgebra::{Quaternion, Translation3, UnitQuaternion};

    #[test]
    fn parse_associations_skips_comments() {
        let content = "# depth and color associations\n\
                       1.0 depth/1.png 1.01 rgb/1.png\n\
                       2.0 depth/2.png 2.01 rgb/2.png\n";
        let associations = parse::associations(content).unwrap();
        assert_eq!(2, associations.len());
        assert_eq!(
            Association {
                depth_timestamp: 1.0,
                depth_file_path: PathBuf::from("depth/1.png"),
                color_timestamp: 1.01,
                color_file_path: PathBuf::from("rgb/1.png"),
            },
            associations[0]
        );
    }

    #[test]
    fn parse_associations_rejects_malformed_lines() {
        assert!(parse::associations("1.0 depth/1.png").is_err());
    }

    #[test]
    fn frame_displays_in_tum_format() {
        let frame = Frame {
            timestamp: 42.5,
            pose: Iso3::from_parts(
                Translation3::new(1.0, 2.0, 3.0),
                UnitQuaternion::from_quaternion(Quaternion::new(1.0, 0.0, 0.0, 0.0)),
            ),
        };
        assert_eq!("42.5 1 2 3 0 0 0 1", frame.to_string());
    }
}
