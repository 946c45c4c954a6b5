// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Track a TUM RGB-D compatible sequence and print the estimated
//! trajectory to stdout, one `timestamp tx ty tz qx qy qz qw` line per frame.

use nalgebra::DMatrix;
use std::{env, error::Error, fs, path::Path, path::PathBuf};

use direct_vo_rs::core::camera::Intrinsics;
use direct_vo_rs::core::track::gauss_newton::{AlignStatus, Config};
use direct_vo_rs::dataset::tum_rgbd;
use direct_vo_rs::math::se3;
use direct_vo_rs::misc::type_aliases::Float;
use direct_vo_rs::misc::{helper, interop};

const USAGE: &str = "Usage: ./dvors_track [fr1|fr2|fr3|icl] associations_file";

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if let Err(error) = run(&args) {
        eprintln!("{:?}", error);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    // Check that the arguments are correct.
    let valid_args = check_args(args)?;

    // Build a vector containing timestamps and full paths of images.
    let associations = parse_associations(&valid_args.associations_file_path)?;

    // Initialize the tracker with the first depth and color image.
    let (depth, gray) = read_images(&associations[0])?;
    let (height, width) = gray.shape();
    let config = Config::new(width, height, valid_args.intrinsics);
    let mut tracker = config.init(&gray, &depth)?;

    // Track every frame in the associations file.
    for association in associations.iter().skip(1) {
        let (depth, gray) = read_images(association)?;
        let (pose, status) = tracker.align(&gray, &depth);
        if status != AlignStatus::Ok {
            log::warn!(
                "degenerate alignment at timestamp {}",
                association.depth_timestamp
            );
        }

        // Print the frame pose to stdout.
        let frame = tum_rgbd::Frame {
            timestamp: association.depth_timestamp,
            pose: se3::isometry(pose),
        };
        println!("{}", frame);
    }

    Ok(())
}

struct Args {
    associations_file_path: PathBuf,
    intrinsics: Intrinsics,
}

/// Verify that command line arguments are correct.
fn check_args(args: &[String]) -> Result<Args, String> {
    if let [_, camera_id, associations_file_path_str] = args {
        let intrinsics = create_camera(camera_id)?;
        let associations_file_path = PathBuf::from(associations_file_path_str);
        if associations_file_path.is_file() {
            Ok(Args {
                intrinsics,
                associations_file_path,
            })
        } else {
            eprintln!("{}", USAGE);
            Err(format!(
                "The association file does not exist or is not reachable: {}",
                associations_file_path_str
            ))
        }
    } else {
        eprintln!("{}", USAGE);
        Err("Wrong number of arguments".to_string())
    }
}

/// Create camera depending on `camera_id` command line argument.
fn create_camera(camera_id: &str) -> Result<Intrinsics, String> {
    match camera_id {
        "fr1" => Ok(tum_rgbd::INTRINSICS_FR1),
        "fr2" => Ok(tum_rgbd::INTRINSICS_FR2),
        "fr3" => Ok(tum_rgbd::INTRINSICS_FR3),
        "icl" => Ok(tum_rgbd::INTRINSICS_ICL_NUIM),
        _ => {
            eprintln!("{}", USAGE);
            Err(format!("Unknown camera id: {}", camera_id))
        }
    }
}

/// Open an association file and parse it into a vector of Association.
fn parse_associations<P: AsRef<Path>>(
    file_path: P,
) -> Result<Vec<tum_rgbd::Association>, Box<dyn Error>> {
    let content = fs::read_to_string(&file_path)?;
    tum_rgbd::parse::associations(&content)
        .map(|v| v.iter().map(|a| abs_path(&file_path, a)).collect())
        .map_err(|s| s.into())
}

/// Transform relative images file paths into absolute ones.
fn abs_path<P: AsRef<Path>>(file_path: P, assoc: &tum_rgbd::Association) -> tum_rgbd::Association {
    let parent = file_path
        .as_ref()
        .parent()
        .expect("How can this have no parent");
    tum_rgbd::Association {
        depth_timestamp: assoc.depth_timestamp,
        depth_file_path: parent.join(&assoc.depth_file_path),
        color_timestamp: assoc.color_timestamp,
        color_file_path: parent.join(&assoc.color_file_path),
    }
}

/// Read a depth and gray image given by an association,
/// converted to meters and intensities in [0, 1].
fn read_images(
    assoc: &tum_rgbd::Association,
) -> Result<(DMatrix<Float>, DMatrix<Float>), Box<dyn Error>> {
    let (width, height, depth_u16) = helper::read_png_16bits(&assoc.depth_file_path)?;
    let depth = helper::depth_meters_from_u16(width, height, &depth_u16, tum_rgbd::DEPTH_SCALE);
    let gray =
        interop::intensity_matrix_from_image(image::open(&assoc.color_file_path)?.to_luma8());
    Ok((depth, gray))
}
