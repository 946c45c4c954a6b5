// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dense RGB-D visual odometry in Rust (dvors).
//!
//! The camera motion between two consecutive gray+depth frames is estimated
//! by direct photometric alignment: a Gauss-Newton minimisation of the
//! per-pixel intensity difference, run coarse to fine over an image pyramid.
//! The entry point is [`core::track::gauss_newton::Config`], which builds a
//! [`core::track::gauss_newton::Tracker`] from the first frame.

pub mod core;
pub mod dataset;
pub mod math;
pub mod misc;
