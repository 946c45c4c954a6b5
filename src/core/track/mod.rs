// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Dense photometric alignment of consecutive RGB-D frames.

pub mod gauss_newton;
pub mod jacobian;
pub mod reduction;
pub mod sample;
pub mod warp;
pub mod weights;
