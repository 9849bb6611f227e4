//! # Pose estimation
//!
//! Rigid poses and two-view geometry.
//!
//! - [`Pose`]: 4x4 homogeneous rigid transform `[R | t; 0 0 0 1]`
//! - [`fundamental`]: fundamental matrix (epipolar geometry in pixel space) and its robust
//!   least-median-of-squares fit

mod rigid;
pub use rigid::*;

mod fundamental;
pub use fundamental::*;
