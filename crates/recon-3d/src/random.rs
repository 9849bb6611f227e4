//! Generators for synthetic cameras, poses and distortions.
//!
//! Every function takes the random generator from the caller, so a seeded
//! [`rand::rngs::StdRng`] gives reproducible data.

use std::ops::Range;

use glam::DVec3;
use rand::Rng;
use recon_image::ImageSize;

use crate::camera::{CameraError, PinholeCamera};
use crate::pose::Pose;
use crate::transforms::euler_to_rotation_matrix;

/// Draw a value uniformly from `range`.
///
/// An empty range (`start >= end`) returns `range.start`, so `a..a` is the constant `a`.
pub fn random_value(rng: &mut impl Rng, range: &Range<f64>) -> f64 {
    if range.is_empty() {
        return range.start;
    }
    rng.random_range(range.clone())
}

/// Generate a random camera for an image of the given size.
///
/// # Arguments
///
/// * `rng` - The random generator.
/// * `focal` - Range of the focal length in pixels.
/// * `image_size` - The image size; the principal point is drawn around its centre.
/// * `center_offset` - Range of the offset added to each principal point coordinate.
/// * `same_focal` - Use one focal length for both axes.
pub fn random_k_matrix(
    rng: &mut impl Rng,
    focal: &Range<f64>,
    image_size: ImageSize,
    center_offset: &Range<f64>,
    same_focal: bool,
) -> Result<PinholeCamera, CameraError> {
    let fx = random_value(rng, focal);
    let fy = if same_focal {
        fx
    } else {
        random_value(rng, focal)
    };
    let cx = image_size.width as f64 * 0.5 + random_value(rng, center_offset);
    let cy = image_size.height as f64 * 0.5 + random_value(rng, center_offset);
    PinholeCamera::new(fx, fy, cx, cy)
}

/// Generate a random pose from Euler angle ranges in degrees and translation ranges.
pub fn random_pose(
    rng: &mut impl Rng,
    rotation_deg: &[Range<f64>; 3],
    translation: &[Range<f64>; 3],
) -> Pose {
    let angles = [
        random_value(rng, &rotation_deg[0]),
        random_value(rng, &rotation_deg[1]),
        random_value(rng, &rotation_deg[2]),
    ];
    let t = DVec3::new(
        random_value(rng, &translation[0]),
        random_value(rng, &translation[1]),
        random_value(rng, &translation[2]),
    );
    Pose::from_rotation_translation(&euler_to_rotation_matrix(angles), t)
}

/// Generate random `[k1, k2, p1, p2]` distortion coefficients.
pub fn random_distortion(rng: &mut impl Rng, ranges: &[Range<f64>; 4]) -> [f64; 4] {
    [
        random_value(rng, &ranges[0]),
        random_value(rng, &ranges[1]),
        random_value(rng, &ranges[2]),
        random_value(rng, &ranges[3]),
    ]
}
