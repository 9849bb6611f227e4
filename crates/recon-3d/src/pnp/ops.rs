use glam::{DMat3, DVec2, DVec3};

use super::PnPError;
use crate::camera::PinholeCamera;

pub(crate) fn check_correspondences(
    world: &[DVec3],
    image: &[DVec2],
    required: usize,
) -> Result<(), PnPError> {
    if world.len() != image.len() {
        return Err(PnPError::MismatchedArrayLengths {
            left_name: "world points",
            left_len: world.len(),
            right_name: "image points",
            right_len: image.len(),
        });
    }
    if world.len() < required {
        return Err(PnPError::InsufficientCorrespondences {
            required,
            actual: world.len(),
        });
    }
    Ok(())
}

/// Squared pixel reprojection error of one correspondence; infinite behind the camera.
pub(crate) fn reprojection_error_sq(
    camera: &PinholeCamera,
    rotation: &DMat3,
    translation: DVec3,
    world: DVec3,
    image: DVec2,
) -> f64 {
    let pc = *rotation * world + translation;
    if pc.z <= f64::EPSILON {
        return f64::INFINITY;
    }
    camera.project(pc).distance_squared(image)
}

/// Root-mean-square reprojection error over the selected correspondences.
pub(crate) fn reprojection_rmse(
    camera: &PinholeCamera,
    rotation: &DMat3,
    translation: DVec3,
    world: &[DVec3],
    image: &[DVec2],
    indices: impl ExactSizeIterator<Item = usize>,
) -> f64 {
    let count = indices.len();
    if count == 0 {
        return 0.0;
    }
    let sum_sq: f64 = indices
        .map(|i| reprojection_error_sq(camera, rotation, translation, world[i], image[i]))
        .sum();
    (sum_sq / count as f64).sqrt()
}

/// Eight well spread points in front of the camera and their exact projections.
#[cfg(test)]
pub(crate) fn synthetic_scene(
    pose: &crate::pose::Pose,
    camera: &PinholeCamera,
) -> (Vec<DVec3>, Vec<DVec2>) {
    let world = vec![
        DVec3::new(-1.0, -0.5, 6.0),
        DVec3::new(1.2, -0.7, 5.5),
        DVec3::new(0.3, 0.9, 7.0),
        DVec3::new(-0.8, 1.1, 4.5),
        DVec3::new(0.9, 0.4, 8.0),
        DVec3::new(-0.2, -1.0, 6.5),
        DVec3::new(0.5, 0.1, 5.0),
        DVec3::new(-1.3, 0.2, 7.5),
    ];
    let image = world
        .iter()
        .map(|p| camera.project(pose.transform_point(*p)))
        .collect();
    (world, image)
}
