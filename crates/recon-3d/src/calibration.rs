use glam::DMat4;
use recon_image::ImageSize;
use serde::{Deserialize, Serialize};

use crate::camera::{CameraError, PinholeCamera};
use crate::linalg::{mat3_from_rows, mat4_from_rows};
use crate::pose::{Pose, PoseError};

/// Calibration of a stereo pair, as supplied by an external calibration tool.
///
/// Matrices are stored row-major so the record reads naturally as JSON:
///
/// ```json
/// {
///   "camera1": [[fx, 0, cx], [0, fy, cy], [0, 0, 1]],
///   "distortion1": [k1, k2, p1, p2],
///   "camera2": [[...], [...], [...]],
///   "distortion2": [...],
///   "pose": [[r00, r01, r02, tx], [...], [...], [0, 0, 0, 1]],
///   "image_size1": [width, height],
///   "image_size2": [width, height]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StereoCalibration {
    /// Intrinsic matrix of the first camera.
    pub camera1: [[f64; 3]; 3],
    /// Distortion coefficients of the first camera.
    pub distortion1: Vec<f64>,
    /// Intrinsic matrix of the second camera.
    pub camera2: [[f64; 3]; 3],
    /// Distortion coefficients of the second camera.
    pub distortion2: Vec<f64>,
    /// Pose of the second camera relative to the first.
    pub pose: [[f64; 4]; 4],
    /// Image size of the first camera as `[width, height]`.
    pub image_size1: [usize; 2],
    /// Image size of the second camera as `[width, height]`.
    pub image_size2: [usize; 2],
}

impl StereoCalibration {
    /// The first camera's intrinsics.
    pub fn camera1(&self) -> Result<PinholeCamera, CameraError> {
        PinholeCamera::from_matrix(&mat3_from_rows(&self.camera1))
    }

    /// The second camera's intrinsics.
    pub fn camera2(&self) -> Result<PinholeCamera, CameraError> {
        PinholeCamera::from_matrix(&mat3_from_rows(&self.camera2))
    }

    /// The relative pose, checked for a valid rotation block.
    pub fn pose(&self) -> Result<Pose, PoseError> {
        let matrix: DMat4 = mat4_from_rows(&self.pose);
        Pose::from_matrix(matrix)
    }

    /// The first image size.
    pub fn image_size1(&self) -> ImageSize {
        self.image_size1.into()
    }

    /// The second image size.
    pub fn image_size2(&self) -> ImageSize {
        self.image_size2.into()
    }
}
