use glam::{DMat3, DMat4, DVec3, DVec4};

use crate::transforms::{axis_angle_to_rotation_matrix, rotation_matrix_to_axis_angle};

/// Error types for pose algebra.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoseError {
    /// The rotation block of a pose is not orthonormal with determinant one.
    #[error("Rotation is not orthonormal (tolerance {0})")]
    InvalidRotation(f64),

    /// The last row of the homogeneous matrix is not `[0, 0, 0, 1]`.
    #[error("Homogeneous row must be [0, 0, 0, 1], got {0:?}")]
    InvalidHomogeneousRow([f64; 4]),

    /// A quaternion with zero norm cannot describe a rotation.
    #[error("Degenerate quaternion {0:?}")]
    DegenerateQuaternion([f64; 4]),

    /// A vector with zero magnitude cannot be normalized.
    #[error("Cannot normalize a zero-length vector")]
    ZeroLengthVector,
}

/// A rigid transform stored as a 4x4 homogeneous matrix `[R | t; 0 0 0 1]`.
///
/// The rotation block is orthonormal with determinant one. Poses built through the
/// constructors of this type hold that by construction; [`Pose::from_matrix`] checks it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose(DMat4);

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// The identity transform.
    pub const IDENTITY: Self = Self(DMat4::IDENTITY);

    /// Tolerance used by [`Pose::from_matrix`].
    pub const DEFAULT_TOLERANCE: f64 = 1e-6;

    /// Compose a pose from a rotation matrix and a translation.
    ///
    /// The rotation is stored as given; use [`Pose::is_valid`] to check caller input.
    ///
    /// ```
    /// use glam::{DMat3, DVec3};
    /// use recon_3d::pose::Pose;
    ///
    /// let rotation = DMat3::from_rotation_y(0.3);
    /// let translation = DVec3::new(1.0, 2.0, 3.0);
    /// let pose = Pose::from_rotation_translation(&rotation, translation);
    ///
    /// assert_eq!(pose.rotation(), rotation);
    /// assert_eq!(pose.translation(), translation);
    /// ```
    pub fn from_rotation_translation(rotation: &DMat3, translation: DVec3) -> Self {
        Self(DMat4::from_cols(
            rotation.x_axis.extend(0.0),
            rotation.y_axis.extend(0.0),
            rotation.z_axis.extend(0.0),
            translation.extend(1.0),
        ))
    }

    /// Wrap a homogeneous matrix, checking the rotation block and the last row.
    pub fn from_matrix(matrix: DMat4) -> Result<Self, PoseError> {
        let row = matrix.row(3);
        if row != DVec4::W {
            return Err(PoseError::InvalidHomogeneousRow(row.to_array()));
        }
        let pose = Self(matrix);
        if !pose.is_valid(Self::DEFAULT_TOLERANCE) {
            return Err(PoseError::InvalidRotation(Self::DEFAULT_TOLERANCE));
        }
        Ok(pose)
    }

    /// Compose a pose from axis-angle (Rodrigues) and translation vectors.
    pub fn from_vectors(rvec: DVec3, tvec: DVec3) -> Self {
        Self::from_rotation_translation(&axis_angle_to_rotation_matrix(rvec), tvec)
    }

    /// Decompose the pose into axis-angle (Rodrigues) and translation vectors.
    pub fn to_vectors(&self) -> (DVec3, DVec3) {
        (
            rotation_matrix_to_axis_angle(&self.rotation()),
            self.translation(),
        )
    }

    /// The 4x4 homogeneous matrix.
    pub fn matrix(&self) -> &DMat4 {
        &self.0
    }

    /// The 3x3 rotation block.
    pub fn rotation(&self) -> DMat3 {
        DMat3::from_mat4(self.0)
    }

    /// The translation column.
    pub fn translation(&self) -> DVec3 {
        self.0.w_axis.truncate()
    }

    /// Apply the rotation and the translation to a point.
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.0.transform_point3(point)
    }

    /// The inverse transform `[R^T | -R^T t]`.
    pub fn inverse(&self) -> Self {
        let rotation_t = self.rotation().transpose();
        Self::from_rotation_translation(&rotation_t, -(rotation_t * self.translation()))
    }

    /// The pose that applies `other` first and then `self`.
    pub fn compose(&self, other: &Pose) -> Self {
        Self(self.0 * other.0)
    }

    /// Whether the rotation block is orthonormal with determinant one within `tolerance`.
    pub fn is_valid(&self, tolerance: f64) -> bool {
        let rotation = self.rotation();
        let gram = rotation.transpose() * rotation;
        gram.abs_diff_eq(DMat3::IDENTITY, tolerance)
            && (rotation.determinant() - 1.0).abs() <= tolerance
            && self.0.row(3) == DVec4::W
    }
}

impl From<Pose> for DMat4 {
    fn from(pose: Pose) -> Self {
        pose.0
    }
}
