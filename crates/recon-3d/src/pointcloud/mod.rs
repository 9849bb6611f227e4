use glam::DVec3;
use recon_image::ImageError;

use crate::pose::Pose;

mod color;
pub use color::*;

mod render;
pub use render::*;

/// Error types for the point cloud module.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// The sampling step must be at least one pixel.
    #[error("Sample step must be positive")]
    ZeroStep,

    /// The color and depth images do not cover the same grid.
    #[error("Color image size {0} does not match depth image size {1}")]
    SizeMismatch(recon_image::ImageSize, recon_image::ImageSize),

    /// Error from the underlying image buffer.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error writing the cloud to disk.
    #[error(transparent)]
    Ply(#[from] crate::io::ply::PlyError),
}

/// A sparse point cloud with points and optional per-point colors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<DVec3>,
    // The colors of the points.
    colors: Option<Vec<[u8; 3]>>,
}

impl PointCloud {
    /// Create a new point cloud from points and colors (optional).
    pub fn new(points: Vec<DVec3>, colors: Option<Vec<[u8; 3]>>) -> Self {
        Self { points, colors }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    /// Get as reference the colors of the points in the point cloud.
    pub fn colors(&self) -> Option<&[[u8; 3]]> {
        self.colors.as_deref()
    }

    /// The axis aligned bounding box as `(min, max)`, or `None` for an empty cloud.
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let first = *self.points.first()?;
        Some(
            self.points
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }

    /// Apply a rigid transform to every point, keeping the colors.
    pub fn transform(&self, pose: &Pose) -> Self {
        Self {
            points: crate::camera::transform_points(pose, &self.points),
            colors: self.colors.clone(),
        }
    }
}
