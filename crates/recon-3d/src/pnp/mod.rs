//! Perspective-n-Point (PnP) solvers and robust pose estimation.

/// Direct linear transform solver.
pub mod dlt;

/// RANSAC for robust PnP pose estimation.
pub mod ransac;

/// LM-based pose refinement.
pub mod refine;

mod ops;

use glam::{DMat3, DVec3};
use thiserror::Error;

use crate::pose::Pose;

pub use dlt::solve_pnp_dlt;
pub use ransac::{solve_pnp_ransac, PnPRansacParams, PnPRansacResult};
pub use refine::{refine_pose_lm, LMRefineParams};

/// Error types for PnP solvers.
#[derive(Debug, Error, PartialEq)]
pub enum PnPError {
    /// Invalid input data - insufficient correspondences for the specific solver.
    #[error("PnP solver requires at least {required} 2D-3D correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences required by the solver.
        required: usize,
        /// Actual number of correspondences provided.
        actual: usize,
    },

    /// Invalid input data - mismatched array lengths with descriptive labels.
    #[error("Mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    MismatchedArrayLengths {
        /// Label for the left-hand slice.
        left_name: &'static str,
        /// Length of the left-hand slice.
        left_len: usize,
        /// Label for the right-hand slice.
        right_name: &'static str,
        /// Length of the right-hand slice.
        right_len: usize,
    },

    /// RANSAC could not find a model supported by enough correspondences.
    #[error("RANSAC found {actual} inliers, at least {required} are required")]
    InsufficientInliers {
        /// Minimum number of inliers required.
        required: usize,
        /// Number of inliers of the best model.
        actual: usize,
    },

    /// Singular value decomposition failed.
    #[error("SVD computation failed: {0}")]
    SvdFailed(String),

    /// The correspondences do not determine a pose.
    #[error("Degenerate configuration: {0}")]
    DegenerateConfiguration(String),
}

/// Result returned by any PnP solver.
///
/// The rotation matrix maps coordinates from the **world** frame to the
/// **camera** frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PnPResult {
    /// Estimated rotation matrix.
    pub rotation: DMat3,
    /// Estimated translation vector.
    pub translation: DVec3,
    /// Rodrigues axis-angle representation of the rotation.
    pub rvec: DVec3,
    /// Root-mean-square reprojection error in pixels (if computed).
    pub reproj_rmse: Option<f64>,
    /// Number of iterations taken (if applicable).
    pub num_iterations: Option<usize>,
    /// Whether the solver converged (if applicable).
    pub converged: Option<bool>,
}

impl PnPResult {
    /// The estimated world to camera transform.
    pub fn pose(&self) -> Pose {
        Pose::from_rotation_translation(&self.rotation, self.translation)
    }
}
