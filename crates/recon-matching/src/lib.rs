#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//! The crate finds sparse correspondences between two views and turns them into a
//! relative camera pose, using a depth map of the first view.

mod error;
pub use error::MatchingError;

/// Spatially deduplicated keypoint detection.
pub mod features;

/// Optical flow matching with epipolar filtering.
pub mod matcher;

/// Scene points, pose estimation and pose error.
pub mod scene;

pub use features::find_features;
pub use matcher::{match_features, FeatureMatch, MatchParams};
pub use scene::{find_pose, find_pose_error, get_scene_points, SceneParams};
