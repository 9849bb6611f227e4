mod error;
pub use error::FeatureError;

mod fast;
pub use fast::*;

/// A detected interest point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// Column of the keypoint.
    pub x: f32,
    /// Row of the keypoint.
    pub y: f32,
    /// Detector response, higher is stronger.
    pub response: f32,
}
