/// Errors related to feature detection.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    /// The FAST arc must cover between 1 and 16 circle pixels.
    #[error("FAST arc length must be in 1..=16, got {0}")]
    InvalidArcLength(u8),
}
