use recon_3d::pnp::PnPError;
use recon_3d::pose::FundamentalError;
use recon_image::ImageError;
use recon_imgproc::features::FeatureError;

/// An error type for the matching module.
#[derive(thiserror::Error, Debug)]
pub enum MatchingError {
    /// The deduplication block must be at least one pixel.
    #[error("Block size must be positive")]
    InvalidBlockSize,

    /// The two views do not have the same size.
    #[error("Image sizes differ: {0} != {1}")]
    ImageSizeMismatch(recon_image::ImageSize, recon_image::ImageSize),

    /// The scene and image point lists do not pair up.
    #[error("Mismatched correspondence lengths: {0} scene points, {1} image points")]
    MismatchedLengths(usize, usize),

    /// Error from an image operation.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error from the feature detector.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Error from the fundamental matrix fit.
    #[error(transparent)]
    Fundamental(#[from] FundamentalError),

    /// Error from the PnP solver.
    #[error(transparent)]
    PnP(#[from] PnPError),
}
