use std::path::Path;

use recon_image::Image;

use crate::{
    error::IoError,
    png::{read_image_png_mono16, read_image_png_rgb8},
};

/// The left and right color images of a stereo capture.
#[derive(Debug, Clone)]
pub struct StereoFrame {
    /// The left view.
    pub left: Image<u8, 3>,
    /// The right view, same size as `left`.
    pub right: Image<u8, 3>,
}

/// A color image with its registered depth map.
///
/// Depth values are in the units of the source file, typically millimetres;
/// zero marks a pixel without depth.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    /// The color view.
    pub color: Image<u8, 3>,
    /// The depth map, same size as `color`.
    pub depth: Image<f64, 1>,
}

/// Load a stereo pair from two rgb8 PNG files.
///
/// # Errors
///
/// Fails when either file cannot be decoded, or when the two images differ in size.
pub fn load_stereo_frame(
    left: impl AsRef<Path>,
    right: impl AsRef<Path>,
) -> Result<StereoFrame, IoError> {
    let left = read_image_png_rgb8(left)?;
    let right = read_image_png_rgb8(right)?;

    if left.size() != right.size() {
        return Err(IoError::FrameSizeMismatch(left.size(), right.size()));
    }

    log::debug!("loaded stereo frame ({})", left.size());

    Ok(StereoFrame { left, right })
}

/// Load a color image and a 16 bit depth map.
///
/// # Errors
///
/// Fails when either file cannot be decoded, or when the two images differ in size.
pub fn load_depth_frame(
    color: impl AsRef<Path>,
    depth: impl AsRef<Path>,
) -> Result<DepthFrame, IoError> {
    let color = read_image_png_rgb8(color)?;
    let depth = read_image_png_mono16(depth)?;

    if color.size() != depth.size() {
        return Err(IoError::FrameSizeMismatch(color.size(), depth.size()));
    }

    log::debug!("loaded depth frame ({})", color.size());

    Ok(DepthFrame {
        color,
        depth: depth.map(|&d| d as f64),
    })
}
