#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! The pipeline: load a stereo or RGB-D frame with [`io`], pick features and match them
//! across views with [`matching`], estimate the relative pose, then build, transform and
//! export a colored cloud with [`k3d`].

#[doc(inline)]
pub use recon_image as image;

#[doc(inline)]
pub use recon_imgproc as imgproc;

#[doc(inline)]
pub use recon_io as io;

#[doc(inline)]
pub use recon_3d as k3d;

#[doc(inline)]
pub use recon_matching as matching;
