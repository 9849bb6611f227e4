#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the io module.
pub mod error;

/// Stereo and depth frame loading.
pub mod frame;

/// PNG image encoding and decoding.
pub mod png;

/// Stereo calibration files.
pub mod calibration;

pub use error::IoError;
