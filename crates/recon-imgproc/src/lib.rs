#![deny(missing_docs)]
//! Image processing operations for the reconstruction pipeline.

/// color transformations module.
pub mod color;

/// feature detection module.
pub mod features;

/// image gradient operations module.
pub mod filter;

/// utilities for interpolation.
pub mod interpolation;

/// sparse optical flow module.
pub mod optical_flow;

/// polygon approximation module.
pub mod polygon;

/// image pyramid module.
pub mod pyramid;
