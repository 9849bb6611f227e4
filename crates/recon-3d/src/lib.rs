#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Stereo calibration record.
pub mod calibration;

/// Pinhole camera model.
pub mod camera;

/// I/O utilities for reading and writing 3D data.
pub mod io;

/// Linear algebra utilities.
pub mod linalg;

/// Perspective-n-Point (PnP) solvers.
pub mod pnp;

/// Dense color clouds and sparse point clouds.
pub mod pointcloud;

/// Rigid poses and two-view geometry.
pub mod pose;

/// Seeded generators for synthetic test data.
pub mod random;

/// 3D transforms algorithms.
pub mod transforms;
