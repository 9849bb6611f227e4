use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use recon_3d::calibration::StereoCalibration;

use crate::error::IoError;

/// Read a stereo calibration from a JSON file.
///
/// The expected layout is described on [`StereoCalibration`].
pub fn load_stereo_calibration(file_path: impl AsRef<Path>) -> Result<StereoCalibration, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    let reader = BufReader::new(File::open(file_path)?);
    let calibration: StereoCalibration = serde_json::from_reader(reader)?;

    log::debug!("loaded stereo calibration from {}", file_path.display());

    Ok(calibration)
}

/// Write a stereo calibration as pretty-printed JSON.
pub fn write_stereo_calibration(
    file_path: impl AsRef<Path>,
    calibration: &StereoCalibration,
) -> Result<(), IoError> {
    let writer = BufWriter::new(File::create(file_path)?);
    serde_json::to_writer_pretty(writer, calibration)?;
    Ok(())
}
