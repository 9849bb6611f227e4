use std::collections::BTreeMap;

use glam::DVec2;
use recon_image::Image;
use recon_imgproc::features::{fast_feature_detector, FastParams, Keypoint};

use crate::MatchingError;

/// Detect FAST keypoints and keep the strongest one per `block_size` grid cell.
///
/// A keypoint at `(x, y)` falls in the cell `floor(x / block_size) + floor(y / block_size) * width`.
/// Within a cell the keypoint with the highest response wins; on equal responses the first
/// detected one is kept. The result is ordered by cell index.
///
/// # Arguments
///
/// * `image` - The grayscale image.
/// * `block_size` - Side of the deduplication cell in pixels.
/// * `params` - The FAST detector parameters.
pub fn find_features(
    image: &Image<u8, 1>,
    block_size: usize,
    params: &FastParams,
) -> Result<Vec<DVec2>, MatchingError> {
    if block_size == 0 {
        return Err(MatchingError::InvalidBlockSize);
    }

    let keypoints = fast_feature_detector(image, params)?;
    let detected = keypoints.len();

    let mut cells: BTreeMap<usize, Keypoint> = BTreeMap::new();
    for keypoint in keypoints {
        let key = cell_index(&keypoint, block_size, image.width());
        match cells.get(&key) {
            Some(best) if best.response >= keypoint.response => {}
            _ => {
                cells.insert(key, keypoint);
            }
        }
    }

    log::debug!(
        "find features: {detected} detected, {} after deduplication",
        cells.len()
    );

    Ok(cells
        .into_values()
        .map(|k| DVec2::new(k.x as f64, k.y as f64))
        .collect())
}

fn cell_index(keypoint: &Keypoint, block_size: usize, width: usize) -> usize {
    let x = (keypoint.x / block_size as f32).floor() as usize;
    let y = (keypoint.y / block_size as f32).floor() as usize;
    x + y * width
}
