use super::{FeatureError, Keypoint};
use recon_image::Image;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Parameters of the FAST corner detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastParams {
    /// Minimum intensity difference to the center pixel.
    pub threshold: u8,
    /// Number of contiguous circle pixels that must be brighter or darker than the center.
    pub arc_length: u8,
    /// Keep only the local maxima of the score in a 3x3 neighbourhood.
    pub nonmax_suppression: bool,
}

impl Default for FastParams {
    fn default() -> Self {
        Self {
            threshold: 10,
            arc_length: 9,
            nonmax_suppression: true,
        }
    }
}

// Structure to represent a feature point with its score and coordinates. Useful for NMS.
#[derive(Copy, Clone, Eq, PartialEq)]
struct FeaturePoint {
    score: i32,
    x: usize,
    y: usize,
}

impl Ord for FeaturePoint {
    fn cmp(&self, other: &Self) -> Ordering {
        // equal scores pop in raster order
        self.score
            .cmp(&other.score)
            .then_with(|| other.y.cmp(&self.y))
            .then_with(|| other.x.cmp(&self.x))
    }
}

impl PartialOrd for FeaturePoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Offsets (dx, dy) of the 16 pixels of the Bresenham circle of radius 3.
const CIRCLE: [(isize, isize); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Calculate the FAST corner score for a pixel using the Sum of Absolute Differences (SAD)
/// over the first qualifying arc.
///
/// Returns `None` when the pixel is not a corner. The caller guarantees a 3 pixel margin.
fn fast_corner_score(
    src: &[u8],
    cols: usize,
    x: usize,
    y: usize,
    threshold: u8,
    arc_length: u8,
) -> Option<i32> {
    let center_pixel = src[y * cols + x];
    let lower_threshold = center_pixel.saturating_sub(threshold);
    let upper_threshold = center_pixel.saturating_add(threshold);

    let mut pixels = [0u8; 16];
    for (pixel, (dx, dy)) in pixels.iter_mut().zip(CIRCLE) {
        let px = (x as isize + dx) as usize;
        let py = (y as isize + dy) as usize;
        *pixel = src[py * cols + px];
    }

    // Fast rejection test: at least 2 of the 4 compass points must differ the same way.
    if arc_length >= 9 {
        let compass = [pixels[0], pixels[4], pixels[8], pixels[12]];
        let brighter = compass.iter().filter(|&&p| p > upper_threshold).count();
        let darker = compass.iter().filter(|&&p| p < lower_threshold).count();
        if brighter < 2 && darker < 2 {
            return None;
        }
    }

    // Use a bitmask of size 16, and rotate the arc window around it.
    let mut bright_bitmask = 0u16;
    let mut dark_bitmask = 0u16;
    for (i, &val) in pixels.iter().enumerate() {
        if val > upper_threshold {
            bright_bitmask |= 1 << i;
        }
        if val < lower_threshold {
            dark_bitmask |= 1 << i;
        }
    }

    let window_mask = if arc_length >= 16 {
        u16::MAX
    } else {
        (1u16 << arc_length) - 1
    };

    let shift = (0..16u32).find(|&shift| {
        let curr_window_mask = window_mask.rotate_left(shift);
        bright_bitmask & curr_window_mask == curr_window_mask
            || dark_bitmask & curr_window_mask == curr_window_mask
    })? as usize;

    // Sum of absolute differences for the corner score.
    let score = (shift..shift + arc_length as usize)
        .map(|offset| {
            let pixel = pixels[offset % 16];
            (center_pixel.abs_diff(pixel) - threshold) as i32
        })
        .sum();

    Some(score)
}

/// FAST feature detector with optional Non-Maximum Suppression (NMS).
///
/// # Arguments
///
/// * `src` - The source image as Gray8 image.
/// * `params` - The detector parameters.
///
/// # Returns
///
/// The detected keypoints with their SAD score as response, in raster order when NMS is
/// disabled and in decreasing score order otherwise.
pub fn fast_feature_detector(
    src: &Image<u8, 1>,
    params: &FastParams,
) -> Result<Vec<Keypoint>, FeatureError> {
    if params.arc_length == 0 || params.arc_length > 16 {
        return Err(FeatureError::InvalidArcLength(params.arc_length));
    }

    let (cols, rows) = (src.cols(), src.rows());
    if cols < 7 || rows < 7 {
        return Ok(Vec::new());
    }

    let data = src.as_slice();
    let mut candidates = Vec::new();
    for y in 3..rows - 3 {
        for x in 3..cols - 3 {
            if let Some(score) =
                fast_corner_score(data, cols, x, y, params.threshold, params.arc_length)
            {
                candidates.push(FeaturePoint { score, x, y });
            }
        }
    }

    let to_keypoint = |p: FeaturePoint| Keypoint {
        x: p.x as f32,
        y: p.y as f32,
        response: p.score as f32,
    };

    // Exit early if NMS disabled
    if !params.nonmax_suppression {
        return Ok(candidates.into_iter().map(to_keypoint).collect());
    }

    let mut heap = BinaryHeap::from(candidates);
    let mut ignore_map = vec![false; rows * cols];
    let mut keypoints = Vec::new();

    while let Some(point) = heap.pop() {
        let idx = point.y * cols + point.x;
        if ignore_map[idx] {
            continue; // This point has been suppressed
        }

        keypoints.push(to_keypoint(point));

        // candidates keep a 3 pixel margin, so the neighbourhood is always in bounds
        for ny in point.y - 1..=point.y + 1 {
            for nx in point.x - 1..=point.x + 1 {
                ignore_map[ny * cols + nx] = true;
            }
        }
    }

    Ok(keypoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_image::{ImageError, ImageSize};

    fn bright_square() -> Result<Image<u8, 1>, ImageError> {
        // dark background with a bright 6x6 square in the middle
        let size = ImageSize {
            width: 20,
            height: 20,
        };
        let mut image = Image::<u8, 1>::from_size_val(size, 10)?;
        for y in 7..13 {
            for x in 7..13 {
                image.set_pixel(x, y, 0, 200)?;
            }
        }
        Ok(image)
    }

    #[test]
    fn test_fast_flat_image() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::<u8, 1>::from_size_val([16, 16].into(), 50)?;
        let keypoints = fast_feature_detector(&image, &FastParams::default())?;
        assert!(keypoints.is_empty());
        Ok(())
    }

    #[test]
    fn test_fast_square_corners() -> Result<(), Box<dyn std::error::Error>> {
        let image = bright_square()?;
        let keypoints = fast_feature_detector(&image, &FastParams::default())?;

        assert!(!keypoints.is_empty());
        // every corner of the square has a detection close to it
        for (cx, cy) in [(7.0, 7.0), (12.0, 7.0), (7.0, 12.0), (12.0, 12.0)] {
            assert!(keypoints
                .iter()
                .any(|kp| (kp.x - cx).abs() <= 1.0 && (kp.y - cy).abs() <= 1.0));
        }
        for kp in &keypoints {
            assert!(kp.response > 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_fast_nms_reduces() -> Result<(), Box<dyn std::error::Error>> {
        let image = bright_square()?;
        let params = FastParams {
            nonmax_suppression: false,
            ..Default::default()
        };
        let all = fast_feature_detector(&image, &params)?;
        let suppressed = fast_feature_detector(&image, &FastParams::default())?;
        assert!(suppressed.len() <= all.len());

        // no two survivors are 8-connected neighbours
        for (i, a) in suppressed.iter().enumerate() {
            for b in suppressed.iter().skip(i + 1) {
                assert!((a.x - b.x).abs() > 1.0 || (a.y - b.y).abs() > 1.0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_fast_invalid_arc() -> Result<(), Box<dyn std::error::Error>> {
        let image = Image::<u8, 1>::from_size_val([16, 16].into(), 50)?;
        let params = FastParams {
            arc_length: 17,
            ..Default::default()
        };
        assert_eq!(
            fast_feature_detector(&image, &params),
            Err(FeatureError::InvalidArcLength(17))
        );
        let params = FastParams {
            arc_length: 0,
            ..Default::default()
        };
        assert_eq!(
            fast_feature_detector(&image, &params).map_err(|e| e.to_string()),
            Err("FAST arc length must be in 1..=16, got 0".to_string())
        );
        Ok(())
    }
}
