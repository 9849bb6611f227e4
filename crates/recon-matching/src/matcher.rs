use glam::DVec2;
use recon_3d::pose::{find_fundamental_lmeds, FundamentalError, LmedsParams};
use recon_image::Image;
use recon_imgproc::optical_flow::{calc_optical_flow_pyr_lk, OpticalFlowParams};

use crate::MatchingError;

/// A pair of corresponding pixels, one in each view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMatch {
    /// Location in the first image.
    pub point1: DVec2,
    /// Location in the second image.
    pub point2: DVec2,
}

impl FeatureMatch {
    /// Create a new match.
    pub fn new(point1: DVec2, point2: DVec2) -> Self {
        Self { point1, point2 }
    }
}

/// Parameters of [`match_features`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchParams {
    /// The optical flow tracker settings.
    pub flow: OpticalFlowParams,
    /// Tracked points with a flow error at or above this value are dropped.
    pub max_flow_error: f32,
    /// Below this many tracked pairs no epipolar fit is attempted.
    pub min_matches: usize,
    /// The epipolar outlier filter settings.
    pub epipolar: LmedsParams,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            flow: OpticalFlowParams::default(),
            max_flow_error: 9.0,
            min_matches: 4,
            epipolar: LmedsParams::default(),
        }
    }
}

/// Track points from the first view into the second and keep the geometrically consistent pairs.
///
/// 1. Every point is tracked with pyramidal Lucas-Kanade flow; a pair survives when the
///    tracker succeeds and its error is below `max_flow_error`.
/// 2. With fewer than `min_matches` surviving pairs the result is empty.
/// 3. Otherwise a fundamental matrix is fitted by least-median-of-squares and only its
///    inliers are returned. Seven pairs are fitted with the minimal 7-point solver; fewer
///    pairs than that, or a degenerate fit, give an empty result.
///
/// The matches keep the order of `points`.
///
/// # Arguments
///
/// * `left` - The first grayscale image.
/// * `right` - The second grayscale image, same size as `left`.
/// * `points` - Pixels of the first image to track.
/// * `params` - Matching parameters.
pub fn match_features(
    left: &Image<u8, 1>,
    right: &Image<u8, 1>,
    points: &[DVec2],
    params: &MatchParams,
) -> Result<Vec<FeatureMatch>, MatchingError> {
    if left.size() != right.size() {
        return Err(MatchingError::ImageSizeMismatch(left.size(), right.size()));
    }

    let inputs: Vec<[f32; 2]> = points.iter().map(|p| [p.x as f32, p.y as f32]).collect();
    let flow = calc_optical_flow_pyr_lk(left, right, &inputs, &params.flow)?;

    let tracked: Vec<FeatureMatch> = inputs
        .iter()
        .zip(&flow)
        .filter(|(_, f)| f.status && f.error < params.max_flow_error)
        .map(|(p, f)| {
            FeatureMatch::new(
                DVec2::new(p[0] as f64, p[1] as f64),
                DVec2::new(f.point[0] as f64, f.point[1] as f64),
            )
        })
        .collect();

    log::debug!(
        "match features: {} of {} points tracked",
        tracked.len(),
        points.len()
    );

    if tracked.len() < params.min_matches {
        return Ok(Vec::new());
    }

    epipolar_filter(&tracked, &params.epipolar)
}

fn epipolar_filter(
    matches: &[FeatureMatch],
    params: &LmedsParams,
) -> Result<Vec<FeatureMatch>, MatchingError> {
    let (x1, x2): (Vec<DVec2>, Vec<DVec2>) = matches.iter().map(|m| (m.point1, m.point2)).unzip();

    let fit = match find_fundamental_lmeds(&x1, &x2, params) {
        Ok(fit) => fit,
        Err(
            e @ (FundamentalError::InsufficientCorrespondences { .. }
            | FundamentalError::DegenerateConfiguration),
        ) => {
            log::debug!("match features: no epipolar model ({e})");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let filtered: Vec<FeatureMatch> = matches
        .iter()
        .zip(&fit.inliers)
        .filter(|(_, inlier)| **inlier)
        .map(|(m, _)| *m)
        .collect();

    log::debug!(
        "match features: {} of {} pairs consistent with the epipolar model",
        filtered.len(),
        matches.len()
    );

    Ok(filtered)
}
