//! RANSAC-based robust PnP estimation.

use glam::{DMat3, DVec2, DVec3};
use rand::{rngs::StdRng, SeedableRng};

use super::dlt::{solve_pnp_dlt, DLT_MIN_CORRESPONDENCES};
use super::refine::{refine_pose_lm, LMRefineParams};
use super::{ops, PnPError, PnPResult};
use crate::camera::PinholeCamera;
use crate::pose::Pose;

/// Smallest number of correspondences accepted by [`solve_pnp_ransac`].
pub const PNP_MIN_CORRESPONDENCES: usize = 4;

/// Parameters for RANSAC over PnP.
#[derive(Debug, Clone)]
pub struct PnPRansacParams {
    /// Maximum number of RANSAC iterations.
    pub max_iterations: usize,
    /// Pixel error threshold to classify an observation as an inlier.
    pub reproj_threshold_px: f64,
    /// Desired probability that at least one sample set is outlier-free.
    pub confidence: f64,
    /// Optional fixed seed for reproducible sampling.
    pub random_seed: Option<u64>,
    /// Whether to refine the best model on its inliers with Levenberg-Marquardt.
    pub refine: bool,
}

impl Default for PnPRansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            reproj_threshold_px: 3.0,
            confidence: 0.95,
            random_seed: Some(0),
            refine: true,
        }
    }
}

/// RANSAC result for PnP.
#[derive(Debug, Clone)]
pub struct PnPRansacResult {
    /// Best pose found by RANSAC.
    pub pose: PnPResult,
    /// Indices of inlier correspondences, in increasing order.
    pub inliers: Vec<usize>,
}

/// Solve PnP robustly from 2D-3D correspondences.
///
/// - With six or more points, minimal samples of six are solved with the DLT.
/// - With four or five points, the pose is fitted with Levenberg-Marquardt from the identity.
/// - Scoring uses Euclidean pixel reprojection error; iterations adapt from the current
///   inlier ratio and the desired confidence.
///
/// # Errors
///
/// [`PnPError::InsufficientCorrespondences`] below four points, and
/// [`PnPError::InsufficientInliers`] when the best model is supported by fewer than four.
pub fn solve_pnp_ransac(
    world: &[DVec3],
    image: &[DVec2],
    camera: &PinholeCamera,
    params: &PnPRansacParams,
) -> Result<PnPRansacResult, PnPError> {
    ops::check_correspondences(world, image, PNP_MIN_CORRESPONDENCES)?;
    let n = world.len();

    let (best_pose, best_inliers) = if n < DLT_MIN_CORRESPONDENCES {
        let pose = refine_pose_lm(
            world,
            image,
            camera,
            &Pose::IDENTITY,
            &LMRefineParams::default().with_max_iterations(100),
        )?;
        let inliers = classify_inliers(camera, &pose, world, image, params.reproj_threshold_px);
        (Some(pose), inliers)
    } else {
        ransac_dlt(world, image, camera, params)
    };

    let best_pose = match best_pose {
        Some(pose) if best_inliers.len() >= PNP_MIN_CORRESPONDENCES => pose,
        _ => {
            log::warn!(
                "pnp ransac: best model has {} inliers out of {n}",
                best_inliers.len()
            );
            return Err(PnPError::InsufficientInliers {
                required: PNP_MIN_CORRESPONDENCES,
                actual: best_inliers.len(),
            });
        }
    };

    let mut final_pose = if params.refine {
        let w_in: Vec<DVec3> = best_inliers.iter().map(|&i| world[i]).collect();
        let i_in: Vec<DVec2> = best_inliers.iter().map(|&i| image[i]).collect();
        match refine_pose_lm(
            &w_in,
            &i_in,
            camera,
            &best_pose.pose(),
            &LMRefineParams::default(),
        ) {
            Ok(refined) => refined,
            Err(e) => {
                log::debug!("pnp ransac: refinement failed, keeping the sample model: {e}");
                best_pose
            }
        }
    } else {
        best_pose
    };

    // rmse over the inliers only
    final_pose.reproj_rmse = Some(ops::reprojection_rmse(
        camera,
        &final_pose.rotation,
        final_pose.translation,
        world,
        image,
        best_inliers.iter().copied(),
    ));

    log::debug!(
        "pnp ransac: {} of {n} inliers, rmse {:.3} px",
        best_inliers.len(),
        final_pose.reproj_rmse.unwrap_or_default()
    );

    Ok(PnPRansacResult {
        pose: final_pose,
        inliers: best_inliers,
    })
}

fn ransac_dlt(
    world: &[DVec3],
    image: &[DVec2],
    camera: &PinholeCamera,
    params: &PnPRansacParams,
) -> (Option<PnPResult>, Vec<usize>) {
    let n = world.len();
    let sample_size = DLT_MIN_CORRESPONDENCES;

    let mut rng: StdRng = match params.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut best_inliers: Vec<usize> = Vec::new();
    let mut best_pose: Option<PnPResult> = None;

    let mut w_min: Vec<DVec3> = Vec::with_capacity(sample_size);
    let mut i_min: Vec<DVec2> = Vec::with_capacity(sample_size);

    let mut iter = 0;
    let mut required_iters = params.max_iterations;

    while iter < required_iters {
        iter += 1;

        w_min.clear();
        i_min.clear();
        for idx in rand::seq::index::sample(&mut rng, n, sample_size) {
            w_min.push(world[idx]);
            i_min.push(image[idx]);
        }

        let pose_min = match solve_pnp_dlt(&w_min, &i_min, camera) {
            Ok(p) => p,
            Err(e) => {
                log::trace!("pnp ransac: minimal solve failed: {e}");
                continue;
            }
        };

        if !sample_all_positive_depths(&pose_min.rotation, pose_min.translation, &w_min) {
            continue;
        }

        let inliers = classify_inliers(
            camera,
            &pose_min,
            world,
            image,
            params.reproj_threshold_px,
        );

        if inliers.len() > best_inliers.len() {
            best_inliers = inliers;
            best_pose = Some(pose_min);

            let w = best_inliers.len() as f64 / n as f64;
            required_iters = required_iters.min(adaptive_iterations(
                w,
                sample_size,
                params.confidence,
                iter,
                params.max_iterations,
            ));
        }
    }

    log::trace!("pnp ransac: {iter} iterations");

    (best_pose, best_inliers)
}

/// Number of iterations needed to draw one outlier-free sample with the given confidence.
fn adaptive_iterations(
    inlier_ratio: f64,
    sample_size: usize,
    confidence: f64,
    current: usize,
    max_iterations: usize,
) -> usize {
    if inlier_ratio >= 1.0 {
        return current;
    }
    let ws = inlier_ratio.powi(sample_size as i32);
    if ws <= 1e-12 {
        return max_iterations;
    }
    let log_conf = (1.0 - confidence).max(1e-12).ln();
    let log_denom = (1.0 - ws).ln();
    if !log_denom.is_finite() || log_denom == 0.0 {
        return current;
    }
    let est = (log_conf / log_denom).ceil();
    if est.is_finite() && est > 0.0 {
        (est as usize).clamp(current, max_iterations)
    } else {
        max_iterations
    }
}

fn sample_all_positive_depths(rotation: &DMat3, translation: DVec3, world: &[DVec3]) -> bool {
    world
        .iter()
        .all(|pw| (*rotation * *pw + translation).z > 0.0)
}

fn classify_inliers(
    camera: &PinholeCamera,
    pose: &PnPResult,
    world: &[DVec3],
    image: &[DVec2],
    threshold_px: f64,
) -> Vec<usize> {
    let threshold_sq = threshold_px * threshold_px;
    world
        .iter()
        .zip(image)
        .enumerate()
        .filter(|(_, (pw, uv))| {
            ops::reprojection_error_sq(camera, &pose.rotation, pose.translation, **pw, **uv)
                < threshold_sq
        })
        .map(|(i, _)| i)
        .collect()
}
