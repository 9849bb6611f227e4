use glam::{DVec2, DVec3};
use recon_3d::camera::{extract_depth, PinholeCamera};
use recon_3d::pnp::{solve_pnp_ransac, PnPRansacParams};
use recon_3d::pose::Pose;
use recon_image::Image;

use crate::{FeatureMatch, MatchingError};

/// Parameters of [`get_scene_points`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneParams {
    /// Matches whose depth is at or below this value are skipped.
    pub min_depth: f64,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self { min_depth: 10.0 }
    }
}

/// Lift matches to 2D-3D correspondences using the depth map of the first view.
///
/// The depth is read at the nearest pixel to `point1`; matches with depth at or below
/// `min_depth` are dropped. The returned lists are parallel: the back-projected `point1`
/// and the `point2` it was matched to.
pub fn get_scene_points<T>(
    camera: &PinholeCamera,
    depth: &Image<T, 1>,
    matches: &[FeatureMatch],
    params: &SceneParams,
) -> (Vec<DVec3>, Vec<DVec2>)
where
    T: Copy + Into<f64>,
{
    let (scene, image): (Vec<DVec3>, Vec<DVec2>) = matches
        .iter()
        .filter_map(|m| {
            let z = extract_depth(depth, m.point1);
            (z > params.min_depth).then(|| (camera.unproject(m.point1, z), m.point2))
        })
        .unzip();

    log::debug!(
        "scene points: {} of {} matches have depth",
        scene.len(),
        matches.len()
    );

    (scene, image)
}

/// Estimate the pose mapping scene points onto their observations.
///
/// Runs RANSAC PnP with iterative refinement; see [`solve_pnp_ransac`].
///
/// # Errors
///
/// Fails with fewer than four correspondences, or when no model finds four inliers.
pub fn find_pose(
    camera: &PinholeCamera,
    scene_points: &[DVec3],
    image_points: &[DVec2],
    params: &PnPRansacParams,
) -> Result<Pose, MatchingError> {
    let result = solve_pnp_ransac(scene_points, image_points, camera, params)?;
    log::debug!(
        "find pose: {} of {} inliers",
        result.inliers.len(),
        scene_points.len()
    );
    Ok(result.pose.pose())
}

/// Mean Euclidean distance in pixels between the observations and the projected scene points.
///
/// An empty correspondence set has zero error.
pub fn find_pose_error(
    camera: &PinholeCamera,
    pose: &Pose,
    scene_points: &[DVec3],
    image_points: &[DVec2],
) -> Result<f64, MatchingError> {
    if scene_points.len() != image_points.len() {
        return Err(MatchingError::MismatchedLengths(
            scene_points.len(),
            image_points.len(),
        ));
    }
    if scene_points.is_empty() {
        return Ok(0.0);
    }

    let total: f64 = scene_points
        .iter()
        .zip(image_points)
        .map(|(p, uv)| camera.project(pose.transform_point(*p)).distance(*uv))
        .sum();

    Ok(total / scene_points.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use recon_3d::random::random_pose;

    #[test]
    fn test_get_scene_points_depth_filter() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(100.0, 100.0, 2.0, 2.0)?;
        #[rustfmt::skip]
        let depth = Image::<u16, 1>::new([4, 2].into(), vec![
            0, 10, 11, 500,
            200, 0, 0, 0,
        ])?;
        let matches = [
            FeatureMatch::new(DVec2::new(0.0, 0.0), DVec2::new(9.0, 9.0)),
            FeatureMatch::new(DVec2::new(1.2, 0.1), DVec2::new(8.0, 8.0)),
            FeatureMatch::new(DVec2::new(2.0, 0.0), DVec2::new(7.0, 7.0)),
            FeatureMatch::new(DVec2::new(2.6, -0.2), DVec2::new(6.0, 6.0)),
            FeatureMatch::new(DVec2::new(10.0, 0.0), DVec2::new(5.0, 5.0)),
        ];

        let (scene, image) = get_scene_points(&camera, &depth, &matches, &SceneParams::default());
        assert_eq!(image, vec![DVec2::new(7.0, 7.0), DVec2::new(6.0, 6.0)]);
        assert_eq!(scene[0], DVec3::new(0.0, -0.22, 11.0));
        assert_relative_eq!(scene[1].x, 3.0, epsilon = 1e-12);
        assert_relative_eq!(scene[1].z, 500.0);
        Ok(())
    }

    #[test]
    fn test_find_pose_recovers_motion() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(525.0, 525.0, 320.0, 240.0)?;
        let mut rng = StdRng::seed_from_u64(21);
        let pose = random_pose(
            &mut rng,
            &[-5.0..5.0, -5.0..5.0, -5.0..5.0],
            &[-100.0..100.0, -50.0..50.0, -50.0..50.0],
        );

        let scene: Vec<DVec3> = (0..40)
            .map(|_| {
                DVec3::new(
                    rng.random_range(-800.0..800.0),
                    rng.random_range(-600.0..600.0),
                    rng.random_range(1500.0..3000.0),
                )
            })
            .collect();
        let mut image: Vec<DVec2> = scene
            .iter()
            .map(|p| camera.project(pose.transform_point(*p)))
            .collect();
        image[5] += DVec2::new(60.0, 0.0);
        image[17] += DVec2::new(-25.0, 40.0);

        let estimate = find_pose(&camera, &scene, &image, &PnPRansacParams::default())?;
        assert!(estimate
            .matrix()
            .abs_diff_eq(*pose.matrix(), 1e-4));

        // the two outliers dominate the mean error
        let error = find_pose_error(&camera, &estimate, &scene, &image)?;
        let expected = (60.0 + (25.0f64.powi(2) + 40.0f64.powi(2)).sqrt()) / 40.0;
        assert_relative_eq!(error, expected, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn test_find_pose_error() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(100.0, 100.0, 0.0, 0.0)?;
        let scene = [DVec3::new(0.0, 0.0, 1.0), DVec3::new(0.01, 0.0, 1.0)];
        let image = [DVec2::new(3.0, 4.0), DVec2::new(1.0, 0.0)];
        let error = find_pose_error(&camera, &Pose::IDENTITY, &scene, &image)?;
        assert_relative_eq!(error, 2.5, epsilon = 1e-12);

        assert_eq!(find_pose_error(&camera, &Pose::IDENTITY, &[], &[])?, 0.0);
        assert!(matches!(
            find_pose_error(&camera, &Pose::IDENTITY, &scene, &image[..1]),
            Err(MatchingError::MismatchedLengths(2, 1))
        ));
        Ok(())
    }

    #[test]
    fn test_find_pose_too_few() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(100.0, 100.0, 0.0, 0.0)?;
        let scene = [DVec3::new(0.0, 0.0, 1.0); 3];
        let image = [DVec2::ZERO; 3];
        assert!(matches!(
            find_pose(&camera, &scene, &image, &PnPRansacParams::default()),
            Err(MatchingError::PnP(_))
        ));
        Ok(())
    }
}
