//! Levenberg-Marquardt pose refinement for PnP solutions.
//!
//! The pose is updated with a left perturbation `R <- exp(dw) R`, `t <- exp(dw) t + dt`
//! and the 6x6 normal equations are damped with `lambda * diag(J^T J)`.

use glam::{DMat3, DVec2, DVec3};
use nalgebra::{Matrix2x3, Matrix3, Matrix6, Vector2, Vector6};

use super::{ops, PnPError, PnPResult};
use crate::camera::PinholeCamera;
use crate::pose::Pose;
use crate::transforms::{axis_angle_to_rotation_matrix, rotation_matrix_to_axis_angle};

/// Parameters controlling the LM pose refinement.
#[derive(Debug, Clone)]
pub struct LMRefineParams {
    /// Maximum number of LM iterations.
    pub max_iterations: usize,
    /// Convergence threshold on the relative cost decrease.
    pub cost_tolerance: f64,
    /// Convergence threshold on the update norm.
    pub step_tolerance: f64,
    /// Initial damping factor (lambda).
    pub initial_lambda: f64,
}

impl Default for LMRefineParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            cost_tolerance: 1e-12,
            step_tolerance: 1e-12,
            initial_lambda: 1e-3,
        }
    }
}

impl LMRefineParams {
    /// Set maximum iterations.
    pub fn with_max_iterations(mut self, max_iters: usize) -> Self {
        self.max_iterations = max_iters;
        self
    }

    /// Set initial lambda.
    pub fn with_initial_lambda(mut self, lambda: f64) -> Self {
        self.initial_lambda = lambda;
        self
    }
}

fn skew(v: DVec3) -> Matrix3<f64> {
    #[rustfmt::skip]
    let m = Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    );
    m
}

fn total_cost(
    camera: &PinholeCamera,
    rotation: &DMat3,
    translation: DVec3,
    world: &[DVec3],
    image: &[DVec2],
) -> f64 {
    world
        .iter()
        .zip(image)
        .map(|(pw, uv)| ops::reprojection_error_sq(camera, rotation, translation, *pw, *uv))
        .sum()
}

/// Refine a pose by minimizing the squared pixel reprojection error with Levenberg-Marquardt.
///
/// # Arguments
///
/// * `world` - 3D points in the world frame (at least 3).
/// * `image` - Corresponding pixel coordinates.
/// * `camera` - The camera intrinsics.
/// * `initial` - Starting world to camera pose.
/// * `params` - Optimizer settings.
///
/// # Errors
///
/// Fails on mismatched inputs, or when a point lies behind the camera at the initial pose.
pub fn refine_pose_lm(
    world: &[DVec3],
    image: &[DVec2],
    camera: &PinholeCamera,
    initial: &Pose,
    params: &LMRefineParams,
) -> Result<PnPResult, PnPError> {
    ops::check_correspondences(world, image, 3)?;

    let mut rotation = initial.rotation();
    let mut translation = initial.translation();
    let mut cost = total_cost(camera, &rotation, translation, world, image);
    if !cost.is_finite() {
        return Err(PnPError::DegenerateConfiguration(
            "points behind the camera at the initial pose".to_string(),
        ));
    }

    let (fx, fy) = (camera.fx(), camera.fy());
    let mut lambda = params.initial_lambda;
    let mut converged = false;
    let mut iterations = 0;

    while iterations < params.max_iterations {
        iterations += 1;

        let mut jtj = Matrix6::<f64>::zeros();
        let mut jtr = Vector6::<f64>::zeros();

        for (pw, uv) in world.iter().zip(image) {
            let pc = rotation * *pw + translation;
            let inv_z = 1.0 / pc.z;
            let projected = camera.project(pc);
            let residual = Vector2::new(projected.x - uv.x, projected.y - uv.y);

            #[rustfmt::skip]
            let d_proj = Matrix2x3::new(
                fx * inv_z, 0.0, -fx * pc.x * inv_z * inv_z,
                0.0, fy * inv_z, -fy * pc.y * inv_z * inv_z,
            );

            // d(pc)/d(dw) = -[pc]x, d(pc)/d(dt) = I
            let j_rot = d_proj * (-skew(pc));
            let mut j = nalgebra::Matrix2x6::<f64>::zeros();
            j.fixed_view_mut::<2, 3>(0, 0).copy_from(&j_rot);
            j.fixed_view_mut::<2, 3>(0, 3).copy_from(&d_proj);

            jtj += j.transpose() * j;
            jtr += j.transpose() * residual;
        }

        let mut accepted = false;
        while lambda < 1e12 {
            let mut damped = jtj;
            for i in 0..6 {
                damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
            }

            let Some(delta) = damped.lu().solve(&(-jtr)) else {
                lambda *= 10.0;
                continue;
            };

            let d_rot = axis_angle_to_rotation_matrix(DVec3::new(delta[0], delta[1], delta[2]));
            let d_trans = DVec3::new(delta[3], delta[4], delta[5]);
            let new_rotation = d_rot * rotation;
            let new_translation = d_rot * translation + d_trans;
            let new_cost = total_cost(camera, &new_rotation, new_translation, world, image);

            if new_cost < cost {
                let decrease = (cost - new_cost) / cost.max(f64::MIN_POSITIVE);
                rotation = new_rotation;
                translation = new_translation;
                cost = new_cost;
                lambda = (lambda / 10.0).max(1e-12);
                accepted = true;

                if delta.norm() < params.step_tolerance || decrease < params.cost_tolerance {
                    converged = true;
                }
                break;
            }

            lambda *= 10.0;
        }

        if !accepted {
            // no step decreases the cost any more
            converged = true;
        }
        if converged {
            break;
        }
    }

    // re-orthonormalize the accumulated rotation
    let rvec = rotation_matrix_to_axis_angle(&rotation);
    let rotation = axis_angle_to_rotation_matrix(rvec);
    let rmse = (cost / world.len() as f64).sqrt();

    log::trace!("lm refine: {iterations} iterations, rmse {rmse:.4} px, converged {converged}");

    Ok(PnPResult {
        rotation,
        translation,
        rvec,
        reproj_rmse: Some(rmse),
        num_iterations: Some(iterations),
        converged: Some(converged),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pnp::ops::synthetic_scene;

    #[test]
    fn test_refine_from_perturbed() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0)?;
        let pose = Pose::from_vectors(DVec3::new(0.1, -0.05, 0.02), DVec3::new(0.3, 0.1, -0.2));
        let (world, image) = synthetic_scene(&pose, &camera);

        let initial = Pose::from_vectors(DVec3::new(0.13, -0.02, 0.0), DVec3::new(0.2, 0.2, -0.1));
        let result = refine_pose_lm(&world, &image, &camera, &initial, &Default::default())?;

        assert!(result.rotation.abs_diff_eq(pose.rotation(), 1e-6));
        assert!(result.translation.abs_diff_eq(pose.translation(), 1e-6));
        assert!(result.reproj_rmse.unwrap_or(f64::MAX) < 1e-4);
        assert_eq!(result.converged, Some(true));
        Ok(())
    }

    #[test]
    fn test_refine_from_identity_four_points() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0)?;
        let pose = Pose::from_vectors(DVec3::new(0.02, 0.03, -0.01), DVec3::new(0.1, -0.1, 0.2));
        let (world, image) = synthetic_scene(&pose, &camera);

        let result = refine_pose_lm(
            &world[..4],
            &image[..4],
            &camera,
            &Pose::IDENTITY,
            &Default::default(),
        )?;
        assert!(result.reproj_rmse.unwrap_or(f64::MAX) < 1e-3);
        Ok(())
    }

    #[test]
    fn test_refine_behind_camera() -> Result<(), Box<dyn std::error::Error>> {
        let camera = PinholeCamera::new(500.0, 500.0, 320.0, 240.0)?;
        let world = vec![DVec3::new(0.0, 0.0, -1.0); 4];
        let image = vec![DVec2::new(320.0, 240.0); 4];
        assert!(matches!(
            refine_pose_lm(&world, &image, &camera, &Pose::IDENTITY, &Default::default()),
            Err(PnPError::DegenerateConfiguration(_))
        ));
        Ok(())
    }
}
